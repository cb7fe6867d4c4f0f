//! The assessment phase controller.
//!
//! Drives the linear flow `prereg → otp → steps(1..=4) → complete`. Every
//! transition is gated by a successful call to the [`AssessmentApi`]; the
//! only local checks are required-input gating before a request is sent.
//!
//! Operations take `&mut self`, so a controller never has more than one
//! request in flight. Request failures are recorded as a single inline
//! message ([`PhaseController::last_error`]) and are never retried.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{AssessmentApi, LocationLookup, Registration, SubmitRequest, VerifyOtpRequest};
use crate::countdown::Countdown;
use crate::error::{ApiError, FlowError};
use crate::form::{FormData, FormValue};
use crate::schema::{Question, StepDefinition};
use crate::types::{Progress, SessionId, StepNumber};

const START_FAILED: &str = "Failed to start";
const VERIFY_FAILED: &str = "Invalid OTP";
const LOAD_FAILED: &str = "Failed to load questions";
const SAVE_FAILED: &str = "Failed to save";

/// Digits in an OTP.
pub const OTP_LENGTH: usize = 6;

/// Working state of the `steps` phase.
#[derive(Debug, Clone, PartialEq)]
pub struct StepState {
    pub session_id: SessionId,
    /// Always in `1..=4`; completion moves to [`Phase::Complete`].
    pub step: StepNumber,
    pub progress: Progress,
    /// `None` until the step has been fetched.
    pub definition: Option<StepDefinition>,
    /// Answers for this step only; cleared after each successful submit.
    pub answers: FormData,
}

/// Where the flow currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    PreRegistration,
    Otp {
        session_id: SessionId,
        /// OTP lifetime reported by the service when it was issued.
        expires_in: u64,
    },
    Steps(StepState),
    Complete {
        session_id: SessionId,
        progress: Progress,
    },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PreRegistration => "prereg",
            Self::Otp { .. } => "otp",
            Self::Steps(_) => "steps",
            Self::Complete { .. } => "complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Client-side driver of one assessment attempt.
pub struct PhaseController {
    api: Arc<dyn AssessmentApi>,
    phase: Phase,
    countdown: Option<Countdown>,
    last_error: Option<String>,
}

impl fmt::Debug for PhaseController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseController")
            .field("phase", &self.phase)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl PhaseController {
    pub fn new(api: Arc<dyn AssessmentApi>) -> Self {
        Self {
            api,
            phase: Phase::PreRegistration,
            countdown: None,
            last_error: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// The session handle, once `start` has succeeded.
    pub fn session_id(&self) -> Option<&SessionId> {
        match &self.phase {
            Phase::PreRegistration => None,
            Phase::Otp { session_id, .. } | Phase::Complete { session_id, .. } => Some(session_id),
            Phase::Steps(state) => Some(&state.session_id),
        }
    }

    /// Message of the most recent failed request, cleared when the next
    /// request starts.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Seconds left on the OTP display, if counting.
    pub fn otp_remaining(&self) -> Option<u64> {
        self.countdown.as_ref().map(Countdown::remaining)
    }

    pub fn current_step(&self) -> Option<StepNumber> {
        match &self.phase {
            Phase::Steps(state) => Some(state.step),
            Phase::Complete { .. } => Some(StepNumber::COMPLETE),
            Phase::PreRegistration | Phase::Otp { .. } => None,
        }
    }

    pub fn progress(&self) -> Progress {
        match &self.phase {
            Phase::Steps(state) => state.progress,
            Phase::Complete { progress, .. } => *progress,
            Phase::PreRegistration | Phase::Otp { .. } => Progress::default(),
        }
    }

    pub fn step_definition(&self) -> Option<&StepDefinition> {
        match &self.phase {
            Phase::Steps(state) => state.definition.as_ref(),
            _ => None,
        }
    }

    pub fn answers(&self) -> Option<&FormData> {
        match &self.phase {
            Phase::Steps(state) => Some(&state.answers),
            _ => None,
        }
    }

    /// Whether the submit control of the current step should be enabled.
    pub fn is_step_complete(&self) -> bool {
        match &self.phase {
            Phase::Steps(StepState {
                definition: Some(def),
                answers,
                ..
            }) => answers.is_complete_for(def),
            _ => false,
        }
    }

    /// Register and request an OTP.
    ///
    /// # Errors
    ///
    /// - [`FlowError::WrongPhase`] outside `prereg`.
    /// - [`FlowError::Validation`] if name, phone, or e-mail is blank.
    /// - [`FlowError::Request`] if the service refuses; the phase and the
    ///   (absent) session id are left untouched.
    pub async fn start(&mut self, registration: &Registration) -> Result<(), FlowError> {
        if !matches!(self.phase, Phase::PreRegistration) {
            return Err(wrong_phase("start", &self.phase));
        }
        let missing = registration.missing_fields();
        if !missing.is_empty() {
            return Err(FlowError::Validation { missing });
        }

        self.last_error = None;
        let resp = match self.api.start(registration).await {
            Ok(resp) => resp,
            Err(err) => return Err(self.request_failed(START_FAILED, err)),
        };

        let expires_in = resp.expires_in();
        info!(session_id = %resp.session_id, expires_in, "assessment started, awaiting OTP");

        self.countdown = Some(Countdown::start(expires_in));
        self.phase = Phase::Otp {
            session_id: resp.session_id,
            expires_in,
        };
        Ok(())
    }

    /// Verify the OTP and enter the `steps` phase.
    ///
    /// The code is normalised first (non-digits dropped, at most six
    /// digits). On success the countdown is stopped and the current step is
    /// fetched immediately; a failed fetch is recorded in
    /// [`last_error`](Self::last_error) and can be retried with
    /// [`load_step`](Self::load_step).
    ///
    /// # Errors
    ///
    /// - [`FlowError::WrongPhase`] outside `otp`.
    /// - [`FlowError::Validation`] if no digits remain.
    /// - [`FlowError::Request`] if the service rejects the code; the
    ///   countdown keeps running.
    pub async fn verify_otp(&mut self, code: &str) -> Result<(), FlowError> {
        let Phase::Otp { session_id, .. } = &self.phase else {
            return Err(wrong_phase("verify OTP", &self.phase));
        };
        let otp = normalize_otp(code);
        if otp.is_empty() {
            return Err(FlowError::Validation {
                missing: vec!["otp".to_owned()],
            });
        }

        let request = VerifyOtpRequest {
            session_id: session_id.clone(),
            otp,
        };
        self.last_error = None;
        let resp = match self.api.verify_otp(&request).await {
            Ok(resp) => resp,
            Err(err) => return Err(self.request_failed(VERIFY_FAILED, err)),
        };

        let step = StepNumber::from_server(resp.current_step);
        let progress = Progress::for_step(step);
        info!(session_id = %request.session_id, %step, %progress, "OTP verified");

        self.countdown = None;
        self.enter_step(request.session_id, step, progress).await;
        Ok(())
    }

    /// Fetch the definition of the current step.
    ///
    /// Answers saved server-side for this step are merged into the local
    /// answers, which lets an interrupted step resume in place.
    ///
    /// # Errors
    ///
    /// - [`FlowError::WrongPhase`] outside `steps`.
    /// - [`FlowError::Request`] with a generic message on any failure.
    pub async fn load_step(&mut self) -> Result<(), FlowError> {
        let Phase::Steps(state) = &self.phase else {
            return Err(wrong_phase("load step", &self.phase));
        };
        let session_id = state.session_id.clone();
        let step = state.step;

        self.last_error = None;
        let payload = match self.api.questions(&session_id, step).await {
            Ok(payload) => payload,
            Err(err) => return Err(self.request_failed(LOAD_FAILED, err)),
        };

        let (definition, saved) = payload.into_parts();
        let Some(definition) = definition else {
            return Err(self.request_failed(
                LOAD_FAILED,
                ApiError::transport("step has neither fields nor questions"),
            ));
        };

        if let Phase::Steps(state) = &mut self.phase {
            debug!(%session_id, %step, resumed = saved.is_some(), "step loaded");
            state.definition = Some(definition);
            if let Some(saved) = saved {
                state.answers.merge(saved);
            }
        }
        Ok(())
    }

    /// Submit the answers of the current step.
    ///
    /// Only keys belonging to the step are sent. On success the server's
    /// `current_step` and `progress_percent` are adopted, local answers are
    /// cleared, and either the next step is fetched or the flow completes.
    ///
    /// # Errors
    ///
    /// - [`FlowError::WrongPhase`] outside `steps`.
    /// - [`FlowError::StepNotLoaded`] before the step has been fetched.
    /// - [`FlowError::Validation`] listing blank required keys.
    /// - [`FlowError::Request`] if the service refuses; answers are kept.
    pub async fn submit_step(&mut self) -> Result<(), FlowError> {
        let Phase::Steps(state) = &self.phase else {
            return Err(wrong_phase("submit", &self.phase));
        };
        let definition = state.definition.as_ref().ok_or(FlowError::StepNotLoaded)?;
        let missing = state.answers.missing_required(definition);
        if !missing.is_empty() {
            return Err(FlowError::Validation { missing });
        }

        let request = SubmitRequest {
            session_id: state.session_id.clone(),
            step: state.step,
            form_data: state.answers.scoped_to(definition),
        };

        self.last_error = None;
        let resp = match self.api.submit(&request).await {
            Ok(resp) => resp,
            Err(err) => return Err(self.request_failed(SAVE_FAILED, err)),
        };

        let next = StepNumber::from_server(Some(resp.current_step));
        let progress = Progress::from_percent(resp.progress_percent);
        info!(
            session_id = %request.session_id,
            submitted = %request.step,
            next = %next,
            %progress,
            "step saved"
        );

        self.enter_step(request.session_id, next, progress).await;
        Ok(())
    }

    /// Set a text, dropdown, or radio answer.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownField`] if `key` is not part of the
    /// current step.
    pub fn set_answer(&mut self, key: &str, value: impl Into<FormValue>) -> Result<(), FlowError> {
        let answers = self.editable_answers(key)?;
        answers.set(key, value);
        Ok(())
    }

    /// Toggle one option of a checkbox question.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownField`] if `key` is not part of the
    /// current step.
    pub fn toggle_choice(&mut self, key: &str, option: &str) -> Result<(), FlowError> {
        let answers = self.editable_answers(key)?;
        answers.toggle_choice(key, option);
        Ok(())
    }

    /// Set the free-text "other" answer of a question.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownField`] if the question has no option
    /// that invites free text.
    pub fn set_other_text(&mut self, question_key: &str, text: &str) -> Result<(), FlowError> {
        let other_key = self
            .step_definition()
            .and_then(|def| def.question(question_key))
            .and_then(Question::other_key)
            .ok_or_else(|| FlowError::UnknownField {
                key: question_key.to_owned(),
            })?;
        let answers = self.editable_answers(&other_key)?;
        answers.set(other_key, text);
        Ok(())
    }

    /// Fill a `detectLocation` field with the postcode at the given
    /// coordinates.
    ///
    /// Best effort: lookup failures are logged and leave the field as it
    /// was. Returns whether the field was filled.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownField`] if `field_key` is not a
    /// location-enabled field of the current step.
    pub async fn detect_location(
        &mut self,
        field_key: &str,
        latitude: f64,
        longitude: f64,
        lookup: &dyn LocationLookup,
    ) -> Result<bool, FlowError> {
        let Phase::Steps(state) = &self.phase else {
            return Err(wrong_phase("detect location", &self.phase));
        };
        let definition = state.definition.as_ref().ok_or(FlowError::StepNotLoaded)?;
        if !definition.field(field_key).is_some_and(|f| f.detect_location) {
            return Err(FlowError::UnknownField {
                key: field_key.to_owned(),
            });
        }

        let Some(postcode) = lookup.postcode(latitude, longitude).await else {
            debug!(field = field_key, "location lookup returned nothing");
            return Ok(false);
        };

        if let Phase::Steps(state) = &mut self.phase {
            state.answers.set(field_key, postcode);
        }
        Ok(true)
    }

    // --- Private ---

    async fn enter_step(&mut self, session_id: SessionId, step: StepNumber, progress: Progress) {
        if step.is_complete() {
            info!(%session_id, "assessment complete");
            self.phase = Phase::Complete {
                session_id,
                progress,
            };
            return;
        }

        self.phase = Phase::Steps(StepState {
            session_id,
            step,
            progress,
            definition: None,
            answers: FormData::new(),
        });

        if let Err(err) = self.load_step().await {
            debug!(error = %err, "step fetch after transition failed");
        }
    }

    fn editable_answers(&mut self, key: &str) -> Result<&mut FormData, FlowError> {
        let actual = self.phase.name();
        let Phase::Steps(state) = &mut self.phase else {
            return Err(FlowError::WrongPhase {
                operation: "edit answers",
                actual,
            });
        };
        let definition = state.definition.as_ref().ok_or(FlowError::StepNotLoaded)?;
        if !definition.answer_keys().iter().any(|k| k == key) {
            return Err(FlowError::UnknownField {
                key: key.to_owned(),
            });
        }
        Ok(&mut state.answers)
    }

    fn request_failed(&mut self, fallback: &'static str, err: ApiError) -> FlowError {
        // Step loads always show the generic text.
        let message = match &err {
            ApiError::Rejected { message }
                if fallback != LOAD_FAILED && !message.trim().is_empty() =>
            {
                message.clone()
            }
            _ => fallback.to_owned(),
        };
        warn!(phase = %self.phase, error = %err, "assessment request failed");
        self.last_error = Some(message.clone());
        FlowError::Request {
            message,
            source: err,
        }
    }
}

/// Keep only digits, at most six of them.
pub fn normalize_otp(code: &str) -> String {
    code.chars()
        .filter(char::is_ascii_digit)
        .take(OTP_LENGTH)
        .collect()
}

fn wrong_phase(operation: &'static str, phase: &Phase) -> FlowError {
    FlowError::WrongPhase {
        operation,
        actual: phase.name(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::api::{StartResponse, StepPayload, SubmitResponse, VerifyOtpResponse};

    #[derive(Default)]
    struct FakeApi {
        starts: Mutex<VecDeque<Result<StartResponse, ApiError>>>,
        verifies: Mutex<VecDeque<Result<VerifyOtpResponse, ApiError>>>,
        questions: Mutex<VecDeque<Result<StepPayload, ApiError>>>,
        submits: Mutex<VecDeque<Result<SubmitResponse, ApiError>>>,
        start_calls: Mutex<Vec<Registration>>,
        otp_calls: Mutex<Vec<VerifyOtpRequest>>,
        fetched: Mutex<Vec<u8>>,
        submitted: Mutex<Vec<SubmitRequest>>,
    }

    fn unscripted<T>() -> Result<T, ApiError> {
        Err(ApiError::transport("unscripted call"))
    }

    #[async_trait::async_trait]
    impl AssessmentApi for FakeApi {
        async fn start(&self, registration: &Registration) -> Result<StartResponse, ApiError> {
            self.start_calls.lock().unwrap().push(registration.clone());
            self.starts.lock().unwrap().pop_front().unwrap_or_else(unscripted)
        }

        async fn verify_otp(
            &self,
            request: &VerifyOtpRequest,
        ) -> Result<VerifyOtpResponse, ApiError> {
            self.otp_calls.lock().unwrap().push(request.clone());
            self.verifies.lock().unwrap().pop_front().unwrap_or_else(unscripted)
        }

        async fn questions(
            &self,
            _session_id: &SessionId,
            step: StepNumber,
        ) -> Result<StepPayload, ApiError> {
            self.fetched.lock().unwrap().push(step.get());
            self.questions.lock().unwrap().pop_front().unwrap_or_else(unscripted)
        }

        async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError> {
            self.submitted.lock().unwrap().push(request.clone());
            self.submits.lock().unwrap().pop_front().unwrap_or_else(unscripted)
        }
    }

    struct FixedLookup(Option<&'static str>);

    #[async_trait::async_trait]
    impl LocationLookup for FixedLookup {
        async fn postcode(&self, _latitude: f64, _longitude: f64) -> Option<String> {
            self.0.map(str::to_owned)
        }
    }

    fn registration() -> Registration {
        Registration {
            name: "A".to_owned(),
            phone: "9999999999".to_owned(),
            email: "a@b.com".to_owned(),
            terms_accepted: true,
        }
    }

    fn started(session: &str, expires: u64) -> Result<StartResponse, ApiError> {
        Ok(StartResponse {
            session_id: SessionId::new(session),
            otp_expires_in: Some(expires),
            message: None,
        })
    }

    fn profile_payload() -> StepPayload {
        serde_json::from_value(json!({
            "title": "hello! A, please fill out your details",
            "fields": [
                {"key": "company_name", "label": "company name", "type": "text", "required": true},
                {"key": "role", "label": "select role", "type": "dropdown", "required": true,
                 "options": [{"value": "owner", "label": "Owner"}]},
                {"key": "pincode", "label": "pincode", "type": "text", "required": true, "detectLocation": true},
                {"key": "nickname", "label": "nickname", "type": "text"}
            ]
        }))
        .unwrap()
    }

    fn question_payload() -> StepPayload {
        serde_json::from_value(json!({
            "title": "digital strategy",
            "questions": [
                {"key": "priorities", "text": "Priorities?", "type": "checkbox", "required": true,
                 "options": [{"value": "channels", "label": "Channels"},
                             {"value": "others", "label": "Others", "hasOther": true}]},
                {"key": "ai_ml_usage", "text": "AI?", "type": "radio", "required": true,
                 "options": [{"value": "adopted", "label": "Adopted"}]}
            ]
        }))
        .unwrap()
    }

    fn controller(api: &Arc<FakeApi>) -> PhaseController {
        PhaseController::new(Arc::clone(api) as Arc<dyn AssessmentApi>)
    }

    /// Drive a fresh controller into the `steps` phase at `step`.
    async fn at_step(api: &Arc<FakeApi>, step: u32, payload: StepPayload) -> PhaseController {
        api.starts.lock().unwrap().push_back(started("s1", 300));
        api.verifies.lock().unwrap().push_back(Ok(VerifyOtpResponse {
            verified: Some(true),
            current_step: Some(step),
            progress_percent: None,
        }));
        api.questions.lock().unwrap().push_back(Ok(payload));

        let mut c = controller(api);
        c.start(&registration()).await.unwrap();
        c.verify_otp("123456").await.unwrap();
        c
    }

    fn fill_profile(c: &mut PhaseController) {
        c.set_answer("company_name", "Acme").unwrap();
        c.set_answer("role", "owner").unwrap();
        c.set_answer("pincode", "560001").unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn start_enters_otp_and_counts_down() {
        let api = Arc::new(FakeApi::default());
        api.starts.lock().unwrap().push_back(started("s1", 300));
        let mut c = controller(&api);

        c.start(&registration()).await.unwrap();

        assert_eq!(c.phase().name(), "otp");
        assert_eq!(c.session_id().map(SessionId::as_str), Some("s1"));
        assert_eq!(c.otp_remaining(), Some(300));
        assert_eq!(api.start_calls.lock().unwrap()[0], registration());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(c.otp_remaining(), Some(299));
    }

    #[tokio::test]
    async fn failed_start_stays_in_prereg_without_session() {
        let api = Arc::new(FakeApi::default());
        api.starts
            .lock()
            .unwrap()
            .push_back(Err(ApiError::rejected("You must accept the terms and conditions")));
        let mut c = controller(&api);

        let err = c.start(&registration()).await.unwrap_err();

        assert!(matches!(err, FlowError::Request { .. }));
        assert_eq!(c.phase(), &Phase::PreRegistration);
        assert!(c.session_id().is_none());
        assert_eq!(c.last_error(), Some("You must accept the terms and conditions"));
        assert!(c.otp_remaining().is_none());
    }

    #[tokio::test]
    async fn transport_failure_shows_fallback_message() {
        let api = Arc::new(FakeApi::default());
        api.starts
            .lock()
            .unwrap()
            .push_back(Err(ApiError::transport("connection refused")));
        let mut c = controller(&api);

        c.start(&registration()).await.unwrap_err();
        assert_eq!(c.last_error(), Some("Failed to start"));
    }

    #[tokio::test]
    async fn blank_registration_is_not_sent() {
        let api = Arc::new(FakeApi::default());
        let mut c = controller(&api);
        let reg = Registration {
            phone: "   ".to_owned(),
            ..registration()
        };

        let err = c.start(&reg).await.unwrap_err();

        assert_eq!(
            err,
            FlowError::Validation {
                missing: vec!["phone".to_owned()]
            }
        );
        assert!(api.start_calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_otp_keeps_otp_phase_and_countdown() {
        let api = Arc::new(FakeApi::default());
        api.starts.lock().unwrap().push_back(started("s1", 300));
        api.verifies
            .lock()
            .unwrap()
            .push_back(Err(ApiError::rejected("Invalid OTP")));
        let mut c = controller(&api);
        c.start(&registration()).await.unwrap();

        let err = c.verify_otp("000000").await.unwrap_err();

        assert_eq!(err.to_string(), "Invalid OTP");
        assert_eq!(c.phase().name(), "otp");
        assert_eq!(c.last_error(), Some("Invalid OTP"));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(c.otp_remaining(), Some(298));
    }

    #[tokio::test]
    async fn verify_without_step_defaults_to_first() {
        let api = Arc::new(FakeApi::default());
        api.starts.lock().unwrap().push_back(started("s1", 300));
        api.verifies
            .lock()
            .unwrap()
            .push_back(Ok(VerifyOtpResponse::default()));
        api.questions.lock().unwrap().push_back(Ok(profile_payload()));
        let mut c = controller(&api);
        c.start(&registration()).await.unwrap();

        c.verify_otp("12-34 56").await.unwrap();

        assert_eq!(c.current_step(), Some(StepNumber::FIRST));
        assert_eq!(c.progress().percent(), 0);
        assert!(c.otp_remaining().is_none());
        assert!(c.step_definition().unwrap().is_field_based());
        assert_eq!(*api.fetched.lock().unwrap(), vec![1]);
        assert_eq!(api.otp_calls.lock().unwrap()[0].otp, "123456");
    }

    #[tokio::test]
    async fn step_one_submit_is_blocked_until_required_fields_filled() {
        let api = Arc::new(FakeApi::default());
        let mut c = at_step(&api, 1, profile_payload()).await;

        c.set_answer("company_name", "Acme").unwrap();
        c.set_answer("role", "owner").unwrap();
        c.set_answer("pincode", "   ").unwrap();
        assert!(!c.is_step_complete());

        let err = c.submit_step().await.unwrap_err();
        assert_eq!(
            err,
            FlowError::Validation {
                missing: vec!["pincode".to_owned()]
            }
        );
        assert!(api.submitted.lock().unwrap().is_empty());

        c.set_answer("pincode", "560001").unwrap();
        assert!(c.is_step_complete());
    }

    #[tokio::test]
    async fn submitting_step_one_loads_step_two() {
        let api = Arc::new(FakeApi::default());
        let mut c = at_step(&api, 1, profile_payload()).await;
        fill_profile(&mut c);
        api.submits.lock().unwrap().push_back(Ok(SubmitResponse {
            current_step: 2,
            progress_percent: 25,
        }));
        api.questions.lock().unwrap().push_back(Ok(question_payload()));

        c.submit_step().await.unwrap();

        let sent = &api.submitted.lock().unwrap()[0];
        assert_eq!(sent.step.get(), 1);
        assert_eq!(sent.form_data.len(), 3);
        assert!(sent.form_data.get("nickname").is_none());

        assert_eq!(c.current_step().map(StepNumber::get), Some(2));
        assert_eq!(c.progress().percent(), 25);
        assert_eq!(*api.fetched.lock().unwrap(), vec![1, 2]);
        assert!(!c.step_definition().unwrap().is_field_based());
        assert!(c.answers().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_submit_preserves_answers() {
        let api = Arc::new(FakeApi::default());
        let mut c = at_step(&api, 1, profile_payload()).await;
        fill_profile(&mut c);
        api.submits
            .lock()
            .unwrap()
            .push_back(Err(ApiError::rejected("Missing required fields: role")));

        c.submit_step().await.unwrap_err();

        assert_eq!(c.current_step(), Some(StepNumber::FIRST));
        assert_eq!(c.answers().unwrap().len(), 3);
        assert_eq!(c.last_error(), Some("Missing required fields: role"));
    }

    #[tokio::test]
    async fn submitting_last_step_completes() {
        let api = Arc::new(FakeApi::default());
        let mut c = at_step(&api, 4, question_payload()).await;
        assert_eq!(c.progress().percent(), 75);

        c.toggle_choice("priorities", "channels").unwrap();
        c.set_answer("ai_ml_usage", "adopted").unwrap();
        api.submits.lock().unwrap().push_back(Ok(SubmitResponse {
            current_step: 5,
            progress_percent: 100,
        }));

        c.submit_step().await.unwrap();

        assert_eq!(c.phase().name(), "complete");
        assert_eq!(c.progress().percent(), 100);
        assert_eq!(c.session_id().map(SessionId::as_str), Some("s1"));
        assert_eq!(*api.fetched.lock().unwrap(), vec![4]);
    }

    #[tokio::test]
    async fn load_failure_is_generic_and_retryable() {
        let api = Arc::new(FakeApi::default());
        api.starts.lock().unwrap().push_back(started("s1", 300));
        api.verifies.lock().unwrap().push_back(Ok(VerifyOtpResponse::default()));
        api.questions
            .lock()
            .unwrap()
            .push_back(Err(ApiError::rejected("Session not found")));
        let mut c = controller(&api);
        c.start(&registration()).await.unwrap();

        c.verify_otp("123456").await.unwrap();
        assert_eq!(c.phase().name(), "steps");
        assert!(c.step_definition().is_none());
        assert_eq!(c.last_error(), Some("Failed to load questions"));
        assert_eq!(c.submit_step().await.unwrap_err(), FlowError::StepNotLoaded);

        api.questions.lock().unwrap().push_back(Ok(profile_payload()));
        c.load_step().await.unwrap();
        assert!(c.step_definition().is_some());
        assert!(c.last_error().is_none());
    }

    #[tokio::test]
    async fn saved_answers_are_merged_on_load() {
        let api = Arc::new(FakeApi::default());
        let mut payload = profile_payload();
        let mut saved = FormData::new();
        saved.set("company_name", "Acme");
        payload.form_data = Some(saved);

        let c = at_step(&api, 1, payload).await;

        assert_eq!(
            c.answers().unwrap().get("company_name"),
            Some(&FormValue::Text("Acme".to_owned()))
        );
    }

    #[tokio::test]
    async fn operations_check_phase() {
        let api = Arc::new(FakeApi::default());
        let mut c = controller(&api);

        assert!(matches!(
            c.verify_otp("123456").await,
            Err(FlowError::WrongPhase { actual: "prereg", .. })
        ));
        assert!(matches!(c.submit_step().await, Err(FlowError::WrongPhase { .. })));
        assert!(matches!(c.set_answer("x", "y"), Err(FlowError::WrongPhase { .. })));
        assert!(api.otp_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn answer_edits_report_the_current_phase() {
        let api = Arc::new(FakeApi::default());
        api.starts.lock().unwrap().push_back(started("s1", 300));
        let mut c = controller(&api);

        assert_eq!(
            c.toggle_choice("priorities", "channels"),
            Err(FlowError::WrongPhase {
                operation: "edit answers",
                actual: "prereg",
            })
        );

        c.start(&registration()).await.unwrap();
        assert_eq!(
            c.toggle_choice("priorities", "channels"),
            Err(FlowError::WrongPhase {
                operation: "edit answers",
                actual: "otp",
            })
        );
        assert_eq!(
            c.set_answer("company_name", "Acme"),
            Err(FlowError::WrongPhase {
                operation: "edit answers",
                actual: "otp",
            })
        );
    }

    #[tokio::test]
    async fn answers_must_belong_to_the_step() {
        let api = Arc::new(FakeApi::default());
        let mut c = at_step(&api, 2, question_payload()).await;

        assert!(matches!(
            c.set_answer("company_name", "Acme"),
            Err(FlowError::UnknownField { .. })
        ));
        assert!(matches!(
            c.set_other_text("ai_ml_usage", "x"),
            Err(FlowError::UnknownField { .. })
        ));

        c.set_other_text("priorities", "robots").unwrap();
        assert_eq!(
            c.answers().unwrap().get("priorities_other"),
            Some(&FormValue::Text("robots".to_owned()))
        );
    }

    #[tokio::test]
    async fn detect_location_fills_flagged_field_only() {
        let api = Arc::new(FakeApi::default());
        let mut c = at_step(&api, 1, profile_payload()).await;

        let filled = c
            .detect_location("pincode", 12.97, 77.59, &FixedLookup(Some("560001")))
            .await
            .unwrap();
        assert!(filled);
        assert_eq!(
            c.answers().unwrap().get("pincode"),
            Some(&FormValue::Text("560001".to_owned()))
        );

        let filled = c
            .detect_location("pincode", 0.0, 0.0, &FixedLookup(None))
            .await
            .unwrap();
        assert!(!filled);
        assert!(c.last_error().is_none());

        assert!(matches!(
            c.detect_location("company_name", 0.0, 0.0, &FixedLookup(Some("1")))
                .await,
            Err(FlowError::UnknownField { .. })
        ));
    }

    #[test]
    fn otp_normalization() {
        assert_eq!(normalize_otp("12 34-56"), "123456");
        assert_eq!(normalize_otp("1234567890"), "123456");
        assert_eq!(normalize_otp("abc"), "");
    }
}
