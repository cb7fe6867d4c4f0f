//! In-memory assessment session store.
//!
//! A session is created by a registration, unlocked by its OTP, and then
//! advanced one step at a time. Answers are kept per step under
//! `step_<n>`, and a step may only be read or written once every earlier
//! step has been submitted.
//!
//! # Security model
//!
//! - Session ids are UUID v4.
//! - OTPs are six decimal digits drawn from UUID v4 (OS CSPRNG) bytes.
//! - OTP comparison uses `subtle::ConstantTimeEq`.
//! - An OTP stops verifying once its TTL has passed.
//! - A session stops accepting OTPs after [`MAX_OTP_ATTEMPTS`] wrong codes.

use std::collections::HashMap;
use std::time::Duration;

use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use assessment_core::api::{Registration, SessionSummary};
use assessment_core::form::FormData;
use assessment_core::schema::StepDefinition;
use assessment_core::scoring::{self, ScoreCard};
use assessment_core::types::{Progress, SessionId, StepNumber};

/// Wrong OTPs a session accepts before it is locked.
pub const MAX_OTP_ATTEMPTS: u32 = 5;

/// Errors from session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    InvalidRegistration(String),

    #[error("Session not found")]
    NotFound,

    #[error("OTP expired")]
    OtpExpired,

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("Too many attempts")]
    TooManyAttempts,

    #[error("OTP not verified")]
    NotVerified,

    #[error("Invalid step")]
    InvalidStep,

    #[error("Complete previous steps first")]
    StepLocked,

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
}

/// A freshly registered session and the OTP issued for it.
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub session_id: SessionId,
    pub otp: String,
    pub expires_in: Duration,
}

/// Outcome of a successful OTP check or step submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub current_step: StepNumber,
    pub progress: Progress,
}

#[derive(Debug)]
struct Session {
    registration: Registration,
    otp: String,
    otp_expires_at: Instant,
    failed_attempts: u32,
    verified: bool,
    current_step: StepNumber,
    steps: HashMap<String, FormData>,
    last_seen: Instant,
}

impl Session {
    fn advance(&self) -> Advance {
        Advance {
            current_step: self.current_step,
            progress: Progress::for_step(self.current_step),
        }
    }

    fn check_access(&self, step: StepNumber) -> Result<(), SessionError> {
        if !self.verified {
            return Err(SessionError::NotVerified);
        }
        if step > self.current_step {
            return Err(SessionError::StepLocked);
        }
        Ok(())
    }

    fn answers(&self, step: u8) -> Option<&FormData> {
        self.steps.get(&step_key(step))
    }
}

/// All live sessions, keyed by session id.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    otp_ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(otp_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            otp_ttl,
        }
    }

    /// Validate a registration, create a session, and issue its OTP.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidRegistration`] for blank inputs, an
    /// e-mail without `@`, or unaccepted terms.
    pub async fn register(&self, registration: Registration) -> Result<IssuedOtp, SessionError> {
        validate_registration(&registration)?;

        let session_id = SessionId::new(uuid::Uuid::new_v4().to_string());
        let otp = generate_otp();
        let now = Instant::now();

        let session = Session {
            registration,
            otp: otp.clone(),
            otp_expires_at: now + self.otp_ttl,
            failed_attempts: 0,
            verified: false,
            current_step: StepNumber::FIRST,
            steps: HashMap::new(),
            last_seen: now,
        };

        self.sessions
            .write()
            .await
            .insert(session_id.as_str().to_owned(), session);

        info!(session_id = %session_id, "session registered");

        Ok(IssuedOtp {
            session_id,
            otp,
            expires_in: self.otp_ttl,
        })
    }

    /// Check the OTP of a session and unlock its steps.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotFound`] for an unknown session.
    /// - [`SessionError::OtpExpired`] once the OTP TTL has passed.
    /// - [`SessionError::TooManyAttempts`] once [`MAX_OTP_ATTEMPTS`] wrong
    ///   codes have been tried.
    /// - [`SessionError::InvalidOtp`] if the code does not match.
    pub async fn verify_otp(&self, session_id: &SessionId, otp: &str) -> Result<Advance, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id.as_str())
            .ok_or(SessionError::NotFound)?;

        let now = Instant::now();
        session.last_seen = now;

        if session.failed_attempts >= MAX_OTP_ATTEMPTS {
            return Err(SessionError::TooManyAttempts);
        }
        if now >= session.otp_expires_at {
            return Err(SessionError::OtpExpired);
        }
        if !bool::from(session.otp.as_bytes().ct_eq(otp.as_bytes())) {
            session.failed_attempts += 1;
            debug!(session_id = %session_id, attempts = session.failed_attempts, "OTP mismatch");
            if session.failed_attempts >= MAX_OTP_ATTEMPTS {
                warn!(session_id = %session_id, "OTP attempts exhausted");
            }
            return Err(SessionError::InvalidOtp);
        }

        session.verified = true;
        session.current_step = session.current_step.max(StepNumber::FIRST);
        info!(session_id = %session_id, step = %session.current_step, "OTP verified");
        Ok(session.advance())
    }

    /// Answers saved for `step`, after checking the session may read it.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotFound`] for an unknown session.
    /// - [`SessionError::NotVerified`] before the OTP has been checked.
    /// - [`SessionError::StepLocked`] for a step beyond the current one.
    pub async fn saved_answers(
        &self,
        session_id: &SessionId,
        step: StepNumber,
    ) -> Result<(String, Option<FormData>), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id.as_str())
            .ok_or(SessionError::NotFound)?;
        session.last_seen = Instant::now();
        session.check_access(step)?;

        Ok((
            session.registration.name.clone(),
            session.answers(step.get()).cloned(),
        ))
    }

    /// Store the answers of `step` and move the session forward.
    ///
    /// Only keys belonging to `definition` are kept. Re-submitting an
    /// earlier step overwrites its answers without moving the session back.
    ///
    /// # Errors
    ///
    /// - The access errors of [`saved_answers`](Self::saved_answers).
    /// - [`SessionError::MissingFields`] if a required key is blank.
    pub async fn submit(
        &self,
        session_id: &SessionId,
        step: StepNumber,
        definition: &StepDefinition,
        form_data: &FormData,
    ) -> Result<Advance, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id.as_str())
            .ok_or(SessionError::NotFound)?;
        session.last_seen = Instant::now();
        session.check_access(step)?;

        let missing = form_data.missing_required(definition);
        if !missing.is_empty() {
            return Err(SessionError::MissingFields(missing));
        }

        session
            .steps
            .insert(step_key(step.get()), form_data.scoped_to(definition));
        session.current_step = session.current_step.max(step.next());

        let advance = session.advance();
        info!(
            session_id = %session_id,
            step = %step,
            current_step = %advance.current_step,
            progress = %advance.progress,
            "step submitted"
        );
        Ok(advance)
    }

    /// Progress overview of a session, with scores once it is complete.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown session.
    pub async fn summary(&self, session_id: &SessionId) -> Result<SessionSummary, SessionError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(session_id.as_str())
            .ok_or(SessionError::NotFound)?;

        let completed = session.current_step.is_complete();
        let scores = completed.then(|| score_session(session));

        Ok(SessionSummary {
            session_id: session_id.clone(),
            name: session.registration.name.clone(),
            current_step: session.current_step.into(),
            progress_percent: Progress::for_step(session.current_step).into(),
            completed,
            survey_code: scoring::survey_code(session_id.as_str()),
            scores,
        })
    }

    /// Drop sessions that have been idle for longer than `idle_ttl`.
    ///
    /// Returns the number of sessions removed.
    pub async fn sweep_idle(&self, idle_ttl: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| now.duration_since(s.last_seen) <= idle_ttl);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn score_session(session: &Session) -> ScoreCard {
    let empty = FormData::new();
    let step = |n| session.answers(n).unwrap_or(&empty);
    scoring::score(step(2), step(3), step(4))
}

fn step_key(step: u8) -> String {
    format!("step_{step}")
}

fn validate_registration(registration: &Registration) -> Result<(), SessionError> {
    let missing = registration.missing_fields();
    if !missing.is_empty() {
        return Err(SessionError::InvalidRegistration(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }
    if !registration.email.contains('@') {
        return Err(SessionError::InvalidRegistration(
            "Enter a valid email address".to_owned(),
        ));
    }
    if !registration.terms_accepted {
        return Err(SessionError::InvalidRegistration(
            "You must accept the terms and conditions".to_owned(),
        ));
    }
    Ok(())
}

/// Six decimal digits from the 128 random bits of a UUID v4.
fn generate_otp() -> String {
    let value = uuid::Uuid::new_v4().as_u128() % 1_000_000;
    format!("{value:06}")
}
