//! The assessment service contract.
//!
//! Request/response bodies of the four endpoints the phase controller
//! drives, plus the session summary, and the [`AssessmentApi`] trait that a
//! transport implements. The server crate serializes the same types, so the
//! two sides cannot drift apart.
//!
//! | Call | Method/Path |
//! |---|---|
//! | start | `POST /api/assessment/start/` |
//! | verify | `POST /api/assessment/verify-otp/` |
//! | questions | `GET /api/assessment/questions/{step}/?session_id=` |
//! | submit | `POST /api/assessment/submit/` |
//! | summary | `GET /api/assessment/session/?session_id=` |

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::form::FormData;
use crate::schema::{Field, Question, StepDefinition, StepLayout};
use crate::scoring::ScoreCard;
use crate::types::{SessionId, StepNumber};

/// OTP lifetime assumed when the start response omits `otp_expires_in`.
pub const DEFAULT_OTP_EXPIRY_SECS: u64 = 300;

/// Pre-registration form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub terms_accepted: bool,
}

impl Registration {
    /// Names of the text inputs that are blank after trimming.
    ///
    /// Terms acceptance is not checked here; the service rejects it.
    pub fn missing_fields(&self) -> Vec<String> {
        [
            ("name", &self.name),
            ("phone", &self.phone),
            ("email", &self.email),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k.to_owned())
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartResponse {
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StartResponse {
    /// OTP lifetime in seconds, defaulting when absent or zero.
    pub fn expires_in(&self) -> u64 {
        match self.otp_expires_in {
            Some(0) | None => DEFAULT_OTP_EXPIRY_SECS,
            Some(secs) => secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    pub session_id: SessionId,
    pub otp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOtpResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u32>,
}

/// Body of `GET /api/assessment/questions/{step}/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Field>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Question>>,
    /// Answers previously saved for this step (resume in place).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<FormData>,
}

impl StepPayload {
    /// Wire form of a definition, with any answers saved for the step.
    pub fn from_definition(definition: StepDefinition, form_data: Option<FormData>) -> Self {
        let (fields, questions) = match definition.layout {
            StepLayout::Fields(fields) => (Some(fields), None),
            StepLayout::Questions(questions) => (None, Some(questions)),
        };
        Self {
            title: definition.title,
            fields,
            questions,
            form_data,
        }
    }

    /// Split into the immutable definition and any saved answers.
    pub fn into_parts(self) -> (Option<StepDefinition>, Option<FormData>) {
        (
            StepDefinition::from_parts(self.title, self.fields, self.questions),
            self.form_data,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub session_id: SessionId,
    pub step: StepNumber,
    pub form_data: FormData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub current_step: u32,
    pub progress_percent: u32,
}

/// Body of `GET /api/assessment/session/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub name: String,
    pub current_step: u32,
    pub progress_percent: u32,
    pub completed: bool,
    pub survey_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScoreCard>,
}

/// JSON body of every non-2xx response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Transport for the assessment service.
///
/// Implementations perform exactly one request per call: no retries, no
/// caching.
#[async_trait::async_trait]
pub trait AssessmentApi: Send + Sync {
    /// Register and request an OTP.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the service rejects the registration or is
    /// unreachable.
    async fn start(&self, registration: &Registration) -> Result<StartResponse, ApiError>;

    /// Check an OTP for a session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] for a wrong or expired code.
    async fn verify_otp(
        &self,
        request: &VerifyOtpRequest,
    ) -> Result<VerifyOtpResponse, ApiError>;

    /// Fetch the definition of `step` and any answers saved for it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the session or step is not accessible.
    async fn questions(
        &self,
        session_id: &SessionId,
        step: StepNumber,
    ) -> Result<StepPayload, ApiError>;

    /// Persist the answers of one step.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the service refuses the answers.
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError>;
}

/// Best-effort reverse geocoding to a postal code.
#[async_trait::async_trait]
pub trait LocationLookup: Send + Sync {
    /// Postal code at the coordinates, or `None` on any failure.
    async fn postcode(&self, latitude: f64, longitude: f64) -> Option<String>;
}
