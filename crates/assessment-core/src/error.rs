//! Error types for `assessment-core`.
//!
//! [`ApiError`] is what an [`AssessmentApi`](crate::api::AssessmentApi)
//! implementation reports; [`FlowError`] is what the phase controller
//! returns to its caller. Neither distinguishes transient from permanent
//! failures: every request error ends up as one inline message.

/// Failure reported by the assessment service or the transport to it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The service answered with a non-2xx status. `message` is the
    /// service's `error` text, or a generic fallback if it sent none.
    #[error("{message}")]
    Rejected { message: String },

    /// The request never produced a usable response (connection refused,
    /// unreadable body, malformed JSON).
    #[error("request failed: {reason}")]
    Transport { reason: String },
}

impl ApiError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }
}

/// Errors from phase controller operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// Required inputs are blank; nothing was sent.
    #[error("please fill in: {}", missing.join(", "))]
    Validation { missing: Vec<String> },

    /// The operation does not apply to the current phase.
    #[error("cannot {operation} while in the {actual} phase")]
    WrongPhase {
        operation: &'static str,
        actual: &'static str,
    },

    /// The current step's definition has not been fetched yet.
    #[error("step questions are not loaded")]
    StepNotLoaded,

    /// The key does not belong to the current step.
    #[error("unknown field '{key}' for this step")]
    UnknownField { key: String },

    /// The service rejected the request or could not be reached.
    #[error("{message}")]
    Request { message: String, source: ApiError },
}
