//! OTP delivery.
//!
//! The server never returns an OTP in a response; it hands the code to an
//! [`OtpDelivery`] backend. [`LogDelivery`] writes it to the log when
//! explicitly enabled, and [`Outbox`] keeps the latest code per session in
//! memory for tests and local demos.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info};

use assessment_core::api::Registration;
use assessment_core::types::SessionId;

/// Sends an issued OTP to the registrant.
pub trait OtpDelivery: Send + Sync {
    fn deliver(&self, session_id: &SessionId, registration: &Registration, otp: &str);
}

/// Logs issued codes when `reveal` is set; otherwise only notes the issue.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDelivery {
    pub reveal: bool,
}

impl OtpDelivery for LogDelivery {
    fn deliver(&self, session_id: &SessionId, registration: &Registration, otp: &str) {
        if self.reveal {
            info!(session_id = %session_id, phone = %registration.phone, otp, "OTP issued");
        } else {
            debug!(session_id = %session_id, "OTP issued, no delivery channel configured");
        }
    }
}

/// Remembers the most recent OTP of each session.
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<HashMap<String, String>>,
}

impl Outbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last code delivered for `session_id`.
    pub fn latest(&self, session_id: &str) -> Option<String> {
        self.sent
            .lock()
            .ok()
            .and_then(|sent| sent.get(session_id).cloned())
    }
}

impl OtpDelivery for Outbox {
    fn deliver(&self, session_id: &SessionId, _registration: &Registration, otp: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.insert(session_id.as_str().to_owned(), otp.to_owned());
        }
    }
}
