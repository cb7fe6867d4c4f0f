//! Assessment client implementation.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use assessment_core::api::{
    AssessmentApi, ErrorBody, Registration, SessionSummary, StartResponse, StepPayload,
    SubmitRequest, SubmitResponse, VerifyOtpRequest, VerifyOtpResponse,
};
use assessment_core::error::ApiError;
use assessment_core::types::{SessionId, StepNumber};

use crate::error::ClientError;
use crate::{
    AssessmentClient, BASE_URL_ENV, ClientConfig, DEFAULT_BASE_URL, DEFAULT_USER_AGENT,
};

const API_PREFIX: &str = "/api/assessment";

impl AssessmentClient {
    /// Create a client from the environment alone.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Network` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ClientError> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with full configuration.
    ///
    /// # Errors
    ///
    /// - `ClientError::Config` if the resolved base URL is not `http(s)`.
    /// - `ClientError::Network` if the HTTP client cannot be built.
    #[allow(clippy::needless_pass_by_value)]
    pub fn with_config(cfg: ClientConfig) -> Result<Self, ClientError> {
        let base_url = resolve_url(
            &cfg.base_url,
            &std::env::var(BASE_URL_ENV).unwrap_or_default(),
            DEFAULT_BASE_URL,
        );
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "invalid base URL '{base_url}': expected http:// or https://"
            )));
        }

        let user_agent = first_non_empty(&[&cfg.user_agent, DEFAULT_USER_AGENT]);

        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ClientError::Network)?;

        Ok(Self { base_url, client })
    }

    /// The resolved service base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register and request an OTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service rejects it.
    pub async fn start(&self, registration: &Registration) -> Result<StartResponse, ClientError> {
        self.request(Method::POST, "/start/", Some(registration)).await
    }

    /// Check an OTP.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with the service's message for a wrong or
    /// expired code.
    pub async fn verify_otp(
        &self,
        request: &VerifyOtpRequest,
    ) -> Result<VerifyOtpResponse, ClientError> {
        self.request(Method::POST, "/verify-otp/", Some(request)).await
    }

    /// Fetch the definition of `step` and any saved answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the step is not accessible.
    pub async fn questions(
        &self,
        session_id: &SessionId,
        step: StepNumber,
    ) -> Result<StepPayload, ClientError> {
        let path = format!(
            "/questions/{step}/?session_id={}",
            urlencoding::encode(session_id.as_str())
        );
        self.request::<StepPayload, ()>(Method::GET, &path, None).await
    }

    /// Save the answers of one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service refuses the
    /// answers.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, ClientError> {
        self.request(Method::POST, "/submit/", Some(request)).await
    }

    /// Progress overview of a session, with scores once it is complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session is unknown.
    pub async fn session_summary(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionSummary, ClientError> {
        let path = format!(
            "/session/?session_id={}",
            urlencoding::encode(session_id.as_str())
        );
        self.request::<SessionSummary, ()>(Method::GET, &path, None).await
    }

    // --- Private ---

    async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let url = format!("{}{API_PREFIX}{path}", self.base_url);
        debug!(%method, %url, "assessment request");

        let mut req = self.client.request(method, &url);
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout
            } else {
                ClientError::Network(e)
            }
        })?;

        let status = resp.status();
        let text = resp.text().await.map_err(ClientError::Network)?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(ClientError::Json);
        }

        // Parse error body
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty());

        debug!(status = status.as_u16(), ?message, "assessment request rejected");

        Err(match message {
            Some(message) => ClientError::Api {
                status_code: status.as_u16(),
                message,
            },
            None => ClientError::Status {
                status_code: status.as_u16(),
            },
        })
    }
}

#[async_trait::async_trait]
impl AssessmentApi for AssessmentClient {
    async fn start(&self, registration: &Registration) -> Result<StartResponse, ApiError> {
        Ok(AssessmentClient::start(self, registration).await?)
    }

    async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<VerifyOtpResponse, ApiError> {
        Ok(AssessmentClient::verify_otp(self, request).await?)
    }

    async fn questions(
        &self,
        session_id: &SessionId,
        step: StepNumber,
    ) -> Result<StepPayload, ApiError> {
        Ok(AssessmentClient::questions(self, session_id, step).await?)
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError> {
        Ok(AssessmentClient::submit(self, request).await?)
    }
}

/// Pick the configured value, else the environment value, else the
/// default; trimmed and without a trailing `/`.
pub(crate) fn resolve_url(configured: &str, from_env: &str, default: &str) -> String {
    first_non_empty(&[configured.trim(), from_env.trim(), default])
        .trim_end_matches('/')
        .to_owned()
}

fn first_non_empty(vals: &[&str]) -> String {
    for v in vals {
        if !v.is_empty() {
            return (*v).to_owned();
        }
    }
    String::new()
}
