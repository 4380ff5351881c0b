//! OIDC-authenticated progress reporting to the tournament control plane.

use saturn_protocol::TaskStatus;
use std::collections::HashMap;
use thiserror::Error;

/// Maximum number of 3xx hops the reporter will follow before giving up.
const MAX_REDIRECTS: u32 = 10;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to mint an ID token: {0}")]
    Token(String),

    #[error("report request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("report request redirected more than {0} times")]
    TooManyRedirects(u32),

    #[error("control plane returned status {0}")]
    UnexpectedStatus(u16),
}

impl ReportError {
    /// All reporter failures are retryable: a failed report just means
    /// the caller nacks and a future redelivery tries again.
    pub fn retryable(&self) -> bool {
        true
    }
}

/// Whether the control plane accepted the report outcome, or declared
/// the task obsolete via HTTP 409.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Accepted,
    ExternallyAborted,
}

/// Mints the bearer token attached to every report request. The actual
/// ID-token minting RPC is a black box; this trait is the seam, with a
/// metadata-server-flavored implementation provided by callers in
/// production and a fixed-token stub in tests.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self, audience: &str) -> Result<String, ReportError>;
}

/// A `TokenProvider` that always returns the same pre-minted token.
/// Grounded on test/dev token providers elsewhere in the pack (e.g. the
/// CI/CD supervisor's static service-account credentials) rather than a
/// real metadata-server round trip.
pub struct StaticToken(pub String);

#[async_trait::async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self, _audience: &str) -> Result<String, ReportError> {
        Ok(self.0.clone())
    }
}

/// Reports task progress by POSTing JSON to the task's `report_url`, with
/// an OIDC bearer token minted for `audience`.
pub struct GcpTokenedReporter {
    client: reqwest::Client,
    tokens: std::sync::Arc<dyn TokenProvider>,
    audience: String,
    user_agent: String,
}

impl GcpTokenedReporter {
    pub fn new(tokens: std::sync::Arc<dyn TokenProvider>, audience: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            // Redirects are followed manually (reissued as POST) rather
            // than via reqwest's own policy, which downgrades POST to GET.
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("reqwest client builds"),
            tokens,
            audience: audience.into(),
            user_agent: user_agent.into(),
        }
    }

    /// POST the current task outcome to `report_url`.
    pub async fn report(
        &self,
        report_url: &str,
        details: &HashMap<String, serde_json::Value>,
        status: TaskStatus,
        logs: &str,
        interrupted: bool,
    ) -> Result<ReportOutcome, ReportError> {
        let mut body = serde_json::Map::new();
        for (key, value) in details {
            body.insert(key.clone(), value.clone());
        }
        body.insert(
            "invocation".to_string(),
            serde_json::json!({
                "status": status.wire_tag(),
                "logs": logs,
                "interrupted": interrupted,
            }),
        );
        let body = serde_json::Value::Object(body);

        let token = self.tokens.token(&self.audience).await?;
        let mut url = report_url.to_string();

        for _ in 0..=MAX_REDIRECTS {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&token)
                .header(reqwest::header::USER_AGENT, &self.user_agent)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .json(&body)
                .send()
                .await?;

            let status_code = response.status();
            if status_code.is_success() {
                return Ok(ReportOutcome::Accepted);
            }
            if status_code.as_u16() == 409 {
                return Ok(ReportOutcome::ExternallyAborted);
            }
            if status_code.is_redirection() {
                if let Some(location) = response.headers().get(reqwest::header::LOCATION) {
                    url = location.to_str().unwrap_or(&url).to_string();
                    continue;
                }
            }
            return Err(ReportError::UnexpectedStatus(status_code.as_u16()));
        }

        Err(ReportError::TooManyRedirects(MAX_REDIRECTS))
    }
}
