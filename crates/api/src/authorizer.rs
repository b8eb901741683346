//! Payment authorizer backed by an external HTTP service.

use std::time::Duration;

use async_trait::async_trait;
use domain::{AuthorizationOutcome, AuthorizationRequest, AuthorizerError, PaymentAuthorizer};
use reqwest::StatusCode;
use serde::Deserialize;

/// Body returned by the authorization service.
///
/// `{"status": "success", "data": {"authorization": true}}` approves; a
/// `"fail"` status or `"authorization": false` rejects.
#[derive(Debug, Deserialize)]
struct AuthorizationBody {
    status: String,
    #[serde(default)]
    data: Option<AuthorizationData>,
}

#[derive(Debug, Deserialize)]
struct AuthorizationData {
    authorization: bool,
}

impl AuthorizationBody {
    fn outcome(&self) -> Result<AuthorizationOutcome, AuthorizerError> {
        match (self.status.as_str(), &self.data) {
            ("success", Some(data)) if data.authorization => Ok(AuthorizationOutcome::Approved),
            ("success", Some(_)) | ("fail", _) => Ok(AuthorizationOutcome::Rejected),
            (status, _) => Err(AuthorizerError::MalformedResponse(format!(
                "unrecognized authorization status '{status}'"
            ))),
        }
    }
}

/// Consults a remote authorization endpoint with `GET`.
#[derive(Debug, Clone)]
pub struct HttpPaymentAuthorizer {
    client: reqwest::Client,
    url: String,
}

impl HttpPaymentAuthorizer {
    /// Creates an authorizer for `url` whose requests give up after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PaymentAuthorizer for HttpPaymentAuthorizer {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn check_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationOutcome, AuthorizerError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                AuthorizerError::Timeout
            } else {
                AuthorizerError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Ok(AuthorizationOutcome::Rejected);
        }
        if !status.is_success() {
            return Err(AuthorizerError::UnexpectedStatus(status.as_u16()));
        }

        let body: AuthorizationBody = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AuthorizerError::Timeout
            } else {
                AuthorizerError::MalformedResponse(e.to_string())
            }
        })?;
        body.outcome()
    }
}
