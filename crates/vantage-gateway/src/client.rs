//! HTTP credential gateway
//!
//! Thin `reqwest` client over the backend auth endpoints with an explicit
//! request timeout. Non-2xx responses are classified from the status code
//! and the `{code, message}` error body.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::api::CredentialApi;
use crate::error::GatewayError;
use crate::types::{AuthPayload, Credentials, ProfileUpdate, RegisterRequest, User, UserConfig};
use crate::Result;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct CredentialGateway {
    http: reqwest::Client,
    base_url: Url,
}

impl CredentialGateway {
    pub fn new(base_url: Url) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: Url, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn request<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.dispatch(builder).await?;
        response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("Malformed response body: {e}")))
    }

    async fn dispatch(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = classify_error(status, &body);
        tracing::debug!(status = %status, error = %error, "Request rejected");
        Err(error)
    }
}

#[async_trait]
impl CredentialApi for CredentialGateway {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthPayload> {
        let url = self.endpoint("/users/register");
        self.request(self.http.post(url).json(request)).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthPayload> {
        let url = self.endpoint("/users/login");
        self.request(self.http.post(url).json(credentials)).await
    }

    async fn login_with_google(&self, access_token: &str) -> Result<AuthPayload> {
        #[derive(serde::Serialize)]
        struct GoogleLogin<'a> {
            access_token: &'a str,
        }

        let url = self.endpoint("/auth/google");
        self.request(self.http.post(url).json(&GoogleLogin { access_token }))
            .await
    }

    async fn logout(&self, token: &str) -> Result<()> {
        let url = self.endpoint("/users/logout");
        self.dispatch(self.http.post(url).bearer_auth(token))
            .await
            .map(|_| ())
    }

    async fn current_user(&self, token: &str) -> Result<User> {
        let url = self.endpoint("/users/me");
        self.request(self.http.get(url).bearer_auth(token)).await
    }

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<ProfileUpdate> {
        let url = self.endpoint("/users/profile");
        self.request(self.http.put(url).bearer_auth(token).json(update))
            .await
    }

    async fn user_config(&self, token: &str) -> Result<UserConfig> {
        let url = self.endpoint("/users/config");
        self.request(self.http.get(url).bearer_auth(token)).await
    }

    async fn create_user_config(&self, token: &str, config: &UserConfig) -> Result<UserConfig> {
        let url = self.endpoint("/users/config");
        self.request(self.http.post(url).bearer_auth(token).json(config))
            .await
    }

    async fn update_user_config(&self, token: &str, config: &UserConfig) -> Result<UserConfig> {
        let url = self.endpoint("/users/config");
        self.request(self.http.put(url).bearer_auth(token).json(config))
            .await
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Transport("Request timed out".to_string())
    } else {
        GatewayError::Transport(format!("Network error: {e}"))
    }
}

/// Backend error body shape.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Map a non-2xx response to the error taxonomy. Pure so it can be tested
/// without a server.
fn classify_error(status: StatusCode, body: &str) -> GatewayError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();

    if let Some(code) = parsed.code.as_deref() {
        match code {
            "INVALID_CREDENTIALS" | "AUTHENTICATION_FAILED" => {
                return GatewayError::InvalidCredentials;
            }
            "VALIDATION_ERROR" => {
                return GatewayError::Validation(
                    parsed
                        .message
                        .unwrap_or_else(|| "Invalid request".to_string()),
                );
            }
            _ => {}
        }
    }

    if status == StatusCode::UNPROCESSABLE_ENTITY {
        return GatewayError::Validation(
            parsed
                .message
                .unwrap_or_else(|| "Invalid request".to_string()),
        );
    }

    if status == StatusCode::UNAUTHORIZED {
        return GatewayError::Unauthorized;
    }

    GatewayError::Transport(
        parsed
            .message
            .unwrap_or_else(|| format!("Request failed with status {status}")),
    )
}
