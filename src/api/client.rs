use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::infra::{config::ApiConfig, secrets::redact_text};

use super::error::ApiError;

const API_REQUEST_FAILED: &str = "API_REQUEST_FAILED";
const API_REQUEST_REJECTED: &str = "API_REQUEST_REJECTED";

/// HTTP client for the portal API. Every request carries the session's
/// bearer token when one is set.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, token: Option<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("campus-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path).query(query);
        let body = self.execute(request, Method::GET, path).await?;
        serde_json::from_slice(&body).map_err(ApiError::Decode)
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, payload: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(payload);
        let body = self.execute(request, Method::POST, path).await?;
        serde_json::from_slice(&body).map_err(ApiError::Decode)
    }

    /// POST without a payload; the response body is ignored.
    pub(crate) async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        let request = self.request(Method::POST, path);
        self.execute(request, Method::POST, path).await.map(|_| ())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        method: Method,
        path: &str,
    ) -> Result<Vec<u8>, ApiError> {
        let response = request.send().await.map_err(|error| {
            tracing::debug!(
                code = API_REQUEST_FAILED,
                %method,
                path,
                timeout = error.is_timeout(),
                "request did not complete"
            );
            ApiError::Transport(error)
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(ApiError::Transport)?;
        tracing::debug!(%method, path, status = status.as_u16(), bytes = body.len(), "api response");

        if status.is_success() {
            return Ok(body.to_vec());
        }

        let message = error_message(&body, status);
        tracing::warn!(
            code = API_REQUEST_REJECTED,
            %method,
            path,
            status = status.as_u16(),
            message = %message,
            "api request rejected"
        );

        Err(match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound,
            _ => ApiError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }
}

/// The backend reports failures as `{"error": "..."}`; anything else falls
/// back to the status reason.
fn error_message(body: &[u8], status: StatusCode) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .map(|message| redact_text(&message))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_owned())
}
