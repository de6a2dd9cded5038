//! HTTP client for the task backend REST API.
//!
//! Thin typed wrapper over `reqwest`. Every call returns the decoded
//! payload or an [`ApiError`]; a `401` is surfaced as
//! [`ApiError::is_unauthorized`] so the caller can tear down the session
//! rather than retry.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use tasklive_proto::task::{Task, TaskFilter, TaskForm, TaskId, TaskPatch};
use tasklive_proto::user::{AuthResponse, LoginForm, RegisterForm, User};

/// Errors from a backend call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
    },
    /// The request never completed (DNS, refused connection, timeout).
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),
    /// The response body was not the shape we expected.
    #[error("malformed response: {0}")]
    Decode(#[source] reqwest::Error),
    /// The base URL and path did not combine into a valid URL.
    #[error("bad request url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// True when the server rejected our credentials.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}

/// Error body the backend sends on failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for the task backend. Cheap to clone, holds a connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: url::Url,
    token: Option<String>,
}

impl ApiClient {
    /// Builds a client for the given base URL, e.g.
    /// `http://localhost:5000/api/v1`.
    ///
    /// # Errors
    /// Fails if the URL does not parse or the TLS backend cannot
    /// initialize.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Network)?;
        // A trailing slash changes how join() resolves relative paths.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Ok(Self {
            http,
            base_url: url::Url::parse(&normalized)?,
            token: None,
        })
    }

    /// Sets the bearer token attached to subsequent requests.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Whether a bearer token is currently attached.
    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(ApiError::Decode);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Creates an account and returns the fresh session.
    pub async fn register(&self, form: &RegisterForm) -> Result<AuthResponse, ApiError> {
        let req = self.http.post(self.endpoint("auth/register")?).json(form);
        let response = self.authorize(req).send().await.map_err(ApiError::Network)?;
        Self::decode(response).await
    }

    /// Exchanges credentials for a session.
    pub async fn login(&self, form: &LoginForm) -> Result<AuthResponse, ApiError> {
        let req = self.http.post(self.endpoint("auth/login")?).json(form);
        let response = self.authorize(req).send().await.map_err(ApiError::Network)?;
        Self::decode(response).await
    }

    /// Fetches the profile behind the current token. Used at startup to
    /// validate a persisted session.
    pub async fn me(&self) -> Result<User, ApiError> {
        let req = self.http.get(self.endpoint("auth/me")?);
        let response = self.authorize(req).send().await.map_err(ApiError::Network)?;
        Self::decode(response).await
    }

    /// Lists all registered users.
    pub async fn users(&self) -> Result<Vec<User>, ApiError> {
        let req = self.http.get(self.endpoint("users")?);
        let response = self.authorize(req).send().await.map_err(ApiError::Network)?;
        Self::decode(response).await
    }

    /// Fetches the task list, optionally narrowed server-side.
    pub async fn tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ApiError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(status) = filter.status {
            query.push(("status", status.to_string()));
        }
        if let Some(search) = &filter.search {
            query.push(("search", search.clone()));
        }
        let req = self.http.get(self.endpoint("tasks")?).query(&query);
        let response = self.authorize(req).send().await.map_err(ApiError::Network)?;
        Self::decode(response).await
    }

    /// Fetches one task by id.
    pub async fn task(&self, id: &TaskId) -> Result<Task, ApiError> {
        let req = self.http.get(self.endpoint(&format!("tasks/{id}"))?);
        let response = self.authorize(req).send().await.map_err(ApiError::Network)?;
        Self::decode(response).await
    }

    /// Creates a task and returns the server's canonical record.
    pub async fn create_task(&self, form: &TaskForm) -> Result<Task, ApiError> {
        let req = self.http.post(self.endpoint("tasks")?).json(form);
        let response = self.authorize(req).send().await.map_err(ApiError::Network)?;
        Self::decode(response).await
    }

    /// Applies a partial update and returns the updated record.
    pub async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        let req = self
            .http
            .put(self.endpoint(&format!("tasks/{id}"))?)
            .json(patch);
        let response = self.authorize(req).send().await.map_err(ApiError::Network)?;
        Self::decode(response).await
    }

    /// Deletes a task. The body is a confirmation message we discard.
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        let req = self.http.delete(self.endpoint(&format!("tasks/{id}"))?);
        let response = self.authorize(req).send().await.map_err(ApiError::Network)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}
