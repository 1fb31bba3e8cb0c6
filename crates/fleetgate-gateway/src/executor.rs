//! Request executor: the narrow contract to the remote device-management API.
//!
//! The gateway core never speaks the remote API's domain language; it only
//! needs `(method, path, params) -> result | categorized error`.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Categorized errors from the remote API boundary.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Remote resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidArgument(String),

    #[error("Remote API unavailable: {0}")]
    Unavailable(String),

    #[error("Remote API error: {0}")]
    Internal(String),
}

/// Executes one request against the remote device-management API.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Perform `method path` with optional JSON parameters.
    ///
    /// GET/DELETE parameters travel as query strings, everything else as a
    /// JSON body.
    async fn execute(
        &self,
        method: &str,
        path: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, ExecutorError>;
}

/// HTTP client for the remote fleet API.
#[derive(Clone, Debug)]
pub struct HttpExecutor {
    base_url: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl HttpExecutor {
    /// Create an executor against `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            client: reqwest::Client::new(),
        }
    }

    /// Attach a bearer token for the remote API.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(
        &self,
        method: &str,
        path: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, ExecutorError> {
        let http_method = parse_method(method)?;
        let url = self.url(path);
        let request_id = fleetgate_core::id::short_id();
        debug!(%method, %url, %request_id, "executing remote request");

        let mut request = self.client.request(http_method.clone(), &url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        if let Some(params) = params {
            request = if http_method == reqwest::Method::GET
                || http_method == reqwest::Method::DELETE
            {
                request.query(&flatten_query(&params)?)
            } else {
                request.json(&params)
            };
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExecutorError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExecutorError::Internal(e.to_string()))?;

        map_status(status, &body)
    }
}

fn parse_method(method: &str) -> Result<reqwest::Method, ExecutorError> {
    match method.to_uppercase().as_str() {
        "GET" => Ok(reqwest::Method::GET),
        "POST" => Ok(reqwest::Method::POST),
        "PUT" => Ok(reqwest::Method::PUT),
        "PATCH" => Ok(reqwest::Method::PATCH),
        "DELETE" => Ok(reqwest::Method::DELETE),
        other => Err(ExecutorError::InvalidArgument(format!(
            "Unsupported HTTP method '{other}'"
        ))),
    }
}

/// Flatten a JSON object into query pairs; only scalar values are allowed.
fn flatten_query(params: &serde_json::Value) -> Result<Vec<(String, String)>, ExecutorError> {
    let object = params.as_object().ok_or_else(|| {
        ExecutorError::InvalidArgument("Query parameters must be a JSON object".to_string())
    })?;

    object
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(ExecutorError::InvalidArgument(format!(
                        "Query parameter '{key}' must be a scalar, got {other}"
                    )))
                }
            };
            Ok((key.clone(), rendered))
        })
        .collect()
}

/// Map an HTTP status and body into the executor's error categories.
fn map_status(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<serde_json::Value, ExecutorError> {
    if status.is_success() {
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        return serde_json::from_str(body)
            .map_err(|e| ExecutorError::Internal(format!("Malformed response body: {e}")));
    }

    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };

    match status.as_u16() {
        404 => Err(ExecutorError::NotFound(message)),
        400 | 409 | 422 => Err(ExecutorError::InvalidArgument(message)),
        502 | 503 | 504 => Err(ExecutorError::Unavailable(message)),
        _ => Err(ExecutorError::Internal(message)),
    }
}
