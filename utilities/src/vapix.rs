use std::{fmt, sync::Arc};

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VapixError {
    #[error("HTTP error (status {status}): {message}")]
    Http { status: u16, message: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Camera returned error: {message}")]
    Rpc {
        code: Option<i64>,
        message: String,
        details: Option<Value>,
    },
}

impl VapixError {
    /// Numeric code carried by the error: the JSON-RPC error code, or the
    /// HTTP status for a failed request.
    pub fn code(&self) -> Option<i64> {
        match self {
            VapixError::Http { status, .. } => Some(*status as i64),
            VapixError::Rpc { code, .. } => *code,
            _ => None,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            VapixError::Rpc { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

/// A connection to the camera's CGI endpoints.
///
/// Implementations own authentication, timeouts and connection reuse.
/// Paths are relative to `/axis-cgi`.
pub trait VapixTransport {
    /// Sends a JSON body and returns the decoded response. A response
    /// carrying an `error` member is reported as [`VapixError::Rpc`].
    fn send_json(&self, path: &str, method: HttpMethod, payload: &Value)
        -> Result<Value, VapixError>;

    /// Sends CGI arguments (query string for GET, form body for POST) and
    /// returns the raw response text.
    fn send_query(
        &self,
        path: &str,
        method: HttpMethod,
        params: &[(String, String)],
    ) -> Result<String, VapixError>;
}

impl<T: VapixTransport + ?Sized> VapixTransport for &T {
    fn send_json(
        &self,
        path: &str,
        method: HttpMethod,
        payload: &Value,
    ) -> Result<Value, VapixError> {
        (**self).send_json(path, method, payload)
    }

    fn send_query(
        &self,
        path: &str,
        method: HttpMethod,
        params: &[(String, String)],
    ) -> Result<String, VapixError> {
        (**self).send_query(path, method, params)
    }
}

impl<T: VapixTransport + ?Sized> VapixTransport for Arc<T> {
    fn send_json(
        &self,
        path: &str,
        method: HttpMethod,
        payload: &Value,
    ) -> Result<Value, VapixError> {
        (**self).send_json(path, method, payload)
    }

    fn send_query(
        &self,
        path: &str,
        method: HttpMethod,
        params: &[(String, String)],
    ) -> Result<String, VapixError> {
        (**self).send_query(path, method, params)
    }
}

/// Turns a JSON-RPC style body with an `error` member into an error.
pub fn unwrap_rpc_response(body: Value) -> Result<Value, VapixError> {
    let Some(error) = body.get("error") else {
        return Ok(body);
    };

    if error.is_null() {
        return Ok(body);
    }

    let code = error.get("code").and_then(Value::as_i64);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    let details = error
        .get("errors")
        .or_else(|| error.get("details"))
        .cloned()
        .or_else(|| Some(error.clone()));

    Err(VapixError::Rpc {
        code,
        message,
        details,
    })
}
