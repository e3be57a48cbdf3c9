use serde_json::Value;
use utilities::vapix::VapixError;

/// Failure of an optics control request.
///
/// `code` and `details` are filled from the camera's JSON-RPC error member
/// when there is one; for HTTP failures `code` holds the status.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct OpticsControlError {
    pub message: String,
    pub code: Option<i64>,
    pub details: Option<Value>,
    #[source]
    source: Option<VapixError>,
}

impl OpticsControlError {
    pub fn transport_error(&self) -> Option<&VapixError> {
        self.source.as_ref()
    }
}

impl From<VapixError> for OpticsControlError {
    fn from(error: VapixError) -> Self {
        let message = match &error {
            VapixError::Rpc { message, .. } => message.clone(),
            other => other.to_string(),
        };

        Self {
            message,
            code: error.code(),
            details: error.details().cloned(),
            source: Some(error),
        }
    }
}
