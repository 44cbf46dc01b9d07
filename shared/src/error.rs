use thiserror::Error;

/// Failure to turn a fetch into a new Entity Store. The store is left
/// untouched whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error(transparent)]
    NetworkFailure(#[from] NetworkFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkFailure {
    /// Server answered with a non-success status.
    #[error("server responded with HTTP {0}")]
    Status(u16),
    /// Request went out but nothing came back (offline, CORS, timeout).
    #[error("no response received: {0}")]
    NoResponse(String),
    /// Request could not be built or dispatched.
    #[error("request not sent: {0}")]
    NotSent(String),
}

impl IngestError {
    /// Non-fatal status line shown to the user.
    pub fn status_message(&self) -> String {
        match self {
            Self::MalformedPayload(_) => {
                "Received an unexpected response. Showing the last known data.".to_string()
            }
            Self::NetworkFailure(NetworkFailure::Status(code)) => {
                format!("Server error (HTTP {code}). Try refreshing again shortly.")
            }
            Self::NetworkFailure(NetworkFailure::NoResponse(_)) => {
                "No response from the server. Check your connection and retry.".to_string()
            }
            Self::NetworkFailure(NetworkFailure::NotSent(_)) => {
                "Could not send the request. Retry in a moment.".to_string()
            }
        }
    }

    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkFailure(_))
    }
}

/// A single item's coordinate could not be read as a finite number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field} coordinate: {value:?}")]
pub struct CoordinateError {
    pub field: &'static str,
    pub value: String,
}

/// Reasons a single item is excluded at ingestion. Never surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error(transparent)]
    Coordinates(#[from] CoordinateError),
    #[error("item has no name")]
    MissingName,
    #[error("item is not a record: {0}")]
    NotARecord(String),
}

/// Geolocation failed or is not supported by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("location unavailable: {0}")]
pub struct LocationUnavailable(pub String);
