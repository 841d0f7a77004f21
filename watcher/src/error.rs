use thiserror::Error;

/// Everything that can go wrong in a single poll cycle.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("request to {url} (from_date={cursor}) failed: {reason}")]
    Connectivity {
        url: String,
        cursor: i64,
        reason: String,
    },

    #[error("endpoint {url} (from_date={cursor}) answered HTTP {status}")]
    Endpoint { url: String, cursor: i64, status: u16 },

    #[error("response body is not valid JSON: {reason}")]
    Format { reason: String },

    #[error("unexpected API response shape: {reason}")]
    Shape { reason: String },

    #[error("unknown homework status `{status}`")]
    UnknownStatus { status: String },

    #[error("malformed homework record: {reason}")]
    MalformedRecord { reason: String },

    #[error("failed to deliver message \"{message}\": {reason}")]
    Delivery { message: String, reason: String },
}

impl PollError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connectivity { .. } => "connectivity",
            Self::Endpoint { .. } => "endpoint",
            Self::Format { .. } => "format",
            Self::Shape { .. } => "shape",
            Self::UnknownStatus { .. } => "unknown_status",
            Self::MalformedRecord { .. } => "malformed_record",
            Self::Delivery { .. } => "delivery",
        }
    }

    pub(crate) fn shape(reason: impl Into<String>) -> Self {
        Self::Shape {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            reason: reason.into(),
        }
    }
}
