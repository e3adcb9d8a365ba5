use std::path::PathBuf;

/// Checks that fail before any request leaves the process.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("User ID and User Type are not set for the negotiation context.")]
    MissingIdentity,
    #[error("No negotiation decision has been selected.")]
    MissingDecision,
    #[error("Please enter a counter offer amount.")]
    MissingCounterOffer,
    #[error("Please choose whether the inspection date works for you.")]
    UnresolvedDateDecision,
    #[error("Invalid negotiation status: {0}")]
    InvalidStatus(String),
}

/// Failures talking to the negotiation service.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{message}")]
    Rejected { message: String },
    #[error("no bearer token available for the negotiation service")]
    MissingToken,
    #[error("cannot build request urls from `{0}`")]
    InvalidUrl(String),
}

impl ApiError {
    /// Transport-class failures worth another attempt. Application-level
    /// rejections never are.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ApiError::Status { status, .. } => matches!(status, 408 | 429 | 502 | 503 | 504),
            ApiError::Decode(_)
            | ApiError::Rejected { .. }
            | ApiError::MissingToken
            | ApiError::InvalidUrl(_) => false,
        }
    }
}

/// Everything a session operation can report back. The same message is
/// written to the store's error field.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{message}")]
    Application { message: String },
    #[error("An error occurred while {gerund} the offer.")]
    Transport { gerund: &'static str },
    #[error("{message}")]
    Load { message: String },
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid base url `{0}`")]
    InvalidBaseUrl(String),
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}
