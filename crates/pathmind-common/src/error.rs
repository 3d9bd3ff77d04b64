use thiserror::Error;

use crate::entities::ResolutionCandidate;

/// Failure of a single upstream call.
///
/// Whether this is fatal for a run is decided by the caller: the primary
/// bioactivity source escalates it to [`PathmindError::FatalUpstream`],
/// every other source absorbs it as a degradation notice.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    #[error("{source_name} request failed: {message}")]
    Request { source_name: String, message: String },

    #[error("{source_name} returned HTTP {status}")]
    Status { source_name: String, status: u16 },

    #[error("{source_name} circuit is open")]
    CircuitOpen { source_name: String },

    #[error("{source_name} response could not be decoded: {message}")]
    Decode { source_name: String, message: String },

    #[error("Network capabilities capped: domain not in allowlist for URL {url}")]
    Blocked { url: String },
}

impl SourceError {
    pub fn request(source_name: &str, message: impl Into<String>) -> Self {
        Self::Request { source_name: source_name.to_string(), message: message.into() }
    }

    pub fn decode(source_name: &str, message: impl Into<String>) -> Self {
        Self::Decode { source_name: source_name.to_string(), message: message.into() }
    }

    /// Transient failures are worth another attempt; client errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Request { .. } => true,
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Coarse classification callers branch on instead of message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Ambiguous,
    NotFound,
    InvalidChoice,
    FatalUpstream,
    Invalid,
    Internal,
}

#[derive(Debug, Error)]
pub enum PathmindError {
    #[error("Drug identity is ambiguous for '{query}'. Please select a specific compound.")]
    Ambiguous {
        query: String,
        candidates: Vec<ResolutionCandidate>,
    },

    #[error("No ChEMBL molecule found for '{0}'")]
    NotFound(String),

    #[error("Resolution choice '{choice}' is invalid for query '{query}'.")]
    InvalidChoice { query: String, choice: String },

    #[error("Upstream unavailable: {0}")]
    FatalUpstream(String),

    #[error("Invalid analysis parameters: {0}")]
    InvalidParams(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PathmindError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PathmindError::Ambiguous { .. } => ErrorKind::Ambiguous,
            PathmindError::NotFound(_) => ErrorKind::NotFound,
            PathmindError::InvalidChoice { .. } => ErrorKind::InvalidChoice,
            PathmindError::FatalUpstream(_) => ErrorKind::FatalUpstream,
            PathmindError::InvalidParams(_) => ErrorKind::Invalid,
            PathmindError::Repository(_)
            | PathmindError::Config(_)
            | PathmindError::Serialization(_)
            | PathmindError::Other(_) => ErrorKind::Internal,
        }
    }

    /// Errors the caller caused and can fix by changing the request.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Ambiguous | ErrorKind::NotFound | ErrorKind::InvalidChoice | ErrorKind::Invalid
        )
    }

    /// Candidate list carried by an ambiguous resolution, empty otherwise.
    pub fn candidates(&self) -> &[ResolutionCandidate] {
        match self {
            PathmindError::Ambiguous { candidates, .. } => candidates,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, PathmindError>;
