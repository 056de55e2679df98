use persistence::PersistenceError;

#[derive(Debug, thiserror::Error)]
pub enum ImporterError {
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("platform fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("import already in progress for this tier")]
    ImportInProgress,
}

/// Per-batch failure taxonomy (spec §4.2): tagged so the session record
/// can report *why* a batch failed without the caller parsing prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTag {
    Network,
    RateLimited,
    NotFound,
    ParseError,
}

impl FailureTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::ParseError => "parse_error",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{tag:?}: {message}")]
pub struct FetchError {
    pub tag: FailureTag,
    pub message: String,
}

impl FetchError {
    pub fn network(message: impl Into<String>) -> Self {
        Self { tag: FailureTag::Network, message: message.into() }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self { tag: FailureTag::RateLimited, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { tag: FailureTag::NotFound, message: message.into() }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self { tag: FailureTag::ParseError, message: message.into() }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::network(err.to_string())
        } else if err.status().map(|s| s.as_u16()) == Some(429) {
            Self::rate_limited(err.to_string())
        } else if err.status().map(|s| s.as_u16()) == Some(404) {
            Self::not_found(err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}
