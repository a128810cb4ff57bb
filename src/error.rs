use miette::Diagnostic;
use thiserror::Error;

/// Failure of one of the external data feeds.
#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("{feed} request failed: {source}")]
    Http {
        feed: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{feed} request timed out")]
    Timeout { feed: &'static str },
    #[error("could not parse {feed} response: {detail}")]
    Parse { feed: &'static str, detail: String },
}

impl FetchError {
    /// Classify a reqwest error for `feed` into the taxonomy.
    pub(crate) fn from_reqwest(feed: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout { feed }
        } else if source.is_decode() {
            FetchError::Parse {
                feed,
                detail: source.to_string(),
            }
        } else {
            FetchError::Http { feed, source }
        }
    }

    pub fn retryable(&self) -> bool {
        matches!(self, FetchError::Http { .. } | FetchError::Timeout { .. })
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum GenerationError {
    #[error("generation backend rate limited the request")]
    RateLimited,
    #[error("generation request timed out")]
    Timeout,
    #[error("generation backend rejected the request: {detail}")]
    InvalidRequest { detail: String },
}

impl GenerationError {
    pub fn retryable(&self) -> bool {
        matches!(self, GenerationError::RateLimited | GenerationError::Timeout)
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("could not deliver message: {detail}")]
pub struct DeliveryError {
    pub detail: String,
}

/// Invalid startup configuration. Fatal: the embedding binary should abort.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),
    #[error("fire hour {0} out of range 0-23")]
    FireHourOutOfRange(u32),
    #[error("fire minute {0} out of range 0-59")]
    FireMinuteOutOfRange(u32),
}

/// Anything that can sink a single compose run.
#[derive(Debug, Error, Diagnostic)]
pub enum ComposeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}
