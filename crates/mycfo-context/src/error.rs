use thiserror::Error;

/// Why a fetcher could not produce a domain snapshot. Never leaves the
/// dispatcher: it is logged and folded into `FetchOutcome::Failed`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no base URL configured for the {0} backend")]
    MissingBaseUrl(&'static str),

    #[error("session has no user identity for a per-user endpoint")]
    MissingIdentity,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("{url} answered HTTP {status}")]
    Status { status: u16, url: String },

    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("another message is still being processed")]
    Busy,

    #[error("message is empty")]
    EmptyMessage,

    #[error("assistant backend failed: {0}")]
    Assistant(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
