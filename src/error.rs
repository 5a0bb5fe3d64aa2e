use thiserror::Error;

/// Failure of a single upstream lookup. Engine call sites treat every variant
/// as "no data"; none of them abort a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("api base cannot carry path segments: {0}")]
    InvalidBase(String),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} still failing after {attempts} attempts (last HTTP {status})")]
    Exhausted {
        url: String,
        attempts: u32,
        status: u16,
    },
    #[error("malformed JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected response shape from {url}: {detail}")]
    Shape { url: String, detail: String },
}

#[derive(Debug, Error)]
pub enum WrError {
    #[error("config invalid: {0}")]
    InvalidConfig(String),
    #[error("another wr-live run holds {0}")]
    LockHeld(String),
}
