pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Lifecycle misuse of a metrics aggregator (a caller bug, not a runtime condition).
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("`work_unit_size` must be a positive integer")]
    InvalidWorkUnitSize,

    #[error("`concurrency_limit` must be a positive integer")]
    InvalidConcurrency,

    #[error("scenario index {index} is out of range (0..{len})")]
    ScenarioIndex { index: usize, len: usize },

    #[error("invalid base url `{0}` (expected http:// or https://)")]
    InvalidBaseUrl(String),

    #[error("invalid api key header value")]
    InvalidApiKey,

    #[error("failed to initialize latency histogram: {0}")]
    Histogram(String),

    #[error("failed to open transport: {0}")]
    Transport(String),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
