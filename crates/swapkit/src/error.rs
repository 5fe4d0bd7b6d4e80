use thiserror::Error;

/// Unified error type for the swapkit library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("contract read error: {0}")]
    Read(#[from] ReadError),

    #[error("quote error: {0}")]
    Quote(#[from] QuoteError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from the token/chain registry refresh path.
///
/// `Clone` so that callers joining an in-flight refresh all receive the
/// same outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("sdk-info fetch failed: {0}")]
    Fetch(String),

    #[error("sdk-info returned status {status}")]
    Status { status: u16 },

    #[error("invalid sdk-info payload: {0}")]
    Parse(String),
}

/// Errors from on-chain reads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadError {
    #[error("rpc transport error: {0}")]
    Transport(String),

    #[error("call reverted: {0}")]
    Reverted(String),

    #[error("invalid return data: {0}")]
    InvalidReturnData(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors surfaced by the swap quote engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QuoteError {
    /// Network or HTTP failure. Retried with backoff.
    #[error("route fetch failed: {0}")]
    Fetch(String),

    /// The request shape was rejected. Never retried.
    #[error("invalid route request: {0}")]
    Validation(String),

    /// The aggregator answered but found no viable route. Never retried.
    #[error("no available route")]
    NoRoute,
}

impl QuoteError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, QuoteError::Fetch(_))
    }

    /// Classify an aggregator failure from its HTTP status and message.
    pub fn classify(status: Option<u16>, message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("no route") || lower.contains("route not found") {
            return QuoteError::NoRoute;
        }
        if matches!(status, Some(400) | Some(422))
            || lower.contains("validation")
            || lower.contains("invalid")
        {
            return QuoteError::Validation(message.to_string());
        }
        QuoteError::Fetch(message.to_string())
    }
}

/// Durable storage failures. Logged and treated as a cache miss.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot build http client: {0}")]
    Client(String),
}
