/// Domain-specific error types for the chain scanner.
/// Failures are scoped by blast radius:
/// - per-contract (InvalidInput, Convergence): isolated inside enrichment, never fatal
/// - per-ticker (Network, Io, Parse, ProviderApi, Report): logged, other tickers continue
/// - Config: fatal at startup, before any scan runs
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("implied volatility did not converge: {0}")]
    Convergence(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("provider API error: {status} {body}")]
    ProviderApi { status: u16, body: String },

    #[error("report error: {0}")]
    Report(String),

    #[error("task error: {0}")]
    Task(String),
}

impl From<reqwest::Error> for ScanError {
    /// Request URLs carry the provider API key; never keep them.
    fn from(e: reqwest::Error) -> Self {
        ScanError::Network(e.without_url().to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(e: serde_json::Error) -> Self {
        ScanError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for ScanError {
    fn from(e: std::io::Error) -> Self {
        ScanError::Report(e.to_string())
    }
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(e: tokio::task::JoinError) -> Self {
        ScanError::Task(e.to_string())
    }
}

pub type ScanResult<T> = Result<T, ScanError>;

