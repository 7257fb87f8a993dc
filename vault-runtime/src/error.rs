use thiserror::Error;

/// Structural violations found while decoding or validating a strategy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Strategy must be a JSON object")]
    NotAnObject,

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid risk level '{0}': expected conservative, moderate or aggressive")]
    InvalidRiskLevel(String),

    #[error("Allocation '{field}' must be a finite number between 0 and 100, got {value}")]
    InvalidAllocation { field: &'static str, value: String },

    #[error("Allocations must sum to 100 (±0.01): lending {lending} + liquidity {liquidity} = {total}")]
    AllocationSum {
        lending: f64,
        liquidity: f64,
        total: f64,
    },

    #[error("preferences.stablecoinsOnly must be a boolean")]
    StablecoinsOnlyNotBoolean,

    #[error("preferences.preferredAssets must be a list of strings")]
    PreferredAssetsNotList,

    #[error("preferences.minimumAPY must be a non-negative number, got {0}")]
    InvalidMinimumApy(String),

    #[error("Missing request field: {0}")]
    MissingRequestField(&'static str),
}

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("Failed to fetch {what}: {message}")]
    UpstreamRead { what: String, message: String },

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Could not parse LLM response: {0}")]
    LlmParse(String),

    #[error("No vault found for owner {0}")]
    VaultNotFound(String),

    #[error("No strategy attached for owner {0}")]
    StrategyMissing(String),

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl PortfolioError {
    pub fn upstream(what: impl Into<String>, message: impl std::fmt::Display) -> Self {
        PortfolioError::UpstreamRead {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// True for errors caused by the caller's input (mapped to 4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PortfolioError::ValidationFailed(_)
                | PortfolioError::VaultNotFound(_)
                | PortfolioError::StrategyMissing(_)
                | PortfolioError::UnknownAsset(_)
                | PortfolioError::EncodingError(_)
        )
    }
}

impl From<reqwest::Error> for PortfolioError {
    fn from(e: reqwest::Error) -> Self {
        PortfolioError::HttpError(e.to_string())
    }
}

impl From<serde_json::Error> for PortfolioError {
    fn from(e: serde_json::Error) -> Self {
        PortfolioError::SerializationError(e.to_string())
    }
}
