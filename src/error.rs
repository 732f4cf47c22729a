//! Error types for the CSTI scanner

use thiserror::Error;

use crate::browser::BrowserError;

/// Main error type for scanner operations
#[derive(Debug, Error)]
pub enum CstiError {
    #[error("Browser error: {0}")]
    BrowserError(#[from] BrowserError),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown template engine '{0}'")]
    UnknownEngine(String),

    #[error("Engine catalog is inconsistent: {0}")]
    CatalogError(String),

    #[error("Target unreachable: {0}")]
    TargetUnreachable(String),
}

/// Result type alias for scanner operations
pub type Result<T> = std::result::Result<T, CstiError>;
