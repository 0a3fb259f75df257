//! Error types for fidelity validation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("At least one of static or behavioral results is required")]
    MissingComponents,

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Session already open: {0}")]
    SessionAlreadyOpen(String),

    #[error("No open session")]
    NoSession,

    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Browser bridge closed")]
    BridgeClosed,

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Capture parse error: {0}")]
    CaptureParse(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type ValidatorResult<T> = Result<T, ValidatorError>;
