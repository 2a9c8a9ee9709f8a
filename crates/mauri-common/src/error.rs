use thiserror::Error;

#[derive(Debug, Error)]
pub enum MauriError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Unknown {kind} value: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MauriError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        MauriError::Validation { field, reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, MauriError>;
