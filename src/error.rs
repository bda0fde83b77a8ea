use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request")]
    InvalidRequest,

    #[error("Invalid markup: {0}")]
    Codec(String),

    #[error("[crowdin-sync/backend] {label}: {message}")]
    Vendor { label: String, message: String },

    #[error("Content store error: {0}")]
    Store(String),

    #[error("Transaction rejected: {0}")]
    TransactionConflict(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("[crowdin-sync/adapter] {label}: {message}")]
    Adapter { label: String, message: String },
}

impl SyncError {
    pub fn vendor(label: impl Into<String>, message: impl ToString) -> Self {
        Self::Vendor {
            label: label.into(),
            message: message.to_string(),
        }
    }

    pub fn adapter(label: impl Into<String>, message: impl ToString) -> Self {
        Self::Adapter {
            label: label.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
