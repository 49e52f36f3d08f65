use std::fmt;

use garden_core::EngineError;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Config(String),
    InvalidData(String),
    NotFound(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::Config(msg) => write!(f, "config error: {msg}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            StoreError::NotFound(id) => write!(f, "contact not found: {id}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(e: toml::de::Error) -> Self {
        StoreError::Config(e.to_string())
    }
}

impl From<EngineError> for StoreError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::InvalidConfig(msg) => StoreError::Config(msg),
            other => StoreError::InvalidData(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
