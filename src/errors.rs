/// Domain-specific error types for the EV engine.
/// Unpriced legs and malformed odds are NOT errors: they degrade to sentinels
/// inside the engine. Only failures that would make a whole run silently
/// incomplete end up here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("database error: {0}")]
    Database(String),

    #[error("ledger unavailable: {0}")]
    Ledger(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Database(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
