use ulid::Ulid;

use crate::store::StoreError;

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    /// Series operations (expansion, cascade) require a head.
    NotASeriesHead(Ulid),
    /// Interval end is not after its start.
    InvalidInterval,
    StartInPast,
    LimitExceeded(&'static str),
    Store(StoreError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "meeting not found: {id}"),
            EngineError::NotASeriesHead(id) => write!(f, "not a series head: {id}"),
            EngineError::InvalidInterval => write!(f, "interval end must be after start"),
            EngineError::StartInPast => write!(f, "meeting start is in the past"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}
