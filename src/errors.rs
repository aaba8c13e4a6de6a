use thiserror::Error;

/// Error type shared by the stores, the full-text engine and the procedures.
#[derive(Debug, Error)]
pub enum ProcError {
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("schema error: {0}")]
    SchemaError(String),
    #[error("query error: {0}")]
    QueryError(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid full-text query: {0}")]
    InvalidQuery(String),
    #[error("access mode violation: {0}")]
    AccessMode(String),
}

impl ProcError {
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        ProcError::ConnectionError(msg.into())
    }

    pub fn schema<T: Into<String>>(msg: T) -> Self {
        ProcError::SchemaError(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        ProcError::QueryError(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ProcError::NotFound(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        ProcError::InvalidInput(msg.into())
    }

    pub fn invalid_query<T: Into<String>>(msg: T) -> Self {
        ProcError::InvalidQuery(msg.into())
    }

    pub fn access_mode<T: Into<String>>(msg: T) -> Self {
        ProcError::AccessMode(msg.into())
    }
}
