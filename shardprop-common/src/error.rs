use thiserror::Error;

pub type ShardPropResult<T> = Result<T, ShardPropError>;

#[derive(Debug, Error)]
pub enum ShardPropError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("precondition violated: {0}")]
    PreconditionViolated(String),

    #[error("graph source error: {0}")]
    GraphSource(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ShardPropError {
    pub fn is_precondition(&self) -> bool {
        matches!(self, ShardPropError::PreconditionViolated(_))
    }
}
