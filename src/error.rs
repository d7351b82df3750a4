use thiserror::Error;

#[derive(Debug, Error)]
pub enum MtagPrepError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("empty file: {0}")]
    EmptyFile(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MtagPrepError>;
