use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No documents available. Please upload documents first.")]
    NoDocuments,

    #[error("top_k must be a positive integer")]
    InvalidTopK,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
