use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorError>;

#[derive(Error, Debug)]
pub enum VectorError {
    #[error("SQL error: {0}")]
    Sql(String),

    #[error("vector store error: {0}")]
    VectorStore(String),

    #[error("embedding provider error: {0}")]
    Embedding(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
