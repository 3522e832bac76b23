use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentCacheError>;

#[derive(Error, Debug)]
pub enum AgentCacheError {
    #[error("remote cache unreachable: {0}")]
    Unreachable(String),

    #[error("remote cache returned an unexpected status: {0}")]
    UnexpectedStatus(u16),
}
