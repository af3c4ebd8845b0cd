use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid group name: {0}")]
    InvalidGroup(String),
    #[error("storage i/o error: {0}")]
    Io(String),
    #[error("corrupt store data: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn invalid_group(name: &str) -> Self {
        Self::InvalidGroup(name.to_string())
    }
}
