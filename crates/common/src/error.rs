//! Common error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("settings store error: {0}")]
    Store(String),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
