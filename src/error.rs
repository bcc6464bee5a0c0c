use std::string::FromUtf8Error;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Index header holds values outside of their domain
    #[error("malformed index")]
    MalformedIndex,
    /// Requested line or slice bound outside of `[0, len]`
    #[error("index {index} out of bounds for {len} lines")]
    OutOfBounds { index: isize, len: usize },
    #[error("slice step must be positive, got {0}")]
    InvalidStep(isize),
    /// Selector is neither an integer nor a `start:stop:step` triple
    #[error("invalid selector: {0:?}")]
    InvalidSelector(String),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("line is not valid utf-8: {0}")]
    Utf8(#[from] FromUtf8Error),
    #[error("not found")]
    NotFound,
}
