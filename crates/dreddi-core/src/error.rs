use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unsupported {field} '{value}'")]
    Unsupported { field: &'static str, value: String },
}

/// Rejections raised by promise lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromiseError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
}

impl From<ParseError> for PromiseError {
    fn from(err: ParseError) -> Self {
        PromiseError::Validation(err.to_string())
    }
}
