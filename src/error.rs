use crate::types::JsValue;
use thiserror::Error;

/// An abrupt completion surfaced to the host.
#[derive(Debug, Clone, Error)]
pub enum JsError {
    #[error("TypeError: {0}")]
    Type(String),
    #[error("RangeError: {0}")]
    Range(String),
    #[error("SyntaxError: {0}")]
    Syntax(String),
    /// A value thrown by a native function (getter, `valueOf`, ...).
    #[error("Uncaught {0}")]
    Throw(JsValue),
}

impl JsError {
    pub fn type_error(msg: impl Into<String>) -> Self {
        JsError::Type(msg.into())
    }

    pub fn range_error(msg: impl Into<String>) -> Self {
        JsError::Range(msg.into())
    }

    pub fn is_type_error(&self) -> bool {
        matches!(self, JsError::Type(_))
    }

    pub fn is_range_error(&self) -> bool {
        matches!(self, JsError::Range(_))
    }
}

pub type JsResult<T> = Result<T, JsError>;
