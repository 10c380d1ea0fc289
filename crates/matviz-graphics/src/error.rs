use thiserror::Error;

/// Errors raised by the handle-graphics engine.
///
/// Validation errors are raised at the point of detection and never
/// leave a property or object partially mutated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphicsError {
    #[error("invalid graphics handle (= {0})")]
    InvalidHandle(f64),

    #[error("can't delete root object")]
    DeleteRoot,

    #[error("object (= {0}) is being deleted")]
    BeingDeleted(f64),

    #[error("unknown property \"{0}\"")]
    UnknownProperty(String),

    #[error("ambiguous property name \"{name}\"; candidates are {}", candidates.join(", "))]
    AmbiguousProperty {
        name: String,
        candidates: Vec<String>,
    },

    #[error("invalid value for property \"{name}\": {reason}")]
    InvalidPropertyValue { name: String, reason: String },

    #[error("invalid constructor arguments: {0}")]
    InvalidConstructorArgs(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("callback error: {0}")]
    Callback(String),
}

impl GraphicsError {
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        GraphicsError::InvalidPropertyValue {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
