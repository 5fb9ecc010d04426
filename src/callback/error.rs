use thiserror::Error;

/// Failure returned by a hook. The variant decides the response class.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CallbackError {
    /// Caller is not allowed to perform the action (401).
    #[error("Access denied: {0}")]
    Denied(String),

    /// Request is invalid; the message is shown to the caller (400).
    #[error("{0}")]
    User(String),

    /// Hook could not do its job; the message is only logged (500).
    #[error("System error: {0}")]
    System(String),
}

impl CallbackError {
    pub fn denied(message: impl Into<String>) -> Self {
        CallbackError::Denied(message.into())
    }

    pub fn user(message: impl Into<String>) -> Self {
        CallbackError::User(message.into())
    }

    pub fn system(message: impl Into<String>) -> Self {
        CallbackError::System(message.into())
    }
}

impl From<crate::database::StoreError> for CallbackError {
    fn from(err: crate::database::StoreError) -> Self {
        CallbackError::System(err.to_string())
    }
}

impl From<crate::model::AccessError> for CallbackError {
    fn from(err: crate::model::AccessError) -> Self {
        CallbackError::System(err.to_string())
    }
}
