// Error types for authentication

use daybook_core::Error as CoreError;
use daybook_session::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown email and wrong password are deliberately the same error.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password hashing error: {0}")]
    PasswordHashError(String),

    #[error("Password verification error: {0}")]
    PasswordVerifyError(String),

    /// The identity store could not answer.
    #[error("Identity store error: {0}")]
    Store(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Session(err) => CoreError::Session(err),
            other => CoreError::Internal(other.to_string()),
        }
    }
}
