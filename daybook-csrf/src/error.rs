use daybook_core::Error as CoreError;
use daybook_session::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("Invalid CSRF token")]
    InvalidToken,

    #[error("Missing CSRF token")]
    MissingToken,

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

pub type Result<T> = std::result::Result<T, CsrfError>;

impl From<CsrfError> for CoreError {
    fn from(err: CsrfError) -> Self {
        match err {
            CsrfError::InvalidToken | CsrfError::MissingToken | CsrfError::Base64Error(_) => {
                CoreError::BadRequest(err.to_string())
            }
            CsrfError::Session(err) => CoreError::Session(err),
        }
    }
}
