// Error types for the Daybook request pipeline

use crate::logging::error;
use crate::{HttpResponse, HttpStatus};
use daybook_session::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Submitted data could not be decoded into the expected shape.
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.http_status().code()
    }

    /// Get the HttpStatus enum for this error
    pub fn http_status(&self) -> HttpStatus {
        match self {
            Error::BadRequest(_) => HttpStatus::BadRequest,
            Error::NotFound(_) => HttpStatus::NotFound,
            Error::Serialization(_)
            | Error::Session(_)
            | Error::Io(_)
            | Error::Internal(_) => HttpStatus::InternalServerError,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }

    /// Turn the error into the page the client sees.
    ///
    /// Only the status reason phrase is sent. Server errors are logged with
    /// their full detail first.
    pub fn into_response(self) -> HttpResponse {
        let status = self.http_status();

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        HttpResponse::new(status.code()).with_text(status.reason())
    }
}
