// HTTP Status Codes

/// The HTTP status codes Daybook responds with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok = 200,
    SeeOther = 303,
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    UnprocessableEntity = 422,
    InternalServerError = 500,
}

impl HttpStatus {
    /// Get the numeric status code
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Standard reason phrase, also used as the body of error pages.
    pub fn reason(&self) -> &'static str {
        match self {
            HttpStatus::Ok => "OK",
            HttpStatus::SeeOther => "See Other",
            HttpStatus::BadRequest => "Bad Request",
            HttpStatus::NotFound => "Not Found",
            HttpStatus::MethodNotAllowed => "Method Not Allowed",
            HttpStatus::UnprocessableEntity => "Unprocessable Entity",
            HttpStatus::InternalServerError => "Internal Server Error",
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.code())
    }

    pub fn is_server_error(&self) -> bool {
        self.code() >= 500
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            200 => Some(HttpStatus::Ok),
            303 => Some(HttpStatus::SeeOther),
            400 => Some(HttpStatus::BadRequest),
            404 => Some(HttpStatus::NotFound),
            405 => Some(HttpStatus::MethodNotAllowed),
            422 => Some(HttpStatus::UnprocessableEntity),
            500 => Some(HttpStatus::InternalServerError),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_codes() {
        for status in [
            HttpStatus::Ok,
            HttpStatus::SeeOther,
            HttpStatus::BadRequest,
            HttpStatus::NotFound,
            HttpStatus::UnprocessableEntity,
            HttpStatus::InternalServerError,
        ] {
            assert_eq!(HttpStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(HttpStatus::from_code(418), None);
    }

    #[test]
    fn test_classes() {
        assert!(HttpStatus::NotFound.is_client_error());
        assert!(!HttpStatus::NotFound.is_server_error());
        assert!(HttpStatus::InternalServerError.is_server_error());
        assert_eq!(HttpStatus::UnprocessableEntity.reason(), "Unprocessable Entity");
    }
}
