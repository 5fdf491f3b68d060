use std::fmt::{Display, Formatter};

/// Only the codes a static file responder emits.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ResponseStatusCode {
    Ok = 200,
    BadRequest = 400,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    RequestTimeout = 408,
    RequestHeaderFieldsTooLarge = 431,
    InternalServerError = 500,
    NotImplemented = 501,
    HttpVersionNotSupported = 505,
}

impl ResponseStatusCode {
    pub fn is_error(&self) -> bool {
        *self as u16 >= 400
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ResponseStatusCode::Ok => "OK",
            ResponseStatusCode::BadRequest => "Bad Request",
            ResponseStatusCode::Forbidden => "Forbidden",
            ResponseStatusCode::NotFound => "Not Found",
            ResponseStatusCode::MethodNotAllowed => "Method Not Allowed",
            ResponseStatusCode::RequestTimeout => "Request Timeout",
            ResponseStatusCode::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            ResponseStatusCode::InternalServerError => "Internal Server Error",
            ResponseStatusCode::NotImplemented => "Not Implemented",
            ResponseStatusCode::HttpVersionNotSupported => "HTTP Version Not Supported",
        }
    }
}

impl Display for ResponseStatusCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", *self as u16, self.reason())
    }
}
