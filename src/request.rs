use crate::request_method::RequestMethod;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("malformed request head")]
    Malformed,
    #[error("unknown request method")]
    UnknownMethod,
    #[error("unsupported protocol version")]
    UnsupportedVersion,
}

pub struct Request {
    pub method: RequestMethod,
    /// Request target as sent by the client, query string included.
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Case-insensitive header lookup; returns the first occurrence.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header_name, _)| header_name.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn accepts_html(&self) -> bool {
        self.header("Accept")
            .is_some_and(|accept| accept.contains("text/html") || accept.contains("*/*"))
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("target", &self.target)
            .field("headers", &self.headers.len())
            .finish()
    }
}

fn parse_request_line(line: &str) -> Result<(RequestMethod, String), ParseError> {
    let mut parts = line.split(' ').filter(|part| !part.is_empty());

    let method_token = parts.next().ok_or(ParseError::Malformed)?;
    let target = parts.next().ok_or(ParseError::Malformed)?;
    let version = parts.next().ok_or(ParseError::Malformed)?;

    if parts.next().is_some() {
        return Err(ParseError::Malformed);
    }

    match version {
        "HTTP/1.0" | "HTTP/1.1" => {}
        _ => return Err(ParseError::UnsupportedVersion),
    }

    let method = RequestMethod::from_str(method_token).map_err(|_| ParseError::UnknownMethod)?;

    Ok((method, target.to_string()))
}

fn parse_header_line(line: &str) -> Result<(String, String), ParseError> {
    let (name, value) = line.split_once(':').ok_or(ParseError::Malformed)?;

    if name.is_empty() || name.contains(' ') {
        return Err(ParseError::Malformed);
    }

    Ok((name.to_string(), value.trim().to_string()))
}

/// Parses a request head: everything up to, but not including, the blank
/// line that separates headers from the body. The body itself is never
/// read; a static server has no use for one.
pub fn parse_request(head: &[u8]) -> Result<Request, ParseError> {
    let head = std::str::from_utf8(head).map_err(|_| ParseError::Malformed)?;

    let mut lines = head.split("\r\n");
    let request_line = lines.next().ok_or(ParseError::Malformed)?;
    let (method, target) = parse_request_line(request_line)?;

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        headers.push(parse_header_line(line)?);
    }

    Ok(Request {
        method,
        target,
        headers,
    })
}
