use crate::response_status_code::ResponseStatusCode;
use std::fmt::Write as _;

#[derive(Debug)]
pub struct Response {
    status_code: ResponseStatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    pub fn status_code(&self) -> ResponseStatusCode {
        self.status_code
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header_name, _)| header_name.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Serializes the response. `include_body` is false for HEAD requests,
    /// which carry the headers of the corresponding GET without content.
    pub fn as_bytes(&self, include_body: bool) -> Vec<u8> {
        let mut head = String::new();

        // write! to a String cannot fail
        let _ = write!(head, "HTTP/1.1 {}\r\n", self.status_code);
        for (name, value) in &self.headers {
            let _ = write!(head, "{name}: {value}\r\n");
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        if include_body {
            bytes.extend_from_slice(&self.body);
        }

        bytes
    }

    /// Canned error response. Carries a small HTML body only when the
    /// client said it accepts one.
    pub fn error(status_code: ResponseStatusCode, accepts_html: bool) -> Response {
        let mut builder = Response::builder().status_code(status_code);

        if accepts_html {
            builder = builder
                .header("Content-Type", "text/html; charset=utf-8")
                .text_body(&format!(
                    "<html><body><h1 style='text-align: center'>{status_code}</h1></body></html>"
                ));
        }

        builder.get()
    }
}

#[derive(Debug)]
pub struct ResponseBuilder {
    response: Response,
}

#[allow(clippy::new_without_default)]
impl ResponseBuilder {
    pub fn new() -> Self {
        ResponseBuilder {
            response: Response {
                status_code: ResponseStatusCode::Ok,
                headers: vec![],
                body: vec![],
            },
        }
    }

    pub fn status_code(mut self, status_code: ResponseStatusCode) -> Self {
        self.response.status_code = status_code;

        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.response
            .headers
            .push((name.to_string(), value.to_string()));

        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.response.body = body;

        self
    }

    pub fn text_body(mut self, body: &str) -> Self {
        self.response.body = body.as_bytes().to_vec();

        self
    }

    pub fn get(self) -> Response {
        if self.response.header("Content-Length").is_none() {
            let len = self.response.body.len();
            return self.header("Content-Length", &len.to_string()).response;
        }

        self.response
    }
}
