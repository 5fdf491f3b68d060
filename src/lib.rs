mod connection;
mod tls;

pub mod content;
pub mod error;
pub mod request;
pub mod request_method;
pub mod response;
pub mod response_status_code;
pub mod server;
pub mod server_config;
