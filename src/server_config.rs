use crate::error::ServerError;
use std::path::PathBuf;
use std::time::Duration;

/// What to do when a request resolves to a directory instead of a file.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DirectoryPolicy {
    /// Respond with an HTML index of the directory's entries.
    Listing,
    /// Respond with 403 for any directory request.
    Forbidden,
}

pub struct ServerConfig {
    /// Directory whose contents are exposed. Never the process working
    /// directory; path resolution always happens against this value.
    pub root: PathBuf,
    pub host: String,
    pub port: u16,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub directory_policy: DirectoryPolicy,
    /// How long a connection may take to deliver a full request head
    /// before the server answers 408.
    pub read_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            root: PathBuf::from("web"),
            host: String::from("127.0.0.1"),
            port: 8443,
            cert_path: PathBuf::from("keys/server.crt"),
            key_path: PathBuf::from("keys/server.key"),
            directory_policy: DirectoryPolicy::Forbidden,
            read_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    pub(crate) fn validate(&self) -> Result<(), ServerError> {
        if !self.root.is_dir() {
            return Err(ServerError::Config(format!(
                "root directory {} does not exist or is not a directory",
                self.root.display()
            )));
        }

        Ok(())
    }

    pub(crate) fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub struct ServerConfigBuilder {
    server_config: ServerConfig,
}

#[allow(clippy::new_without_default)]
impl ServerConfigBuilder {
    pub fn new() -> Self {
        ServerConfigBuilder {
            server_config: ServerConfig::default(),
        }
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.server_config.root = root.into();

        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.server_config.host = host.to_string();

        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.server_config.port = port;

        self
    }

    pub fn cert_path(mut self, cert_path: impl Into<PathBuf>) -> Self {
        self.server_config.cert_path = cert_path.into();

        self
    }

    pub fn key_path(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.server_config.key_path = key_path.into();

        self
    }

    pub fn directory_policy(mut self, policy: DirectoryPolicy) -> Self {
        self.server_config.directory_policy = policy;

        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.server_config.read_timeout = timeout;

        self
    }

    pub fn get(self) -> ServerConfig {
        self.server_config
    }
}
