use crate::connection::{Connection, HeadOutcome};
use crate::content::ContentRoot;
use crate::error::ServerError;
use crate::request::{parse_request, ParseError, Request};
use crate::request_method::{RequestMethod, SERVABLE_METHODS};
use crate::response::Response;
use crate::response_status_code::ResponseStatusCode;
use crate::server_config::ServerConfig;
use crate::tls;
use log::{debug, error, info, warn};
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// How often the accept loop rechecks the shutdown flag when idle.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct Server {
    config: ServerConfig,
    tls_config: Arc<rustls::ServerConfig>,
    content: Arc<ContentRoot>,
}

impl Server {
    /// Validates the configuration and loads the TLS context. Performs no
    /// socket operations; a server that cannot be constructed never binds.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let tls_config = tls::build_tls_config(&config.cert_path, &config.key_path)?;
        let content = Arc::new(ContentRoot::new(
            config.root.clone(),
            config.directory_policy,
        ));

        Ok(Server {
            config,
            tls_config,
            content,
        })
    }

    /// Binds the listen socket and serves until `shutdown` is set. Each
    /// accepted connection runs on its own worker thread; on shutdown the
    /// listener is dropped and in-flight workers are drained.
    pub fn run(&self, shutdown: Arc<AtomicBool>) -> Result<(), ServerError> {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr).map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| ServerError::Bind { addr, source })?;

        info!(
            "serving {} on https://{}",
            self.config.root.display(),
            self.config.listen_addr()
        );

        let mut workers: Vec<JoinHandle<()>> = vec![];

        while !shutdown.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    workers.push(self.spawn_worker(stream, peer));
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(err) => {
                    error!("accept failed: {err}");
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }

            workers.retain(|worker| !worker.is_finished());
        }

        drop(listener);

        // Drain policy: let in-flight requests finish. Each worker is
        // bounded by the configured read/write timeouts.
        info!("shutting down, draining {} active connection(s)", workers.len());
        for worker in workers {
            let _ = worker.join();
        }

        Ok(())
    }

    fn spawn_worker(&self, stream: TcpStream, peer: SocketAddr) -> JoinHandle<()> {
        let tls_config = self.tls_config.clone();
        let content = self.content.clone();
        let timeout = self.config.read_timeout;

        std::thread::spawn(move || {
            // Accepted sockets inherit non-blocking mode on some platforms.
            if let Err(err) = stream.set_nonblocking(false) {
                warn!("could not configure socket for {peer}: {err}");
                return;
            }

            let connection = match Connection::establish(stream, tls_config, timeout) {
                Ok(connection) => connection,
                Err(err) => {
                    // Handshake failures only fail this connection.
                    warn!("TLS handshake with {peer} failed: {err}");
                    return;
                }
            };

            if let Err(err) = handle_connection(connection, &content) {
                debug!("connection with {peer} ended with error: {err}");
            }
        })
    }
}

fn handle_connection(mut connection: Connection, content: &ContentRoot) -> std::io::Result<()> {
    let head = match connection.read_request_head()? {
        HeadOutcome::Head(head) => head,
        HeadOutcome::Closed => {
            connection.close();
            return Ok(());
        }
        HeadOutcome::TimedOut => {
            let response = Response::error(ResponseStatusCode::RequestTimeout, false);
            connection.write_response(&response, true)?;
            connection.close();
            return Ok(());
        }
        HeadOutcome::TooLarge => {
            let response = Response::error(ResponseStatusCode::RequestHeaderFieldsTooLarge, false);
            connection.write_response(&response, true)?;
            connection.close();
            return Ok(());
        }
    };

    let (mut response, include_body) = match parse_request(&head) {
        Ok(request) => {
            let include_body = request.method != RequestMethod::Head;
            (respond(&request, content), include_body)
        }
        Err(err) => (Response::error(parse_error_status(&err), false), true),
    };

    // One request per connection.
    response.set_header("Connection", "close");

    connection.write_response(&response, include_body)?;
    connection.close();

    Ok(())
}

fn parse_error_status(error: &ParseError) -> ResponseStatusCode {
    match error {
        ParseError::Malformed => ResponseStatusCode::BadRequest,
        ParseError::UnknownMethod => ResponseStatusCode::NotImplemented,
        ParseError::UnsupportedVersion => ResponseStatusCode::HttpVersionNotSupported,
    }
}

fn allow_header_value() -> String {
    SERVABLE_METHODS
        .iter()
        .map(|method| method.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn respond(request: &Request, content: &ContentRoot) -> Response {
    if !request.method.is_servable() {
        return Response::builder()
            .status_code(ResponseStatusCode::MethodNotAllowed)
            .header("Allow", &allow_header_value())
            .get();
    }

    match content.serve(request) {
        Ok(response) => response,
        Err(err) => {
            debug!("{} {}: {:?}", request.method, request.target, err);
            Response::error(err.status_code(), request.accepts_html())
        }
    }
}
