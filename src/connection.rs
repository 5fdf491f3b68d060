use crate::response::Response;
use rustls::{ServerConnection, StreamOwned};
use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound on a request head; anything larger gets 431.
const MAX_HEAD_BYTES: usize = 16 * 1024;

const READ_CHUNK: usize = 1024;

pub(crate) enum HeadOutcome {
    /// Bytes up to and including the blank line ending the head.
    Head(Vec<u8>),
    /// Peer closed before sending a complete head.
    Closed,
    /// Read timeout elapsed before the head was complete.
    TimedOut,
    TooLarge,
}

/// A single accepted connection after a completed TLS handshake.
pub(crate) struct Connection {
    stream: StreamOwned<ServerConnection, TcpStream>,
    timeout: Duration,
}

impl Connection {
    /// Performs the server-side handshake. Errors here fail only this
    /// connection; the caller logs and moves on.
    pub(crate) fn establish(
        stream: TcpStream,
        tls_config: Arc<rustls::ServerConfig>,
        timeout: Duration,
    ) -> std::io::Result<Self> {
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let mut stream = stream;
        let mut tls_connection = ServerConnection::new(tls_config)
            .map_err(|err| std::io::Error::new(ErrorKind::InvalidData, err))?;

        while tls_connection.is_handshaking() {
            tls_connection.complete_io(&mut stream)?;
        }

        Ok(Connection {
            stream: StreamOwned::new(tls_connection, stream),
            timeout,
        })
    }

    /// Reads until the CRLFCRLF that terminates a request head. Any body
    /// bytes after it are left unread; the connection closes after one
    /// response, so they are never consumed.
    ///
    /// The timeout is an overall deadline for the whole head, not just a
    /// cap on individual reads; a client dripping one byte per interval
    /// cannot hold the worker past it.
    pub(crate) fn read_request_head(&mut self) -> std::io::Result<HeadOutcome> {
        let deadline = Instant::now() + self.timeout;
        let mut head: Vec<u8> = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if Instant::now() >= deadline {
                return Ok(HeadOutcome::TimedOut);
            }

            let read = match self.stream.read(&mut chunk) {
                Ok(0) => return Ok(HeadOutcome::Closed),
                Ok(read) => read,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(HeadOutcome::TimedOut);
                }
                Err(err) => return Err(err),
            };

            head.extend_from_slice(&chunk[..read]);

            if let Some(end) = find_head_end(&head) {
                head.truncate(end);
                return Ok(HeadOutcome::Head(head));
            }

            if head.len() > MAX_HEAD_BYTES {
                return Ok(HeadOutcome::TooLarge);
            }
        }
    }

    pub(crate) fn write_response(
        &mut self,
        response: &Response,
        include_body: bool,
    ) -> std::io::Result<()> {
        self.stream.write_all(&response.as_bytes(include_body))?;
        self.stream.flush()
    }

    pub(crate) fn close(mut self) {
        self.stream.conn.send_close_notify();
        let _ = self.stream.flush();
        let _ = self.stream.sock.shutdown(std::net::Shutdown::Both);
    }
}

fn find_head_end(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|position| position + 4)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tls::build_tls_config;
    use rustls::pki_types::ServerName;
    use rustls::{ClientConnection, RootCertStore};
    use std::fs::File;
    use std::io::BufReader;
    use std::net::TcpListener;
    use std::path::Path;

    fn drip_client(port: u16, interval: Duration, bytes: usize) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || {
            let mut roots = RootCertStore::empty();
            let ca_file = File::open("tests/certs/ca.crt").unwrap();
            for cert in rustls_pemfile::certs(&mut BufReader::new(ca_file)) {
                roots.add(cert.unwrap()).unwrap();
            }

            let client_config = rustls::ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();
            let connection = ClientConnection::new(
                Arc::new(client_config),
                ServerName::try_from("localhost").unwrap(),
            )
            .unwrap();
            let tcp = TcpStream::connect(("127.0.0.1", port)).unwrap();
            let mut stream = StreamOwned::new(connection, tcp);

            // Keep the bytes flowing so no single read ever times out.
            for _ in 0..bytes {
                if stream.write_all(b"G").is_err() {
                    break;
                }
                let _ = stream.flush();
                std::thread::sleep(interval);
            }
        })
    }

    #[test]
    fn dripped_head_hits_overall_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = drip_client(port, Duration::from_millis(200), 12);

        let (socket, _) = listener.accept().unwrap();
        let tls_config = build_tls_config(
            Path::new("tests/certs/server.crt"),
            Path::new("tests/certs/server.key"),
        )
        .unwrap();
        let mut connection =
            Connection::establish(socket, tls_config, Duration::from_millis(600)).unwrap();

        let started = Instant::now();
        let outcome = connection.read_request_head().unwrap();

        assert!(matches!(outcome, HeadOutcome::TimedOut));
        // Well before the ~2.4s the client keeps dripping for.
        assert!(started.elapsed() < Duration::from_secs(2));

        connection.close();
        client.join().unwrap();
    }

    #[test]
    fn head_end_found_after_blank_line() {
        let bytes = b"GET / HTTP/1.1\r\nHost: x\r\n\r\nbody";

        assert_eq!(find_head_end(bytes), Some(27));
    }

    #[test]
    fn no_head_end_in_partial_request() {
        assert_eq!(find_head_end(b"GET / HTTP/1.1\r\nHost: x\r\n"), None);
    }

    #[test]
    fn head_end_split_across_reads_is_still_found() {
        let mut bytes = b"GET / HTTP/1.1\r\n\r".to_vec();
        assert_eq!(find_head_end(&bytes), None);

        bytes.push(b'\n');
        assert_eq!(find_head_end(&bytes), Some(bytes.len()));
    }
}
