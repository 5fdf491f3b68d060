use crate::request::Request;
use crate::response::Response;
use crate::response_status_code::ResponseStatusCode;
use crate::server_config::DirectoryPolicy;
use log::debug;
use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, PartialEq)]
pub enum ContentError {
    NotFound,
    Forbidden,
}

impl ContentError {
    pub fn status_code(&self) -> ResponseStatusCode {
        match self {
            ContentError::NotFound => ResponseStatusCode::NotFound,
            ContentError::Forbidden => ResponseStatusCode::Forbidden,
        }
    }
}

/// Resolves request targets against the serving root and produces file
/// responses. Shared read-only between connection workers.
pub struct ContentRoot {
    root: PathBuf,
    policy: DirectoryPolicy,
}

impl ContentRoot {
    pub fn new(root: impl Into<PathBuf>, policy: DirectoryPolicy) -> Self {
        ContentRoot {
            root: root.into(),
            policy,
        }
    }

    /// Maps a request target to a path under the root. Purely lexical:
    /// `.` and empty segments are dropped, `..` is refused outright
    /// instead of being resolved, so the result can never leave the root.
    pub fn resolve(&self, target: &str) -> Result<PathBuf, ContentError> {
        let path = target
            .split_once(['?', '#'])
            .map_or(target, |(path, _)| path);

        // Origin-form targets only; an absolute URL or authority form
        // would bypass the join below.
        if !path.starts_with('/') {
            return Err(ContentError::Forbidden);
        }

        let mut resolved = self.root.clone();
        for segment in path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(ContentError::Forbidden),
                _ => {}
            }
            if segment.contains(['\\', '\0']) {
                return Err(ContentError::Forbidden);
            }
            resolved.push(segment);
        }

        Ok(resolved)
    }

    fn file_response(&self, path: &Path) -> Result<Response, ContentError> {
        let content = fs::read(path).map_err(|err| content_error_for_read(&err))?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        Ok(Response::builder()
            .status_code(ResponseStatusCode::Ok)
            .header("Content-Type", mime.essence_str())
            .body(content)
            .get())
    }

    fn listing_response(&self, path: &Path, target: &str) -> Result<Response, ContentError> {
        let entries = fs::read_dir(path).map_err(|err| content_error_for_read(&err))?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| {
                let mut name = entry.file_name().to_string_lossy().into_owned();
                if entry.path().is_dir() {
                    name.push('/');
                }
                name
            })
            .collect();
        names.sort();

        // Entry names and the request-derived base are untrusted text.
        let base = escape_html(target.trim_end_matches('/'));
        let mut html = format!("<html><body><h1>Index of {base}/</h1><ul>");
        for name in names {
            let name = escape_html(&name);
            let _ = write!(html, "<li><a href=\"{base}/{name}\">{name}</a></li>");
        }
        html.push_str("</ul></body></html>");

        Ok(Response::builder()
            .status_code(ResponseStatusCode::Ok)
            .header("Content-Type", "text/html; charset=utf-8")
            .text_body(&html)
            .get())
    }

    pub fn serve(&self, request: &Request) -> Result<Response, ContentError> {
        let path = self.resolve(&request.target)?;

        debug!("{} {} -> {}", request.method, request.target, path.display());

        if path.is_dir() {
            return match self.policy {
                DirectoryPolicy::Listing => self.listing_response(&path, &request.target),
                DirectoryPolicy::Forbidden => Err(ContentError::Forbidden),
            };
        }

        self.file_response(&path)
    }
}

fn content_error_for_read(err: &std::io::Error) -> ContentError {
    match err.kind() {
        ErrorKind::PermissionDenied => ContentError::Forbidden,
        _ => ContentError::NotFound,
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }

    escaped
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::parse_request;

    fn content_root(policy: DirectoryPolicy) -> ContentRoot {
        ContentRoot::new("test_files/root", policy)
    }

    fn get(target: &str) -> Request {
        let head = format!("GET {target} HTTP/1.1\r\n\r\n");
        parse_request(head.as_bytes()).unwrap()
    }

    mod resolve {
        use super::*;

        #[test]
        fn joins_under_root() {
            let root = content_root(DirectoryPolicy::Forbidden);

            assert_eq!(
                root.resolve("/assets/style.css").unwrap(),
                PathBuf::from("test_files/root/assets/style.css")
            );
        }

        #[test]
        fn drops_dot_and_empty_segments() {
            let root = content_root(DirectoryPolicy::Forbidden);

            assert_eq!(
                root.resolve("/./assets//style.css").unwrap(),
                PathBuf::from("test_files/root/assets/style.css")
            );
        }

        #[test]
        fn strips_query_and_fragment() {
            let root = content_root(DirectoryPolicy::Forbidden);

            assert_eq!(
                root.resolve("/index.html?v=2#top").unwrap(),
                PathBuf::from("test_files/root/index.html")
            );
        }

        #[test]
        fn rejects_parent_traversal() {
            let root = content_root(DirectoryPolicy::Forbidden);

            assert_eq!(
                root.resolve("/../secret.txt").unwrap_err(),
                ContentError::Forbidden
            );
            assert_eq!(
                root.resolve("/assets/../../secret.txt").unwrap_err(),
                ContentError::Forbidden
            );
        }

        #[test]
        fn rejects_non_origin_form_targets() {
            let root = content_root(DirectoryPolicy::Forbidden);

            assert_eq!(
                root.resolve("secret.txt").unwrap_err(),
                ContentError::Forbidden
            );
            assert_eq!(
                root.resolve("http://example.com/x").unwrap_err(),
                ContentError::Forbidden
            );
        }

        #[test]
        fn rejects_backslash_segments() {
            let root = content_root(DirectoryPolicy::Forbidden);

            assert_eq!(
                root.resolve("/..\\secret.txt").unwrap_err(),
                ContentError::Forbidden
            );
        }
    }

    #[test]
    fn escapes_html_metacharacters() {
        assert_eq!(
            escape_html("a & \"b\" <c>"),
            "a &amp; &quot;b&quot; &lt;c&gt;"
        );
        assert_eq!(escape_html("plain.txt"), "plain.txt");
    }

    #[test]
    fn permission_denied_read_maps_to_forbidden() {
        let denied = std::io::Error::from(ErrorKind::PermissionDenied);
        assert_eq!(content_error_for_read(&denied), ContentError::Forbidden);

        let missing = std::io::Error::from(ErrorKind::NotFound);
        assert_eq!(content_error_for_read(&missing), ContentError::NotFound);
    }

    mod serve {
        use super::*;

        #[test]
        fn existing_file_with_inferred_content_type() {
            let root = content_root(DirectoryPolicy::Forbidden);

            let response = root.serve(&get("/index.html")).unwrap();

            assert_eq!(response.status_code(), ResponseStatusCode::Ok);
            assert_eq!(response.header("Content-Type"), Some("text/html"));
            assert_eq!(response.body(), fs::read("test_files/root/index.html").unwrap());
        }

        #[test]
        fn css_gets_css_content_type() {
            let root = content_root(DirectoryPolicy::Forbidden);

            let response = root.serve(&get("/assets/style.css")).unwrap();

            assert_eq!(response.header("Content-Type"), Some("text/css"));
        }

        #[test]
        fn missing_file_is_not_found() {
            let root = content_root(DirectoryPolicy::Forbidden);

            assert_eq!(
                root.serve(&get("/missing.html")).unwrap_err(),
                ContentError::NotFound
            );
        }

        #[test]
        fn directory_forbidden_under_default_policy() {
            let root = content_root(DirectoryPolicy::Forbidden);

            assert_eq!(
                root.serve(&get("/assets")).unwrap_err(),
                ContentError::Forbidden
            );
        }

        #[test]
        fn directory_listing_when_enabled() {
            let root = content_root(DirectoryPolicy::Listing);

            let response = root.serve(&get("/assets/")).unwrap();

            let body = std::str::from_utf8(response.body()).unwrap();
            assert_eq!(response.status_code(), ResponseStatusCode::Ok);
            assert!(body.contains("style.css"));
            assert!(body.contains("href=\"/assets/style.css\""));
        }

        #[test]
        fn listing_escapes_markup_in_entry_names() {
            let dir = std::env::temp_dir().join(format!("listing_escape_{}", std::process::id()));
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("<img src=x onerror=alert(1)>.txt"), b"x").unwrap();

            let root = ContentRoot::new(&dir, DirectoryPolicy::Listing);
            let response = root.serve(&get("/")).unwrap();

            let body = std::str::from_utf8(response.body()).unwrap();
            assert!(body.contains("&lt;img src=x onerror=alert(1)&gt;.txt"));
            assert!(!body.contains("<img src=x"));

            fs::remove_dir_all(&dir).unwrap();
        }

        #[test]
        fn traversal_never_reaches_outside_content() {
            let root = content_root(DirectoryPolicy::Listing);

            let result = root.serve(&get("/../secret.txt"));

            assert_eq!(result.unwrap_err(), ContentError::Forbidden);
        }
    }
}
