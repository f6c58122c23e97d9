//! Byte transports for config documents and assets.
//!
//! Every transport distinguishes "not found" (the caller may try the next
//! layer) from any other failure.  Requests are synchronous with no timeout;
//! a hung request hangs the bootstrap.
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::FetchError;

/// Source of remote bytes addressed by location strings.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Fetch the bytes stored at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] when the resource does not exist and
    /// [`FetchError::Transport`] for every other failure.
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Pick a transport for `location` by its scheme.
///
/// `http://` and `https://` use [`HttpTransport`]; anything else
/// (`file://` URLs or plain paths) uses [`LocalTransport`].
#[must_use]
pub fn transport_for(location: &str) -> Box<dyn Transport> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpTransport::new())
    } else {
        Box::new(LocalTransport)
    }
}

/// Maximum accepted body size (packages can be large).
const MAX_BODY_SIZE: u64 = 1024 * 1024 * 1024;

/// HTTP(S) transport backed by a [`ureq::Agent`].
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("agent", &"<ureq::Agent>")
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport with default agent settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", concat!("kuzushi/", env!("CARGO_PKG_VERSION")))
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(404) => FetchError::NotFound {
                    url: url.to_string(),
                },
                ureq::Error::StatusCode(code) => FetchError::Transport {
                    url: url.to_string(),
                    message: format!("HTTP {code}"),
                },
                other => FetchError::Transport {
                    url: url.to_string(),
                    message: other.to_string(),
                },
            })?;

        response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: format!("reading response body: {e}"),
            })
    }
}

/// File read in place of a directory, the way a static web server serves
/// an index page.
pub const INDEX_FILE: &str = "index.json";

/// Transport reading from the local filesystem.
///
/// Accepts `file://` URLs and plain paths, so a config tree baked into an
/// image can be applied without a server.  A layer that also carries assets
/// is a directory; its document is then read from [`INDEX_FILE`] inside it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTransport;

impl LocalTransport {
    fn path_of(url: &str) -> PathBuf {
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        if path.is_dir() {
            path.join(INDEX_FILE)
        } else {
            path
        }
    }
}

impl Transport for LocalTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = Self::path_of(url);
        std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::NotADirectory => FetchError::NotFound {
                url: url.to_string(),
            },
            _ => FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            },
        })
    }
}

/// In-memory transport mapping exact URLs to bytes.
///
/// Useful for offline dry runs and tests; unknown URLs are not found and
/// URLs registered with [`fail`](Self::fail) produce transport errors.
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    entries: HashMap<String, Result<Vec<u8>, String>>,
}

impl MemoryTransport {
    /// Create an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`.
    #[must_use]
    pub fn with(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(url.into(), Ok(body.into()));
        self
    }

    /// Answer requests for `url` with a transport error carrying `message`.
    #[must_use]
    pub fn fail(mut self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.entries.insert(url.into(), Err(message.into()));
        self
    }
}

impl Transport for MemoryTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        match self.entries.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(FetchError::Transport {
                url: url.to_string(),
                message: message.clone(),
            }),
            None => Err(FetchError::NotFound {
                url: url.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn local_transport_reads_plain_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("base");
        std::fs::write(&file, "{}").unwrap();
        assert_eq!(
            LocalTransport.get(&file.to_string_lossy()).unwrap(),
            b"{}".to_vec()
        );
    }

    #[test]
    fn local_transport_reads_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("base");
        std::fs::write(&file, "abc").unwrap();
        let url = format!("file://{}", file.display());
        assert_eq!(LocalTransport.get(&url).unwrap(), b"abc".to_vec());
    }

    #[test]
    fn local_transport_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let url = dir.path().join("files/nope").to_string_lossy().to_string();
        assert!(LocalTransport.get(&url).unwrap_err().is_not_found());
    }

    #[test]
    fn local_transport_reads_index_of_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("web")).unwrap();
        std::fs::write(dir.path().join("web").join(INDEX_FILE), "{}").unwrap();
        let url = dir.path().join("web").to_string_lossy().to_string();
        assert_eq!(LocalTransport.get(&url).unwrap(), b"{}".to_vec());
    }

    #[test]
    fn local_transport_directory_without_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalTransport
            .get(&dir.path().to_string_lossy())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn local_transport_unreadable_file_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = dir.path().join("nul").to_string_lossy().to_string();
        std::fs::create_dir(dir.path().join("nul")).unwrap();
        std::fs::create_dir(dir.path().join("nul").join(INDEX_FILE)).unwrap();
        assert!(!LocalTransport.get(&url).unwrap_err().is_not_found());
    }

    #[test]
    fn memory_transport_serves_and_fails() {
        let t = MemoryTransport::new()
            .with("http://cfg/a", "x")
            .fail("http://cfg/b", "HTTP 500");
        assert_eq!(t.get("http://cfg/a").unwrap(), b"x".to_vec());
        assert!(!t.get("http://cfg/b").unwrap_err().is_not_found());
        assert!(t.get("http://cfg/c").unwrap_err().is_not_found());
    }

    #[test]
    fn transport_for_picks_by_scheme() {
        assert!(format!("{:?}", transport_for("https://cfg/base")).contains("HttpTransport"));
        assert!(format!("{:?}", transport_for("/srv/cfg/base")).contains("LocalTransport"));
    }
}
