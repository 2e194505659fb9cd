// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, instrument, warn};
use url::Url;

/// A path or URL naming one CSV file, e.g. `code/results.csv`.
/// Relative references resolve against the loader's base URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRef(String);

impl ResourceRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Why a resource could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailure {
    #[error("{resource}: GET {url} returned HTTP {status}")]
    Status {
        resource: String,
        url: String,
        status: u16,
    },

    #[error("{resource}: reading {url} failed: {message}")]
    Transport {
        resource: String,
        url: String,
        message: String,
    },

    #[error("{resource}: unsupported scheme {scheme:?}")]
    Unsupported { resource: String, scheme: String },

    #[error("invalid resource reference {resource:?}: {message}")]
    InvalidReference { resource: String, message: String },
}

impl LoadFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            LoadFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Fetches CSV text over HTTP(S), or from disk for `file://` references.
/// One attempt per call; retrying is up to the caller.
#[derive(Debug, Clone)]
pub struct Loader {
    client: Client,
    base: Url,
}

impl Loader {
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    /// Resolve `resource` against the base URL. Absolute URLs pass through.
    pub fn resolve(&self, resource: &ResourceRef) -> Result<Url, LoadFailure> {
        self.base
            .join(resource.as_str())
            .map_err(|e| LoadFailure::InvalidReference {
                resource: resource.to_string(),
                message: e.to_string(),
            })
    }

    /// Load the raw text of one resource. Bytes that are not valid UTF-8
    /// become U+FFFD, whatever the scheme.
    #[instrument(level = "debug", skip(self, resource), fields(resource = %resource))]
    pub async fn load(&self, resource: &ResourceRef) -> Result<String, LoadFailure> {
        let url = self.resolve(resource)?;
        debug!(%url, "loading");

        let result = match url.scheme() {
            "http" | "https" => self.get_text(resource, &url).await,
            "file" => read_file(resource, &url).await,
            other => Err(LoadFailure::Unsupported {
                resource: resource.to_string(),
                scheme: other.to_string(),
            }),
        };

        match &result {
            Ok(text) => debug!(%url, bytes = text.len(), "loaded"),
            Err(e) => warn!(%url, error = %e, "load failed"),
        }
        result
    }

    async fn get_text(&self, resource: &ResourceRef, url: &Url) -> Result<String, LoadFailure> {
        let transport = |e: reqwest::Error| LoadFailure::Transport {
            resource: resource.to_string(),
            url: url.to_string(),
            message: e.to_string(),
        };

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LoadFailure::Status {
                resource: resource.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(transport)
    }
}

async fn read_file(resource: &ResourceRef, url: &Url) -> Result<String, LoadFailure> {
    let path = url
        .to_file_path()
        .map_err(|_| LoadFailure::InvalidReference {
            resource: resource.to_string(),
            message: format!("{url} is not a local file path"),
        })?;
    let bytes = fs::read(&path).await.map_err(|e| LoadFailure::Transport {
        resource: resource.to_string(),
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Turn a configured base (`https://host/site/` or a local directory) into
/// a directory URL that relative references can be joined onto.
pub fn parse_base(base: &str) -> Result<Url> {
    if let Ok(mut url) = Url::parse(base) {
        if url.scheme().len() > 1 {
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            return Ok(url);
        }
    }

    // single-letter "schemes" are drive letters; fall through to a path
    let path = Path::new(base);
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("reading current directory")?
            .join(path)
    };
    Url::from_directory_path(&abs)
        .map_err(|_| anyhow::anyhow!("cannot use {:?} as a base directory", abs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Serve exactly one canned HTTP response, return the base URL.
    async fn serve_once(response: &'static str) -> Result<Url> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = sock.read(&mut buf).await;
                let _ = sock.write_all(response.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        Ok(Url::parse(&format!("http://{}/site/", addr))?)
    }

    #[tokio::test]
    async fn test_load_ok() -> Result<()> {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: 8\r\nConnection: close\r\n\r\na,b\n1,2\n",
        )
        .await?;
        let loader = Loader::new(Client::new(), base);
        let text = loader.load(&"code/results.csv".into()).await?;
        assert_eq!(text, "a,b\n1,2\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_load_404_is_status_failure() -> Result<()> {
        let base = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await?;
        let loader = Loader::new(Client::new(), base);
        let err = loader.load(&"missing.csv".into()).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        match &err {
            LoadFailure::Status { resource, url, .. } => {
                assert_eq!(resource, "missing.csv");
                assert!(url.ends_with("/site/missing.csv"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().starts_with("missing.csv: GET "));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_connection_refused_is_transport_failure() -> Result<()> {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await?;
            listener.local_addr()?
        };
        let base = Url::parse(&format!("http://{}/", addr))?;
        let loader = Loader::new(Client::new(), base);
        let err = loader.load(&"theta.csv".into()).await.unwrap_err();
        assert!(matches!(err, LoadFailure::Transport { .. }), "{err:?}");
        assert_eq!(err.status(), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_local_file() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("theta.csv"), "Hour,T1\n1,0.5\n")?;
        let loader = Loader::new(Client::new(), parse_base(&dir.path().to_string_lossy())?);
        let text = loader.load(&"theta.csv".into()).await?;
        assert_eq!(text, "Hour,T1\n1,0.5\n");

        let err = loader.load(&"nope.csv".into()).await.unwrap_err();
        match err {
            LoadFailure::Transport { resource, url, .. } => {
                assert_eq!(resource, "nope.csv");
                assert!(url.starts_with("file://") && url.ends_with("/nope.csv"));
            }
            other => panic!("unexpected {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_utf8_decodes_lossily() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("latin1.csv"), b"name\ncaf\xe9\n")?;
        let loader = Loader::new(Client::new(), parse_base(&dir.path().to_string_lossy())?);
        let text = loader.load(&"latin1.csv".into()).await?;
        assert_eq!(text, "name\ncaf\u{FFFD}\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_absolute_reference_ignores_base() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        write!(tmp, "x\n1\n")?;
        let abs = Url::from_file_path(tmp.path()).map_err(|_| anyhow::anyhow!("bad path"))?;

        let loader = Loader::new(Client::new(), Url::parse("https://example.invalid/site/")?);
        let text = loader.load(&ResourceRef::new(abs.as_str())).await?;
        assert_eq!(text, "x\n1\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_unsupported_scheme() -> Result<()> {
        let loader = Loader::new(Client::new(), Url::parse("https://example.invalid/")?);
        let err = loader
            .load(&"ftp://example.invalid/a.csv".into())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadFailure::Unsupported { .. }));
        Ok(())
    }

    #[test]
    fn test_parse_base_adds_trailing_slash() -> Result<()> {
        let url = parse_base("https://example.com/dash")?;
        assert_eq!(url.as_str(), "https://example.com/dash/");
        let loader = Loader::new(Client::new(), url);
        let joined = loader.resolve(&"code/results.csv".into())?;
        assert_eq!(joined.as_str(), "https://example.com/dash/code/results.csv");
        Ok(())
    }

    #[test]
    fn test_parse_base_relative_dir() -> Result<()> {
        let url = parse_base("data")?;
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/data/"));
        Ok(())
    }
}
