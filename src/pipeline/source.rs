//! Asset sources: the network seam of the fetcher.
//!
//! [`crate::pipeline::fetch::fetch`] only knows how to schedule downloads;
//! the actual transfer is delegated to an [`AssetSource`]. Production code
//! uses [`HttpAssetSource`] (reqwest); tests substitute an in-memory source
//! so the scheduling and ordering rules can be exercised without a server.

use crate::error::FetchError;
use crate::pipeline::request::AssetRequest;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Something that can copy one remote asset into a local file.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Download `request.location` into `dest`, returning the number of bytes
    /// written. `dest` must only exist afterwards if the call succeeded, and a
    /// file already at `dest` must be left as it was.
    async fn download(&self, request: &AssetRequest, dest: &Path) -> Result<u64, FetchError>;
}

/// HTTP(S) downloader backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpAssetSource {
    client: reqwest::Client,
}

impl HttpAssetSource {
    /// Build a client with a per-request timeout and user agent.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an already-configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn download(&self, request: &AssetRequest, dest: &Path) -> Result<u64, FetchError> {
        let index = request.index;
        let url = reqwest::Url::parse(&request.location)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| FetchError::InvalidLocation {
                index,
                location: request.location.clone(),
            })?;

        let transport_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    index,
                    url: request.location.clone(),
                }
            } else {
                FetchError::Network {
                    index,
                    url: request.location.clone(),
                    detail: e.to_string(),
                }
            }
        };

        let response = self.client.get(url).send().await.map_err(transport_err)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                index,
                url: request.location.clone(),
                status: response.status().as_u16(),
            });
        }

        let write_err = |e: std::io::Error| FetchError::WriteFailed {
            index,
            path: dest.to_path_buf(),
            detail: e.to_string(),
        };

        // create_new: a file already at `dest` belongs to the caller.
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .await
            .map_err(write_err)?;
        let mut body = response.bytes_stream();
        let mut written = 0u64;

        let copied: Result<(), FetchError> = async {
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(transport_err)?;
                file.write_all(&chunk).await.map_err(write_err)?;
                written += chunk.len() as u64;
            }
            file.flush().await.map_err(write_err)
        }
        .await;

        if let Err(e) = copied {
            drop(file);
            // Only a fully written file may remain in the destination.
            let _ = tokio::fs::remove_file(dest).await;
            return Err(e);
        }

        debug!("Asset {}: {} bytes → {}", index, written, dest.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serve `response` verbatim to one connection; returns an image URL on it.
    async fn serve_once(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(response).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/ch1/1.jpg")
    }

    fn local_source() -> HttpAssetSource {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpAssetSource::with_client(client)
    }

    #[tokio::test]
    async fn writes_body_to_dest() {
        let url = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\nPAGE").await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("001.jpg");

        let bytes = local_source()
            .download(&AssetRequest::new(0, url), &dest)
            .await
            .unwrap();

        assert_eq!(bytes, 4);
        assert_eq!(std::fs::read(&dest).unwrap(), b"PAGE");
    }

    #[tokio::test]
    async fn error_status_creates_no_file() {
        let url = serve_once(b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found").await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("002.jpg");

        let err = local_source()
            .download(&AssetRequest::new(1, url.clone()), &dest)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            FetchError::HttpStatus {
                index: 1,
                url,
                status: 404
            }
        );
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn truncated_body_removes_partial_file() {
        let url = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\nConnection: close\r\n\r\nonly ten b").await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("003.jpg");

        let err = local_source()
            .download(&AssetRequest::new(2, url), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Network { index: 2, .. }), "{err:?}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn existing_file_is_never_overwritten() {
        let url = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\nNEW").await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("001.jpg");
        std::fs::write(&dest, b"CALLER-OWNED").unwrap();

        let err = local_source()
            .download(&AssetRequest::new(0, url), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::WriteFailed { index: 0, .. }), "{err:?}");
        assert_eq!(std::fs::read(&dest).unwrap(), b"CALLER-OWNED");
    }

    #[tokio::test]
    async fn rejects_non_http_locations() {
        let source = HttpAssetSource::new(5, "test").expect("client");
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("001.jpg");

        for loc in ["not a url", "ftp://host/img.jpg", "/local/file.jpg"] {
            let err = source
                .download(&AssetRequest::new(0, loc), &dest)
                .await
                .unwrap_err();
            assert!(
                matches!(err, FetchError::InvalidLocation { index: 0, .. }),
                "{loc}: {err:?}"
            );
        }
        assert!(!dest.exists());
    }
}
