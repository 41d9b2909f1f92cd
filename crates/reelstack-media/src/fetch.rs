//! Remote asset staging.
//!
//! Assets are streamed straight to their workspace path; nothing is buffered
//! in memory beyond a single response chunk. `file://` URLs are copied, which
//! keeps local runs and tests off the network.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use reelstack_models::{AssetRole, StagedAsset};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{ensure_non_empty_file, remove_if_exists};

/// Retrieves a remote asset to a local path.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Download `url` to `destination`, returning the written path.
    async fn fetch(&self, url: &str, destination: &Path) -> MediaResult<PathBuf>;
}

/// HTTP(S) and `file://` fetcher backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(connect_timeout: Duration) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("reelstack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MediaError::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn copy_local(&self, url: &str, source: &Path, destination: &Path) -> MediaResult<()> {
        match fs::copy(source, destination).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MediaError::transport(url, "local file does not exist"))
            }
            Err(e) => Err(MediaError::transport(url, e.to_string())),
        }
    }

    async fn download(&self, url: &str, destination: &Path) -> MediaResult<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::transport(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let data = chunk.map_err(|e| MediaError::transport(url, e.to_string()))?;
            file.write_all(&data).await?;
        }
        file.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> MediaResult<PathBuf> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        let parsed =
            Url::parse(url).map_err(|e| MediaError::transport(url, format!("invalid URL: {}", e)))?;

        let result = if parsed.scheme() == "file" {
            let source = parsed
                .to_file_path()
                .map_err(|_| MediaError::transport(url, "invalid file URL"))?;
            self.copy_local(url, &source, destination).await
        } else {
            self.download(url, destination).await
        };

        if let Err(e) = result {
            remove_if_exists(destination).await;
            return Err(e);
        }

        Ok(destination.to_path_buf())
    }
}

/// Fetch one asset into the workspace and check it is usable.
///
/// A zero-byte download is treated as a failed fetch.
pub async fn stage_asset(
    fetcher: &dyn AssetFetcher,
    url: &str,
    destination: &Path,
    role: AssetRole,
) -> MediaResult<StagedAsset> {
    let start = Instant::now();
    debug!(role = %role, url = %url, "Fetching asset");

    let local_path = fetcher.fetch(url, destination).await?;
    let size_bytes = ensure_non_empty_file(&local_path).await?;

    info!(
        role = %role,
        size_bytes,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Staged asset"
    );

    Ok(StagedAsset {
        source_url: url.to_string(),
        local_path,
        role,
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_streams_body_to_destination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clips/primary.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("job").join("primary.mp4");
        let url = format!("{}/clips/primary.mp4", server.uri());

        let staged = stage_asset(&fetcher(), &url, &dest, AssetRole::Primary)
            .await
            .unwrap();

        assert_eq!(staged.local_path, dest);
        assert_eq!(staged.size_bytes, 4096);
        assert!(staged.is_primary());
        assert_eq!(fs::read(&dest).await.unwrap(), vec![7u8; 4096]);
    }

    #[tokio::test]
    async fn test_http_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("bottom_0.mp4");
        let url = format!("{}/missing.mp4", server.uri());

        let err = fetcher().fetch(&url, &dest).await.unwrap_err();
        assert!(matches!(err, MediaError::HttpStatus { status: 404, .. }));
        assert!(err.is_fetch_error());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_empty_body_rejected_when_staging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("bottom_0.mp4");
        let url = format!("{}/empty.mp4", server.uri());

        let err = stage_asset(&fetcher(), &url, &dest, AssetRole::BottomClip(0))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::EmptyAsset(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("primary.mp4");

        // Port 9 (discard) on loopback refuses connections
        let err = fetcher()
            .fetch("http://127.0.0.1:9/video.mp4", &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_file_url_is_copied() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.mp4");
        fs::write(&source, b"local clip").await.unwrap();
        let url = Url::from_file_path(&source).unwrap().to_string();
        let dest = dir.path().join("ws").join("bottom_2.mp4");

        let staged = stage_asset(&fetcher(), &url, &dest, AssetRole::BottomClip(2))
            .await
            .unwrap();
        assert_eq!(staged.size_bytes, 10);
        assert_eq!(staged.role, AssetRole::BottomClip(2));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_transport_error() {
        let dir = TempDir::new().unwrap();
        let url = Url::from_file_path(dir.path().join("nope.mp4"))
            .unwrap()
            .to_string();

        let err = fetcher()
            .fetch(&url, &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(err.is_fetch_error());
    }
}
