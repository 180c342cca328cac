//! Best-effort download of filed bill texts.
//!
//! A download is a single attempt: any network error, non-success status, or
//! filesystem error is logged and reported as `false`. The scraper records
//! that outcome on the bill and moves on.

use std::path::PathBuf;
use std::time::Duration;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::errors::ScrapeError;

/// Bytes written (and synced) per write call.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Something that can fetch a linked file to local storage.
pub trait FileDownloader {
    /// Fetch `url`, returning `true` only if the whole body was stored.
    async fn download(&self, url: &str) -> bool;
}

/// Derive the local file name for `url`.
///
/// Uses the last path segment, percent-decoded, with spaces replaced by
/// underscores.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(file_name_from_url("https://x.org/a/HB 01.pdf")?, "HB_01.pdf");
/// ```
pub fn file_name_from_url(url: &str) -> Result<String, ScrapeError> {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => url.rsplit('/').next().unwrap_or_default().to_string(),
    };
    let decoded = urlencoding::decode(&segment)
        .map(|s| s.into_owned())
        .unwrap_or(segment);
    let name = decoded.trim().replace(' ', "_");

    if name.is_empty() || name == "." || name == ".." {
        return Err(ScrapeError::Download {
            url: url.to_string(),
            reason: "URL has no file name".to_string(),
        });
    }
    Ok(name)
}

/// Downloads files over HTTP into a fixed directory.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
    dest_dir: PathBuf,
}

impl HttpDownloader {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(client, dest_dir))
    }

    pub fn with_client(client: reqwest::Client, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dest_dir: dest_dir.into(),
        }
    }

    /// Stream `url` into the destination directory, returning the byte count.
    async fn fetch_to_file(&self, url: &str) -> Result<u64, ScrapeError> {
        fs::create_dir_all(&self.dest_dir).await?;
        let path = self.dest_dir.join(file_name_from_url(url)?);

        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = fs::File::create(&path).await?;
        let mut pending: Vec<u8> = Vec::with_capacity(CHUNK_SIZE);
        let mut written = 0u64;

        while let Some(bytes) = response.chunk().await? {
            pending.extend_from_slice(&bytes);
            while pending.len() >= CHUNK_SIZE {
                let rest = pending.split_off(CHUNK_SIZE);
                write_chunk(&mut file, &pending).await?;
                written += pending.len() as u64;
                pending = rest;
            }
        }
        if !pending.is_empty() {
            write_chunk(&mut file, &pending).await?;
            written += pending.len() as u64;
        }

        debug!(path = %path.display(), bytes = written, "Stored file");
        Ok(written)
    }
}

async fn write_chunk(file: &mut fs::File, chunk: &[u8]) -> std::io::Result<()> {
    file.write_all(chunk).await?;
    file.flush().await?;
    file.sync_data().await
}

impl FileDownloader for HttpDownloader {
    #[instrument(level = "info", skip(self))]
    async fn download(&self, url: &str) -> bool {
        match self.fetch_to_file(url).await {
            Ok(bytes) => {
                info!(bytes, "Downloaded bill text");
                true
            }
            Err(e) => {
                warn!(error = %e, "Download failed");
                false
            }
        }
    }
}
