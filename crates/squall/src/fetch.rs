use crate::metainfo::{self, MetainfoError, TorrentFile};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected http status {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Metainfo(#[from] MetainfoError),
}

impl FetchError {
    /// Transport failures may succeed on retry; decoding the same bytes
    /// again cannot.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::Io(_) => true,
            FetchError::Status(status) => status.is_server_error(),
            FetchError::Metainfo(_) => false,
        }
    }
}

/// Fetches a metainfo resource over HTTP and parses it.
pub async fn from_url(url: &str) -> Result<TorrentFile, FetchError> {
    let client = reqwest::Client::new();
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    let body = response.bytes().await?;
    debug!(url, len = body.len(), "fetched metainfo");
    Ok(metainfo::parse(&body)?)
}

/// Reads a metainfo file from disk and parses it.
pub fn from_file(path: impl AsRef<Path>) -> Result<TorrentFile, FetchError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    debug!(path = %path.display(), len = data.len(), "read metainfo file");
    Ok(metainfo::parse(&data)?)
}
