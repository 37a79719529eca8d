use std::io;
use std::path::Path;

use drivemirror_core::DriveFile;
use reqwest::{Client, StatusCode, header};
use thiserror::Error;
use tokio_util::io::ReaderStream;
use url::Url;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("upload rejected with {status}: {body}")]
    Api { status: StatusCode, body: String },
}

/// Streams file content into a resumable upload session.
#[derive(Clone, Default)]
pub struct TransferClient {
    http: Client,
}

impl TransferClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    /// Sends `source` as the body of the session `PUT` and returns the
    /// created file's metadata from the final response. The body is
    /// streamed, so file size is bounded only by the remote service.
    pub async fn upload_from_path(
        &self,
        session_uri: &Url,
        source: &Path,
    ) -> Result<DriveFile, TransferError> {
        let file = tokio::fs::File::open(source).await?;
        let length = file.metadata().await?.len();
        let stream = ReaderStream::new(file);
        let body = reqwest::Body::wrap_stream(stream);

        let response = self
            .http
            .put(session_uri.clone())
            .header(header::CONTENT_LENGTH, length)
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransferError::Api { status, body });
        }
        Ok(response.json::<DriveFile>().await?)
    }
}
