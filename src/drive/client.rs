use crate::config::UploaderConfig;
use crate::drive::types::{DriveFile, FileMetadata, Permission};
use crate::error::{NotFoundError, PermissionError, TransportError};
use crate::upload::{CancelToken, ObjectStore, SessionHandle, UploadTransport, UploadedObject};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::{CONTENT_RANGE, LOCATION, RANGE};
use reqwest::Response;
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

const FILE_FIELDS: &str = "id,webViewLink";

/// Google Drive v3 over REST: resumable uploads, read-back and sharing.
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    api_base: String,
    upload_base: String,
    chunk_size: usize,
}

impl DriveClient {
    pub fn new(config: &UploaderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
            chunk_size: config.aligned_chunk_size(),
        }
    }

    async fn start_session(
        &self,
        session: &SessionHandle,
        remote_name: &str,
        total: u64,
    ) -> Result<String, TransportError> {
        let url = format!("{}/files", self.upload_base);
        let response = self
            .http
            .post(&url)
            .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
            .bearer_auth(session.access_token())
            .header("X-Upload-Content-Length", total)
            .json(&FileMetadata { name: remote_name })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(TransportError::MissingSessionUri)
    }

    async fn get_file(&self, session: &SessionHandle, id: &str) -> Result<DriveFile, String> {
        let url = format!("{}/files/{}", self.api_base, id);
        let response = self
            .http
            .get(&url)
            .query(&[("fields", FILE_FIELDS)])
            .bearer_auth(session.access_token())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        match response.status().as_u16() {
            200 => response.json::<DriveFile>().await.map_err(|e| e.to_string()),
            404 => Err("the file does not exist".to_string()),
            status => Err(format!("status {}", status)),
        }
    }
}

#[async_trait]
impl UploadTransport for DriveClient {
    async fn send(
        &self,
        session: &SessionHandle,
        local_path: &Path,
        remote_name: &str,
        cancel: &CancelToken,
        on_progress: &mut (dyn FnMut(f64) + Send),
    ) -> Result<UploadedObject, TransportError> {
        if !local_path.is_file() {
            return Err(TransportError::FileNotFound(local_path.to_path_buf()));
        }

        let mut file = File::open(local_path).await?;
        let total = file.metadata().await?.len();
        let session_uri = self.start_session(session, remote_name, total).await?;
        debug!("Resumable session opened for '{}' ({} bytes)", remote_name, total);

        let mut buffer = vec![0u8; self.chunk_size];
        let mut offset: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                info!("Upload of '{}' cancelled at byte {}", remote_name, offset);
                return Err(TransportError::Cancelled);
            }

            let len = read_chunk(&mut file, &mut buffer).await?;
            let end = offset + len as u64;
            let range = if len == 0 {
                format!("bytes */{}", total)
            } else {
                format!("bytes {}-{}/{}", offset, end - 1, total)
            };

            let response = self
                .http
                .put(&session_uri)
                .bearer_auth(session.access_token())
                .header(CONTENT_RANGE, range)
                .body(buffer[..len].to_vec())
                .send()
                .await?;

            match response.status().as_u16() {
                200 | 201 => {
                    let uploaded: DriveFile = response.json().await?;
                    info!("Uploaded '{}' as {}", remote_name, uploaded.id);
                    return Ok(UploadedObject {
                        view_link: uploaded.web_view_link,
                        id: uploaded.id,
                    });
                }
                308 => {
                    let acknowledged = response
                        .headers()
                        .get(RANGE)
                        .and_then(|value| value.to_str().ok())
                        .and_then(acknowledged_bytes)
                        .unwrap_or(0);

                    if len == 0 || acknowledged <= offset {
                        return Err(TransportError::Stalled { offset });
                    }
                    if acknowledged != end {
                        file.seek(SeekFrom::Start(acknowledged)).await?;
                    }
                    offset = acknowledged;
                    on_progress(offset as f64 / total as f64);
                }
                _ => return Err(status_error(response).await),
            }
        }
    }
}

#[async_trait]
impl ObjectStore for DriveClient {
    async fn verify(&self, session: &SessionHandle, id: &str) -> Result<String, NotFoundError> {
        let file = self
            .get_file(session, id)
            .await
            .map_err(|reason| NotFoundError::new(id, reason))?;
        Ok(file.link())
    }

    async fn make_public(
        &self,
        session: &SessionHandle,
        id: &str,
    ) -> Result<String, PermissionError> {
        let url = format!("{}/files/{}/permissions", self.api_base, id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(session.access_token())
            .json(&Permission::anyone_reader())
            .send()
            .await
            .map_err(|e| PermissionError::new(id, e.to_string()))?;

        if !response.status().is_success() {
            return Err(PermissionError::new(
                id,
                format!("status {}", response.status().as_u16()),
            ));
        }

        let file = self
            .get_file(session, id)
            .await
            .map_err(|reason| PermissionError::new(id, reason))?;
        Ok(file.link())
    }
}

/// Fills `buffer` as far as the file allows and returns the byte count.
async fn read_chunk(file: &mut File, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let read = file.read(&mut buffer[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

/// Parses a `Range: bytes=0-N` header into the number of bytes stored.
fn acknowledged_bytes(header: &str) -> Option<u64> {
    let last = header.trim().strip_prefix("bytes=")?.split('-').nth(1)?;
    last.trim().parse::<u64>().ok().map(|last| last + 1)
}

async fn status_error(response: Response) -> TransportError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    TransportError::Status { status, body }
}
