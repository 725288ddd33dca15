use academy_config::{MULTIPART_DATA_FIELD, MULTIPART_FILE_FIELD};
use academy_core::content::{classify_attachment, mime_for};
use academy_core::{extract_str, Attachment};
use camino::Utf8PathBuf;
use futures::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use super::{ApiClient, ApiError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Caller-chosen key, echoed back in the result.
    pub key: String,
    pub path: Utf8PathBuf,
    pub file_name: String,
    pub mime: String,
    pub folder: String,
}

impl UploadRequest {
    /// Classify the attachment and pick the folder it belongs in.
    pub fn for_attachment(attachment: &Attachment) -> Self {
        Self {
            key: attachment.key(),
            path: attachment.path.clone(),
            file_name: attachment.file_name().to_string(),
            mime: mime_for(attachment),
            folder: classify_attachment(attachment).folder().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub key: String,
    pub url: String,
    pub folder: String,
    pub bytes: u64,
}

pub struct Uploader {
    api: ApiClient,
    concurrency: usize,
}

impl Uploader {
    pub fn new(api: ApiClient, concurrency: usize) -> Self {
        Self {
            api,
            concurrency: academy_config::clamp_upload_concurrency(concurrency),
        }
    }

    /// Upload independent files concurrently. Results come back in request
    /// order; one failure does not cancel the others.
    pub async fn upload_batch(
        &self,
        items: Vec<UploadRequest>,
    ) -> Vec<Result<UploadedFile, ApiError>> {
        let mut indexed: Vec<(usize, Result<UploadedFile, ApiError>)> = stream::iter(
            items.into_iter().enumerate(),
        )
        .map(|(ix, item)| async move { (ix, self.upload_one(item).await) })
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        indexed.sort_by_key(|(ix, _)| *ix);
        indexed.into_iter().map(|(_, res)| res).collect()
    }

    pub async fn upload_one(&self, req: UploadRequest) -> Result<UploadedFile, ApiError> {
        let bytes = tokio::fs::read(req.path.as_std_path()).await?;
        let len = bytes.len() as u64;
        debug!(path = %req.path, folder = %req.folder, bytes = len, "uploading file");

        let meta = serde_json::json!({
            "folder": req.folder,
            "fileName": req.file_name,
            "mimeType": req.mime,
        });
        let data = Part::text(meta.to_string())
            .mime_str("application/json")
            .map_err(|e| ApiError::Decode(format!("bad metadata part: {e}")))?;
        let file = Part::bytes(bytes)
            .file_name(req.file_name.clone())
            .mime_str(&req.mime)
            .map_err(|e| ApiError::Decode(format!("bad mime type {}: {e}", req.mime)))?;
        let form = Form::new()
            .part(MULTIPART_DATA_FIELD, data)
            .part(MULTIPART_FILE_FIELD, file);

        let payload = self
            .api
            .send_multipart(&["uploads"], form)
            .await?
            .ok_or_else(|| ApiError::MissingField("url".into()))?;

        let url = extract_str(&payload, "url").ok_or_else(|| {
            warn!(path = %req.path, "upload answer carried no url");
            ApiError::MissingField("url".into())
        })?;

        Ok(UploadedFile {
            key: req.key,
            url,
            folder: req.folder,
            bytes: len,
        })
    }
}
