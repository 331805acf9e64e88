//! File receiver: validates uploaded résumés and writes them to the upload directory.

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const ALLOWED_EXTENSION: &str = "pdf";
pub const ALLOWED_MIME: &str = "application/pdf";

/// A résumé written to durable storage.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub stored_filename: String,
    pub original_filename: String,
    pub path: PathBuf,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct FileReceiver {
    upload_dir: PathBuf,
    max_bytes: usize,
}

impl FileReceiver {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Creates the upload directory and pins it to an absolute path, since
    /// stored paths are handed to the analysis engine.
    pub async fn ensure_dir(&mut self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Cannot create upload directory {}: {e}",
                    self.upload_dir.display()
                ))
            })?;
        self.upload_dir = tokio::fs::canonicalize(&self.upload_dir)
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Cannot resolve upload directory {}: {e}",
                    self.upload_dir.display()
                ))
            })?;
        Ok(())
    }

    /// Reads the field chunk by chunk, bailing out as soon as the ceiling is
    /// crossed. Nothing touches the disk until the whole body is accepted.
    pub async fn read_limited(&self, field: &mut Field<'_>) -> Result<Bytes, AppError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = field.chunk().await? {
            if buf.len() + chunk.len() > self.max_bytes {
                return Err(too_large(self.max_bytes));
            }
            buf.extend_from_slice(&chunk);
        }
        if buf.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty.".to_string()));
        }
        Ok(buf.freeze())
    }

    pub async fn persist(
        &self,
        original_filename: &str,
        content: &[u8],
    ) -> Result<StoredUpload, AppError> {
        if content.len() > self.max_bytes {
            return Err(too_large(self.max_bytes));
        }

        let stored_filename = format!("{}.{ALLOWED_EXTENSION}", Uuid::new_v4());
        let path = self.upload_dir.join(&stored_filename);

        tokio::fs::write(&path, content).await.map_err(|e| {
            AppError::Storage(format!("Failed to write {}: {e}", path.display()))
        })?;

        debug!("Stored {} bytes at {}", content.len(), path.display());
        Ok(StoredUpload {
            stored_filename,
            original_filename: original_filename.to_string(),
            path,
            size: content.len(),
        })
    }

    /// Best-effort removal of a file whose record could not be created.
    pub async fn discard(&self, upload: &StoredUpload) {
        if let Err(e) = tokio::fs::remove_file(&upload.path).await {
            warn!("Could not remove orphaned upload {}: {e}", upload.path.display());
        }
    }
}

/// Rejects anything that is not declared as a PDF, by extension and, when the
/// client sent one, by MIME type.
pub fn validate_declared(
    filename: Option<&str>,
    content_type: Option<&str>,
) -> Result<String, AppError> {
    let filename = filename
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::Validation("Uploaded file has no filename.".to_string()))?;

    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if extension.as_deref() != Some(ALLOWED_EXTENSION) {
        return Err(AppError::Validation(format!(
            "File type not allowed. Only .{ALLOWED_EXTENSION} files are supported."
        )));
    }

    if let Some(mime) = content_type {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        if !essence.eq_ignore_ascii_case(ALLOWED_MIME) {
            return Err(AppError::Validation(
                "Invalid file type. Only PDF files are allowed.".to_string(),
            ));
        }
    }

    Ok(filename.to_string())
}

fn too_large(max_bytes: usize) -> AppError {
    AppError::Validation(format!(
        "File too large. Maximum size is {}MB.",
        max_bytes / (1024 * 1024)
    ))
}
