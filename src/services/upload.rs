// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage for uploaded images and documents.
//!
//! The file type is taken from the content's magic bytes, never from the
//! client-supplied name. Files are written as `<uuid>.<ext>` so stored names
//! are unguessable and cannot escape the upload directory.

use crate::error::AppError;
use crate::services::sanitize;
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Public URL prefix under which uploads are served.
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

const MAX_CONCURRENT_FILE_OPS: usize = 8;
const MAX_ORIGINAL_NAME_LEN: usize = 255;

/// A supported file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileKind {
    pub mime_type: &'static str,
    pub extension: &'static str,
}

const JPEG: FileKind = FileKind {
    mime_type: "image/jpeg",
    extension: "jpg",
};
const PNG: FileKind = FileKind {
    mime_type: "image/png",
    extension: "png",
};
const GIF: FileKind = FileKind {
    mime_type: "image/gif",
    extension: "gif",
};
const WEBP: FileKind = FileKind {
    mime_type: "image/webp",
    extension: "webp",
};
const PDF: FileKind = FileKind {
    mime_type: "application/pdf",
    extension: "pdf",
};

/// Identify a supported file type from its leading bytes.
pub fn detect_kind(bytes: &[u8]) -> Option<FileKind> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(JPEG)
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(PNG)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(GIF)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(WEBP)
    } else if bytes.starts_with(b"%PDF-") {
        Some(PDF)
    } else {
        None
    }
}

/// Whether a client-declared content type is consistent with the detected kind.
fn declared_type_matches(declared: &str, kind: FileKind) -> bool {
    let declared = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    declared.is_empty()
        || declared == "application/octet-stream"
        || declared == kind.mime_type
        || (kind == JPEG && (declared == "image/jpg" || declared == "image/pjpeg"))
}

/// Errors from upload handling.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("File exceeds the {max_bytes} byte limit")]
    TooLarge { max_bytes: usize },

    #[error("Unsupported file type (allowed: JPEG, PNG, GIF, WebP, PDF)")]
    Unsupported,

    #[error("Declared content type '{declared}' does not match file contents ({detected})")]
    Mismatch {
        declared: String,
        detected: &'static str,
    },

    #[error("Failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            UploadError::Io(e) => AppError::Internal(anyhow::Error::new(e)),
            UploadError::Empty | UploadError::Unsupported | UploadError::Mismatch { .. } => {
                AppError::BadRequest(err.to_string())
            }
        }
    }
}

/// Metadata of a stored upload, as returned to the dashboard.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StoredFile {
    pub url: String,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub size: u64,
}

/// Upload directory plus size policy.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate and write one file.
    pub async fn store(
        &self,
        original_name: Option<&str>,
        declared_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredFile, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                max_bytes: self.max_bytes,
            });
        }

        let kind = detect_kind(bytes).ok_or(UploadError::Unsupported)?;
        if let Some(declared) = declared_type {
            if !declared_type_matches(declared, kind) {
                return Err(UploadError::Mismatch {
                    declared: declared.to_string(),
                    detected: kind.mime_type,
                });
            }
        }

        let filename = format!("{}.{}", uuid::Uuid::new_v4().simple(), kind.extension);
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&filename), bytes).await?;

        let original_name = display_name(original_name, &filename);
        tracing::info!(
            filename = %filename,
            original_name = %original_name,
            mime_type = kind.mime_type,
            size = bytes.len(),
            "Stored upload"
        );

        Ok(StoredFile {
            url: format!("{}/{}", UPLOAD_URL_PREFIX, filename),
            filename,
            original_name,
            mime_type: kind.mime_type.to_string(),
            size: bytes.len() as u64,
        })
    }

    /// Local path for a `/uploads/<name>` URL, if it names a file in this store.
    fn local_path(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(UPLOAD_URL_PREFIX)?.strip_prefix('/')?;
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.')
            && !name.starts_with('.');
        valid.then(|| self.dir.join(name))
    }

    /// Remove stored files referenced by `urls`. External URLs are ignored and
    /// failures are logged, never returned. Returns how many files were removed.
    pub async fn remove_all(&self, urls: Vec<String>) -> usize {
        let paths: Vec<PathBuf> = urls.iter().filter_map(|u| self.local_path(u)).collect();

        stream::iter(paths)
            .map(|path| async move {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => true,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to remove upload");
                        false
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_FILE_OPS)
            .filter(|removed| std::future::ready(*removed))
            .count()
            .await
    }
}

/// Client-facing name: last path component, sanitized, bounded.
fn display_name(original: Option<&str>, fallback: &str) -> String {
    let base = original
        .map(|n| n.rsplit(['/', '\\']).next().unwrap_or(n))
        .map(sanitize::clean_line)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback.to_string());
    base.chars().take(MAX_ORIGINAL_NAME_LEN).collect()
}
