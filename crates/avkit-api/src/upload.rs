//! Admission of multipart uploads.
//!
//! Every file part is checked against the extension allow-list before a
//! single byte is written, then streamed to the upload directory chunk by
//! chunk while the per-file and per-request ceilings are enforced. Files
//! written for a request that is rejected later are removed when their
//! handles drop.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use avkit_models::{format_bytes, unique_upload_name, OperationKind, ParamError};
use avkit_worker::MediaFileHandle;

/// Why an upload was refused.
#[derive(Debug, Error)]
pub enum UploadRejection {
    #[error("{0}")]
    NoFilesUploaded(&'static str),

    #[error("{0}")]
    NoFileSelected(&'static str),

    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("File {name} is too large. Maximum size is {}", size(.limit))]
    FileTooLarge { name: String, limit: u64 },

    #[error("Total file size ({}) exceeds limit ({})", size(.total), size(.limit))]
    TotalTooLarge { total: u64, limit: u64 },

    #[error("{message}")]
    TooFewFiles { message: String },

    #[error("Only {allowed} file(s) may be uploaded, got more")]
    TooManyFiles { allowed: usize },

    #[error("Malformed upload: {0}")]
    Malformed(String),

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

fn size(bytes: &u64) -> String {
    format_bytes(*bytes)
}

impl From<MultipartError> for UploadRejection {
    fn from(e: MultipartError) -> Self {
        UploadRejection::Malformed(e.body_text())
    }
}

/// Size ceilings for one request.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_file_size: u64,
    pub max_total_size: u64,
}

/// What one operation expects from a multipart form.
#[derive(Debug, Clone, Copy)]
struct FormShape {
    kind: OperationKind,
    file_field: &'static str,
    none_uploaded: &'static str,
    none_selected: &'static str,
}

impl FormShape {
    fn for_kind(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Merge => Self {
                kind,
                file_field: "files",
                none_uploaded: "No files uploaded",
                none_selected: "No files selected",
            },
            OperationKind::AudioToVideo => Self {
                kind,
                file_field: "file",
                none_uploaded: "No file uploaded",
                none_selected: "No file selected",
            },
        }
    }

    fn too_few_message(&self) -> String {
        match self.kind {
            OperationKind::Merge => format!(
                "At least {} {} files are required",
                self.kind.min_inputs(),
                self.kind.input_kind()
            ),
            OperationKind::AudioToVideo => self.none_uploaded.to_string(),
        }
    }
}

/// A request that passed every upload check.
#[derive(Debug)]
pub struct AdmittedUpload {
    /// Stored files, in the order they were sent
    pub files: Vec<MediaFileHandle>,
    fields: HashMap<String, String>,
    /// Sum of the stored file sizes
    pub total_bytes: u64,
}

impl AdmittedUpload {
    /// A non-file form field, trimmed. Blank values count as missing.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Parse a form field, falling back to `default` when it is missing.
    pub fn parse_field<T: FromStr>(&self, name: &str, default: T) -> Result<T, ParamError> {
        match self.field(name) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| ParamError::InvalidField {
                field: name.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Validates and stores multipart uploads.
#[derive(Debug, Clone)]
pub struct UploadGate {
    upload_dir: PathBuf,
    limits: UploadLimits,
}

impl UploadGate {
    pub fn new(upload_dir: impl Into<PathBuf>, limits: UploadLimits) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            limits,
        }
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    /// Read the whole form for `kind`, storing its files.
    pub async fn admit(
        &self,
        mut multipart: Multipart,
        kind: OperationKind,
    ) -> Result<AdmittedUpload, UploadRejection> {
        let shape = FormShape::for_kind(kind);
        let media_kind = kind.input_kind();

        let mut files: Vec<MediaFileHandle> = Vec::new();
        let mut fields = HashMap::new();
        let mut total_bytes = 0u64;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            let Some(file_name) = field.file_name().map(str::to_string) else {
                fields.insert(name, field.text().await?);
                continue;
            };

            if name != shape.file_field {
                debug!(field = %name, "Ignoring unexpected file field");
                continue;
            }
            if file_name.is_empty() {
                return Err(UploadRejection::NoFileSelected(shape.none_selected));
            }
            if !media_kind.allows(&file_name) {
                return Err(UploadRejection::InvalidFileType(file_name));
            }
            if let Some(max) = kind.max_inputs() {
                if files.len() >= max {
                    return Err(UploadRejection::TooManyFiles { allowed: max });
                }
            }

            let stored_name = unique_upload_name(&file_name)
                .ok_or_else(|| UploadRejection::InvalidFileType(file_name.clone()))?;
            let handle = MediaFileHandle::owned(self.upload_dir.join(stored_name))
                .with_original_name(&file_name);

            let written = self
                .store(field, &handle, &file_name, total_bytes)
                .await?;
            total_bytes += written;
            files.push(handle);
        }

        if files.is_empty() {
            return Err(UploadRejection::NoFilesUploaded(shape.none_uploaded));
        }
        if files.len() < kind.min_inputs() {
            return Err(UploadRejection::TooFewFiles {
                message: shape.too_few_message(),
            });
        }

        Ok(AdmittedUpload {
            files,
            fields,
            total_bytes,
        })
    }

    /// Stream one file part to disk. The handle removes a partial file if
    /// this fails.
    async fn store(
        &self,
        mut field: Field<'_>,
        handle: &MediaFileHandle,
        file_name: &str,
        total_before: u64,
    ) -> Result<u64, UploadRejection> {
        let mut file = tokio::fs::File::create(handle.path()).await?;
        let mut written = 0u64;

        while let Some(chunk) = field.chunk().await? {
            written += chunk.len() as u64;

            if written > self.limits.max_file_size {
                warn!(file = %file_name, limit = self.limits.max_file_size, "Upload over per-file limit");
                return Err(UploadRejection::FileTooLarge {
                    name: file_name.to_string(),
                    limit: self.limits.max_file_size,
                });
            }
            let total = total_before + written;
            if total > self.limits.max_total_size {
                warn!(total, limit = self.limits.max_total_size, "Upload over request limit");
                return Err(UploadRejection::TotalTooLarge {
                    total,
                    limit: self.limits.max_total_size,
                });
            }

            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!(
            file = %file_name,
            stored = %handle.path().display(),
            size = %format_bytes(written),
            "Stored upload"
        );
        Ok(written)
    }
}
