//! Upload checks run before any decoding

use crate::config::UploadLimits;
use crate::error::{Error, Result};
use crate::types::{FileKind, UploadedFile, ValidationResult};

/// Message for files of an unaccepted type
pub const UNSUPPORTED_TYPE_MESSAGE: &str = "Only PDF, DOCX, and TXT files are supported";

/// File validator with configurable limits
#[derive(Debug, Clone, Default)]
pub struct FileValidator {
    limits: UploadLimits,
}

impl FileValidator {
    pub fn new(limits: UploadLimits) -> Self {
        Self { limits }
    }

    /// Maximum accepted size in bytes
    pub fn max_file_size(&self) -> u64 {
        self.limits.max_file_size
    }

    /// Check size, then type. MIME match wins; the extension is the fallback.
    pub fn validate(&self, size: u64, mime_type: &str, file_name: &str) -> ValidationResult {
        if size > self.limits.max_file_size {
            return ValidationResult::invalid(format!(
                "File size must be less than {}",
                format_size(self.limits.max_file_size)
            ));
        }

        match FileKind::detect(mime_type, file_name) {
            Some(kind) => ValidationResult::ok(kind),
            None => ValidationResult::invalid(UNSUPPORTED_TYPE_MESSAGE),
        }
    }

    /// Validate an uploaded file, returning the kind that drives extraction
    pub fn validate_upload(&self, file: &UploadedFile) -> Result<FileKind> {
        let result = self.validate(file.size, &file.mime_type, &file.file_name);
        match (result.valid, result.kind) {
            (true, Some(kind)) => {
                tracing::debug!("Accepted {} as {} ({} bytes)", file.file_name, kind, file.size);
                Ok(kind)
            }
            _ => {
                let message = result
                    .error
                    .unwrap_or_else(|| UNSUPPORTED_TYPE_MESSAGE.to_string());
                tracing::info!("Rejected {}: {}", file.file_name, message);
                Err(Error::Validation(message))
            }
        }
    }
}

/// Validate with the default limits (10MB)
pub fn validate_file(size: u64, mime_type: &str, file_name: &str) -> ValidationResult {
    FileValidator::default().validate(size, mime_type, file_name)
}

fn format_size(bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;

    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= MB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{}KB", bytes / KB)
    } else {
        format!("{} bytes", bytes)
    }
}
