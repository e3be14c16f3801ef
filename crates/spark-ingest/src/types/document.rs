//! Uploaded files, normalized text and chunks

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::Result;

/// MIME type for PDF uploads
pub const MIME_PDF: &str = "application/pdf";
/// MIME type for Word (.docx) uploads
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
/// MIME type for plain text uploads
pub const MIME_TEXT: &str = "text/plain";

/// Accepted file kinds.
///
/// Selected once during validation; extraction dispatches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain UTF-8 text
    #[serde(rename = "text")]
    PlainText,
}

impl FileKind {
    /// Every accepted kind
    pub const ALL: [FileKind; 3] = [FileKind::Pdf, FileKind::Docx, FileKind::PlainText];

    /// Match a declared MIME type, ignoring case and parameters
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();

        Self::ALL.into_iter().find(|kind| kind.mime_type() == essence)
    }

    /// Match a bare extension (no dot), ignoring case
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Match the extension of a file name
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Select a kind from the declared MIME type, falling back to the extension
    pub fn detect(mime_type: &str, file_name: &str) -> Option<Self> {
        Self::from_mime(mime_type).or_else(|| Self::from_file_name(file_name))
    }

    /// Canonical MIME type
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => MIME_PDF,
            Self::Docx => MIME_DOCX,
            Self::PlainText => MIME_TEXT,
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::PlainText => "Text File",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A file picked by the user for upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Raw file bytes
    pub data: Bytes,
    /// MIME type declared by the picker (may be empty or wrong)
    pub mime_type: String,
    /// Original file name
    pub file_name: String,
    /// Declared size in bytes
    pub size: u64,
}

impl UploadedFile {
    /// Create from in-memory bytes; the declared size is the byte length
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            size: data.len() as u64,
            data,
            mime_type: mime_type.into(),
            file_name: file_name.into(),
        }
    }

    /// Override the declared size
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Read a local file, guessing its MIME type from the extension
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");

        Ok(Self::new(file_name, mime_type, data))
    }
}

/// Text content of one file, ready for chunking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    content: String,
    content_hash: String,
}

impl NormalizedText {
    /// Normalize line endings and trim. Returns `None` when nothing remains.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let content = raw
            .as_ref()
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            .trim()
            .to_string();

        if content.is_empty() {
            return None;
        }

        Some(Self {
            content_hash: hash_content(&content),
            content,
        })
    }

    /// Borrow the text
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// SHA-256 of the text, hex encoded
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Length in characters
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Whitespace-delimited word count
    pub fn word_count(&self) -> usize {
        count_words(&self.content)
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.content
    }
}

impl std::fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.content)
    }
}

/// A bounded span of text tagged with its position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChunk {
    /// Chunk text
    pub content: String,
    /// Zero-based position within the file
    pub order: u32,
    /// Whitespace-delimited non-empty tokens in `content`
    pub word_count: u32,
}

impl TextChunk {
    /// Create a chunk, trimming the content and counting its words
    pub fn new(content: impl AsRef<str>, order: u32) -> Self {
        let content = content.as_ref().trim().to_string();
        Self {
            word_count: count_words(&content) as u32,
            content,
            order,
        }
    }
}

/// Outcome of checking a file before extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the file may be processed
    pub valid: bool,
    /// Reason for rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Kind selected for an accepted file
    #[serde(skip)]
    pub kind: Option<FileKind>,
}

impl ValidationResult {
    /// Accepted file
    pub fn ok(kind: FileKind) -> Self {
        Self {
            valid: true,
            error: None,
            kind: Some(kind),
        }
    }

    /// Rejected file
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            kind: None,
        }
    }
}

/// Count whitespace-delimited non-empty tokens
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Hash content for deduplication
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
