//! Core types for the ingestion pipeline

pub mod document;
pub mod material;

pub use document::{
    count_words, FileKind, NormalizedText, TextChunk, UploadedFile, ValidationResult, MIME_DOCX,
    MIME_PDF, MIME_TEXT,
};
pub use material::{CreateMaterialRequest, MaterialDetails, MaterialReceipt, MaterialStatus};
