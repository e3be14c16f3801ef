//! spark-ingest: course-material ingestion for StudySpark
//!
//! Validates uploaded PDF, DOCX and plain-text files, extracts normalized
//! text, splits it into overlapping token-bounded chunks and submits the
//! chunks to the material-processing service for embedding.

pub mod config;
pub mod error;
pub mod ingestion;
pub mod providers;
pub mod types;

pub use config::IngestConfig;
pub use error::{Error, Result};
pub use ingestion::{IngestPipeline, TextChunker, UploadSession};
pub use providers::{MaterialClient, MaterialSubmitter};
pub use types::{
    document::{FileKind, NormalizedText, TextChunk, UploadedFile, ValidationResult},
    material::{CreateMaterialRequest, MaterialDetails, MaterialReceipt, MaterialStatus},
};
