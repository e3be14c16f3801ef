//! Ingestion pipeline orchestration

use crate::config::IngestConfig;
use crate::error::Result;
use crate::providers::MaterialSubmitter;
use crate::types::{
    CreateMaterialRequest, FileKind, MaterialDetails, MaterialReceipt, NormalizedText, TextChunk,
    UploadedFile,
};

use super::chunker::TextChunker;
use super::extractor::Extractor;
use super::validator::FileValidator;

/// Output of validate + extract + chunk for one file
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub file_name: String,
    pub kind: FileKind,
    pub text: NormalizedText,
    pub chunks: Vec<TextChunk>,
}

/// A payload ready to send
#[derive(Debug, Clone)]
pub struct PreparedMaterial {
    pub kind: FileKind,
    /// Hash of the extracted text
    pub content_hash: String,
    pub request: CreateMaterialRequest,
}

/// Main ingestion pipeline
#[derive(Debug, Clone, Default)]
pub struct IngestPipeline {
    validator: FileValidator,
    extractor: Extractor,
    chunker: TextChunker,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            validator: FileValidator::new(config.upload.clone()),
            extractor: Extractor::new(&config.extraction),
            chunker: TextChunker::from_config(&config.chunking),
        }
    }

    pub fn validator(&self) -> &FileValidator {
        &self.validator
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    /// Check size and type, selecting the file kind
    pub fn validate(&self, file: &UploadedFile) -> Result<FileKind> {
        self.validator.validate_upload(file)
    }

    /// Extract and chunk a file whose kind is already known
    pub async fn process_kind(&self, file: &UploadedFile, kind: FileKind) -> Result<ProcessedFile> {
        let text = self.extractor.extract(file, kind).await?;
        let chunks = self.chunker.chunk_checked(text.as_str())?;

        tracing::info!(
            "Processed {} ({}): {} words in {} chunks",
            file.file_name,
            kind,
            text.word_count(),
            chunks.len()
        );

        Ok(ProcessedFile {
            file_name: file.file_name.clone(),
            kind,
            text,
            chunks,
        })
    }

    /// Full processing: validate + extract + chunk
    pub async fn process(&self, file: &UploadedFile) -> Result<ProcessedFile> {
        let kind = self.validate(file)?;
        self.process_kind(file, kind).await
    }

    /// Process a file and build the upload payload
    pub async fn prepare(
        &self,
        file: &UploadedFile,
        details: MaterialDetails,
    ) -> Result<PreparedMaterial> {
        let processed = self.process(file).await?;
        Ok(PreparedMaterial {
            kind: processed.kind,
            content_hash: processed.text.content_hash().to_string(),
            request: CreateMaterialRequest::new(details, processed.chunks),
        })
    }

    /// Send a prepared payload
    pub async fn submit(
        &self,
        prepared: &PreparedMaterial,
        submitter: &dyn MaterialSubmitter,
    ) -> Result<MaterialReceipt> {
        tracing::debug!(
            "Sending {} chunks via {} (content {})",
            prepared.request.text_chunks.len(),
            submitter.name(),
            &prepared.content_hash[..12]
        );
        submitter.submit(&prepared.request).await
    }
}
