//! Upload ingestion: validation, text extraction and chunking

mod chunker;
mod extractor;
mod processor;
mod session;
mod validator;

pub use chunker::{estimate_tokens, TextChunker};
pub use extractor::{
    DocxExtractor, Extractor, PdfExtractor, PlainTextExtractor, TextExtractor,
};
pub use processor::{IngestPipeline, PreparedMaterial, ProcessedFile};
pub use session::{ExtractionTicket, UploadSession};
pub use validator::{validate_file, FileValidator, UNSUPPORTED_TYPE_MESSAGE};
