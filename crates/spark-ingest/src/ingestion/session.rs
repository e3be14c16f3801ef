//! Single-file upload interaction
//!
//! One file at a time. While an extraction runs, `is_extracting` blocks a
//! second one. Removing or replacing the file does not cancel the decoder;
//! its result is dropped when it arrives.

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::types::{
    CreateMaterialRequest, FileKind, MaterialDetails, NormalizedText, TextChunk, UploadedFile,
    ValidationResult,
};

use super::processor::{IngestPipeline, ProcessedFile};

#[derive(Default)]
struct SessionState {
    file: Option<(UploadedFile, FileKind)>,
    /// Bumped whenever the selected file changes
    generation: u64,
    is_extracting: bool,
    text: Option<NormalizedText>,
    chunks: Vec<TextChunk>,
    error: Option<String>,
}

/// State of one upload form
pub struct UploadSession {
    pipeline: IngestPipeline,
    state: Mutex<SessionState>,
}

/// Permission to run one extraction; clears the gate when dropped
pub struct ExtractionTicket<'a> {
    session: &'a UploadSession,
    generation: u64,
    file: UploadedFile,
    kind: FileKind,
}

impl ExtractionTicket<'_> {
    pub fn file(&self) -> &UploadedFile {
        &self.file
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }
}

impl Drop for ExtractionTicket<'_> {
    fn drop(&mut self) {
        self.session.state.lock().is_extracting = false;
    }
}

impl UploadSession {
    pub fn new(pipeline: IngestPipeline) -> Self {
        Self {
            pipeline,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Validate and select a file, replacing any previous selection.
    ///
    /// A rejected file leaves no selection and records the error.
    pub fn select_file(&self, file: UploadedFile) -> ValidationResult {
        let result = self
            .pipeline
            .validator()
            .validate(file.size, &file.mime_type, &file.file_name);

        let mut state = self.state.lock();
        state.generation += 1;
        state.text = None;
        state.chunks.clear();
        state.error = result.error.clone();
        state.file = result.kind.map(|kind| (file, kind));
        result
    }

    /// Drop the selection; an in-flight extraction result will be ignored
    pub fn remove_file(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.file = None;
        state.text = None;
        state.chunks.clear();
        state.error = None;
    }

    /// Claim the extraction gate for the selected file
    pub fn begin_extraction(&self) -> Result<ExtractionTicket<'_>> {
        let mut state = self.state.lock();
        if state.is_extracting {
            return Err(Error::ExtractionInProgress);
        }
        let (file, kind) = state
            .file
            .clone()
            .ok_or_else(|| Error::validation("No file selected"))?;

        state.is_extracting = true;
        Ok(ExtractionTicket {
            session: self,
            generation: state.generation,
            file,
            kind,
        })
    }

    /// Record an extraction outcome.
    ///
    /// Returns `Ok(None)` when the file changed since the ticket was issued.
    pub fn complete_extraction(
        &self,
        ticket: ExtractionTicket<'_>,
        outcome: Result<ProcessedFile>,
    ) -> Result<Option<Vec<TextChunk>>> {
        let generation = ticket.generation;
        drop(ticket);

        let mut state = self.state.lock();
        if generation != state.generation {
            tracing::debug!("Discarding extraction result for a file that is no longer selected");
            return Ok(None);
        }

        match outcome {
            Ok(processed) => {
                state.chunks = processed.chunks.clone();
                state.text = Some(processed.text);
                state.error = None;
                Ok(Some(processed.chunks))
            }
            Err(e) => {
                state.text = None;
                state.chunks.clear();
                state.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Extract and chunk the selected file
    pub async fn extract(&self) -> Result<Option<Vec<TextChunk>>> {
        let ticket = self.begin_extraction()?;
        let outcome = self.pipeline.process_kind(ticket.file(), ticket.kind()).await;
        self.complete_extraction(ticket, outcome)
    }

    pub fn is_extracting(&self) -> bool {
        self.state.lock().is_extracting
    }

    pub fn selected_file_name(&self) -> Option<String> {
        self.state.lock().file.as_ref().map(|(f, _)| f.file_name.clone())
    }

    pub fn chunks(&self) -> Vec<TextChunk> {
        self.state.lock().chunks.clone()
    }

    /// Text of the last successful extraction
    pub fn text(&self) -> Option<NormalizedText> {
        self.state.lock().text.clone()
    }

    /// Inline message for the last failure
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// Submission is allowed only with chunks and no extraction running
    pub fn can_submit(&self) -> bool {
        let state = self.state.lock();
        !state.is_extracting && !state.chunks.is_empty()
    }

    /// Build the payload from the current chunks
    pub fn build_request(&self, details: MaterialDetails) -> Result<CreateMaterialRequest> {
        let state = self.state.lock();
        if state.is_extracting {
            return Err(Error::ExtractionInProgress);
        }
        if state.chunks.is_empty() {
            return Err(Error::EmptyChunkSet);
        }
        Ok(CreateMaterialRequest::new(details, state.chunks.clone()))
    }
}
