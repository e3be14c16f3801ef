//! End-to-end ingestion: validate, extract, chunk, submit

use async_trait::async_trait;
use parking_lot::Mutex;
use spark_ingest::config::IngestConfig;
use spark_ingest::error::EXTRACTION_FAILED_MESSAGE;
use spark_ingest::types::{MIME_DOCX, MIME_TEXT};
use spark_ingest::{
    CreateMaterialRequest, Error, FileKind, IngestPipeline, MaterialDetails, MaterialReceipt,
    MaterialStatus, MaterialSubmitter, Result, UploadSession, UploadedFile,
};
use std::io::Cursor;

/// Records submitted payloads
#[derive(Default)]
struct RecordingSubmitter {
    requests: Mutex<Vec<CreateMaterialRequest>>,
}

#[async_trait]
impl MaterialSubmitter for RecordingSubmitter {
    async fn submit(&self, request: &CreateMaterialRequest) -> Result<MaterialReceipt> {
        let mut requests = self.requests.lock();
        requests.push(request.clone());
        Ok(MaterialReceipt {
            id: format!("m{}", requests.len()),
            status: MaterialStatus::Processing,
            error: None,
        })
    }

    async fn status(&self, material_id: &str) -> Result<MaterialReceipt> {
        Ok(MaterialReceipt {
            id: material_id.to_string(),
            status: MaterialStatus::Ready,
            error: None,
        })
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn docx(paragraphs: &[&str]) -> Vec<u8> {
    use docx_rs::{Docx, Paragraph, Run};

    let mut docx = Docx::new();
    for text in paragraphs {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)));
    }
    let mut cursor = Cursor::new(Vec::new());
    docx.build().pack(&mut cursor).unwrap();
    cursor.into_inner()
}

fn small_budget() -> IngestConfig {
    IngestConfig::from_toml_str(
        r#"
        [chunking]
        max_tokens = 3
        overlap_words = 2
        "#,
    )
    .unwrap()
}

#[tokio::test]
async fn docx_is_chunked_and_submitted() {
    let pipeline = IngestPipeline::new(&small_budget());
    let file = UploadedFile::new(
        "lecture.docx",
        MIME_DOCX,
        docx(&["Para one.", "Para two.", "Para three."]),
    );

    let prepared = pipeline
        .prepare(&file, MaterialDetails::new("Lecture", "Cells").with_subject("BIO101"))
        .await
        .unwrap();
    assert_eq!(prepared.kind, FileKind::Docx);

    let contents: Vec<&str> = prepared
        .request
        .text_chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect();
    assert_eq!(contents[0], "Para one.");
    assert!(contents.iter().any(|c| c.ends_with("Para three.")));

    let submitter = RecordingSubmitter::default();
    let receipt = pipeline.submit(&prepared, &submitter).await.unwrap();
    assert_eq!(receipt.id, "m1");

    let sent = submitter.requests.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject.as_deref(), Some("BIO101"));
    assert_eq!(sent[0], prepared.request);
}

#[tokio::test]
async fn oversized_file_never_reaches_extraction() {
    let pipeline = IngestPipeline::default();
    let file = UploadedFile::new("big.txt", MIME_TEXT, b"tiny".to_vec())
        .with_declared_size(10 * 1024 * 1024 + 1);

    match pipeline.process(&file).await {
        Err(Error::Validation(message)) => assert_eq!(message, "File size must be less than 10MB"),
        other => panic!("expected validation error, got {:?}", other.map(|p| p.chunks)),
    }
}

#[tokio::test]
async fn corrupted_docx_reports_extraction_failure() {
    let pipeline = IngestPipeline::default();
    let file = UploadedFile::new("broken.docx", MIME_DOCX, b"not a zip archive".to_vec());

    let err = pipeline.process(&file).await.unwrap_err();
    assert!(matches!(err, Error::Extraction { .. }));
    assert_eq!(err.user_message(), EXTRACTION_FAILED_MESSAGE);
}

#[tokio::test]
async fn session_flow_from_selection_to_payload() {
    let session = UploadSession::new(IngestPipeline::new(&small_budget()));

    let rejected = session.select_file(UploadedFile::new("photo.png", "image/png", vec![1u8, 2, 3]));
    assert_eq!(
        rejected.error.as_deref(),
        Some("Only PDF, DOCX, and TXT files are supported")
    );

    let accepted = session.select_file(UploadedFile::new(
        "notes.txt",
        MIME_TEXT,
        b"Para one.\n\nPara two.\n\nPara three.".to_vec(),
    ));
    assert!(accepted.valid);

    let chunks = session.extract().await.unwrap().unwrap();
    assert_eq!(chunks.len(), 3);
    assert!(session.can_submit());

    let request = session
        .build_request(MaterialDetails::new("Notes", "Intro"))
        .unwrap();
    assert_eq!(request.text_chunks, chunks);
    assert_eq!(session.text().unwrap().as_str(), "Para one.\n\nPara two.\n\nPara three.");
}
