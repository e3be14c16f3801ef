//! Text extraction for PDF, DOCX and plain text uploads

use std::io::{Cursor, Read};
use std::time::Duration;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::types::{FileKind, NormalizedText, UploadedFile};

/// Decodes one file kind into raw text
pub trait TextExtractor: Send + Sync {
    /// Kind handled by this extractor
    fn kind(&self) -> FileKind;

    /// Decode `data`; `file_name` is only used in error messages
    fn extract(&self, file_name: &str, data: &[u8]) -> Result<String>;
}

static PDF: PdfExtractor = PdfExtractor;
static DOCX: DocxExtractor = DocxExtractor;
static PLAIN_TEXT: PlainTextExtractor = PlainTextExtractor;

impl FileKind {
    /// Extraction strategy for this kind
    pub fn extractor(self) -> &'static dyn TextExtractor {
        match self {
            FileKind::Pdf => &PDF,
            FileKind::Docx => &DOCX,
            FileKind::PlainText => &PLAIN_TEXT,
        }
    }
}

/// PDF pages in ascending order, blank line between pages
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn kind(&self) -> FileKind {
        FileKind::Pdf
    }

    fn extract(&self, file_name: &str, data: &[u8]) -> Result<String> {
        // pdf-extract parses with lopdf too, so a load failure is final
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::extraction(file_name, format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();
        // get_pages is a BTreeMap keyed by page number
        for page_number in doc.get_pages().into_keys() {
            match doc.extract_text(&[page_number]) {
                Ok(text) => {
                    let text = join_text_items(&cleanup_pdf_text(&text));
                    if !text.is_empty() {
                        pages.push(text);
                    }
                }
                Err(e) => {
                    tracing::debug!("Could not decode page {} of {}: {}", page_number, file_name, e);
                }
            }
        }

        if pages.is_empty() {
            tracing::warn!("Per-page extraction found no text in {}, trying pdf-extract", file_name);
            let text = pdf_extract::extract_text_from_mem(data)
                .map_err(|e| Error::extraction(file_name, format!("pdf-extract failed: {}", e)))?;

            // pdf-extract separates pages with form feeds
            pages = text
                .split('\u{c}')
                .map(|page| join_text_items(&cleanup_pdf_text(page)))
                .filter(|page| !page.is_empty())
                .collect();
        }

        Ok(pages.join("\n\n"))
    }
}

/// Word documents: paragraph text, blank line between paragraphs
pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn kind(&self) -> FileKind {
        FileKind::Docx
    }

    fn extract(&self, file_name: &str, data: &[u8]) -> Result<String> {
        match read_docx_paragraphs(data) {
            Ok(paragraphs) if !paragraphs.is_empty() => Ok(paragraphs.join("\n\n")),
            Ok(_) => {
                // Body text may live only in tables, which the structured reader skips
                tracing::debug!("No body paragraphs in {}, reading document.xml", file_name);
                read_document_xml(data)
                    .map(|paragraphs| paragraphs.join("\n\n"))
                    .map_err(|message| Error::extraction(file_name, message))
            }
            Err(primary) => {
                tracing::warn!("docx-rs rejected {}: {}, reading document.xml", file_name, primary);
                read_document_xml(data)
                    .map(|paragraphs| paragraphs.join("\n\n"))
                    .map_err(|fallback| {
                        Error::extraction(file_name, format!("{} ({})", primary, fallback))
                    })
            }
        }
    }
}

/// UTF-8 text, invalid sequences replaced
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn kind(&self) -> FileKind {
        FileKind::PlainText
    }

    fn extract(&self, _file_name: &str, data: &[u8]) -> Result<String> {
        let text = String::from_utf8_lossy(data);
        Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
    }
}

/// Runs extractors off the async executor with an optional deadline
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    timeout: Option<Duration>,
}

impl Extractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            timeout: config.timeout(),
        }
    }

    /// Extract and normalize text.
    ///
    /// Fails when the decoder errors, panics, exceeds the deadline, or
    /// produces only whitespace.
    pub async fn extract(&self, file: &UploadedFile, kind: FileKind) -> Result<NormalizedText> {
        let data = file.data.clone();
        let name = file.file_name.clone();
        let task = tokio::task::spawn_blocking(move || kind.extractor().extract(&name, &data));

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                tracing::error!("Extraction of {} timed out after {:?}", file.file_name, limit);
                Error::extraction(&file.file_name, format!("timed out after {:?}", limit))
            })?,
            None => task.await,
        };

        let raw = joined
            .map_err(|e| Error::extraction(&file.file_name, format!("decoder crashed: {}", e)))??;

        into_normalized(&file.file_name, raw)
    }

    /// Extract on the current thread
    pub fn extract_blocking(file: &UploadedFile, kind: FileKind) -> Result<NormalizedText> {
        let raw = kind.extractor().extract(&file.file_name, &file.data)?;
        into_normalized(&file.file_name, raw)
    }
}

fn into_normalized(file_name: &str, raw: String) -> Result<NormalizedText> {
    let text = NormalizedText::new(raw)
        .ok_or_else(|| Error::extraction(file_name, "No text content could be extracted"))?;
    tracing::debug!(
        "Extracted {} chars from {} (hash {})",
        text.char_count(),
        file_name,
        &text.content_hash()[..12]
    );
    Ok(text)
}

/// Body paragraphs through docx-rs
fn read_docx_paragraphs(data: &[u8]) -> std::result::Result<Vec<String>, String> {
    let doc = docx_rs::read_docx(data).map_err(|e| e.to_string())?;

    let mut paragraphs = Vec::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            let mut text = String::new();
            for child in p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        match child {
                            docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                            docx_rs::RunChild::Tab(_) => text.push('\t'),
                            docx_rs::RunChild::Break(_) => text.push('\n'),
                            _ => {}
                        }
                    }
                }
            }
            if !text.trim().is_empty() {
                paragraphs.push(text);
            }
        }
    }

    Ok(paragraphs)
}

/// Every `w:p` in `word/document.xml`, tables included
fn read_document_xml(data: &[u8]) -> std::result::Result<Vec<String>, String> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).map_err(|e| format!("not a DOCX container: {}", e))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| format!("missing word/document.xml: {}", e))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("unreadable word/document.xml: {}", e))?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e.unescape().map_err(|e| format!("bad XML text: {}", e))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let paragraph = std::mem::take(&mut current);
                    if !paragraph.trim().is_empty() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("malformed document.xml: {}", e)),
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Join the text items of one page with single spaces
fn join_text_items(page: &str) -> String {
    page.lines()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace ligature glyphs and invisible characters left by PDF fonts
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{00A0}', " ") // Non-breaking space
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}
