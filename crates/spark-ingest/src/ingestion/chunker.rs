//! Paragraph-preserving text chunking with word overlap

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{ChunkingConfig, OverlapStrategy};
use crate::error::{Error, Result};
use crate::types::TextChunk;

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static HORIZONTAL_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Estimated token count: one token per four characters, rounded up
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Text chunker with a token budget and word overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Estimated tokens per chunk
    max_tokens: usize,
    /// Trailing words carried into the next chunk
    overlap_words: usize,
    overlap_strategy: OverlapStrategy,
}

/// Chunk being accumulated
struct OpenChunk {
    text: String,
    tokens: usize,
    /// Byte length of the inherited overlap prefix
    seed_len: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(max_tokens: usize, overlap_words: usize) -> Self {
        Self {
            max_tokens,
            overlap_words,
            overlap_strategy: OverlapStrategy::Compounding,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.max_tokens, config.overlap_words)
            .with_overlap_strategy(config.overlap_strategy)
    }

    pub fn with_overlap_strategy(mut self, strategy: OverlapStrategy) -> Self {
        self.overlap_strategy = strategy;
        self
    }

    /// Split text into ordered chunks.
    ///
    /// Paragraphs are never split, so one oversized paragraph becomes one
    /// oversized chunk. Text without paragraphs yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let cleaned = clean_text(text);
        let paragraphs = split_paragraphs(&cleaned);

        let mut closed: Vec<String> = Vec::new();
        let mut current = OpenChunk {
            text: String::new(),
            tokens: 0,
            seed_len: 0,
        };

        for paragraph in paragraphs {
            let paragraph_tokens = estimate_tokens(paragraph);

            if current.tokens + paragraph_tokens > self.max_tokens && !current.text.is_empty() {
                let seed = self.overlap_seed(&current);
                closed.push(current.text.trim().to_string());

                // The separator counts toward the budget even with no seed
                let mut text = String::with_capacity(seed.len() + 2 + paragraph.len());
                text.push_str(&seed);
                text.push_str("\n\n");
                let seed_len = text.len();
                text.push_str(paragraph);

                current = OpenChunk {
                    tokens: estimate_tokens(&text),
                    text,
                    seed_len,
                };
            } else {
                if !current.text.is_empty() {
                    current.text.push_str("\n\n");
                }
                current.text.push_str(paragraph);
                current.tokens += paragraph_tokens;
            }
        }

        if !current.text.is_empty() {
            closed.push(current.text.trim().to_string());
        }

        tracing::debug!(
            "Chunked {} chars into {} chunks (budget {} tokens)",
            cleaned.chars().count(),
            closed.len(),
            self.max_tokens
        );

        closed
            .iter()
            .enumerate()
            .map(|(order, content)| TextChunk::new(content, order as u32))
            .collect()
    }

    /// Like [`chunk`](Self::chunk), but an empty result is an error
    pub fn chunk_checked(&self, text: &str) -> Result<Vec<TextChunk>> {
        let chunks = self.chunk(text);
        if chunks.is_empty() {
            return Err(Error::EmptyChunkSet);
        }
        Ok(chunks)
    }

    /// Last `overlap_words` words of the chunk being closed
    fn overlap_seed(&self, chunk: &OpenChunk) -> String {
        if self.overlap_words == 0 {
            return String::new();
        }

        let source = match self.overlap_strategy {
            OverlapStrategy::Compounding => chunk.text.as_str(),
            OverlapStrategy::Boundary => &chunk.text[chunk.seed_len..],
        };

        let words: Vec<&str> = source.split_whitespace().collect();
        let start = words.len().saturating_sub(self.overlap_words);
        words[start..].join(" ")
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

/// Trim, cap blank-line runs at one, and squeeze horizontal whitespace
fn clean_text(text: &str) -> String {
    let text = EXCESS_NEWLINES.replace_all(text.trim(), "\n\n");
    HORIZONTAL_SPACE.replace_all(&text, " ").into_owned()
}

fn split_paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}
