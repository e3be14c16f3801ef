//! Material upload payload and service responses

use serde::{Deserialize, Serialize};

use super::document::TextChunk;

/// User-entered metadata for a material
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialDetails {
    /// Material title
    pub title: String,
    /// Topic the material covers
    pub topic: String,
    /// Optional subject (course)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl MaterialDetails {
    pub fn new(title: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            topic: topic.into(),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Body of `POST /materials`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialRequest {
    pub title: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub text_chunks: Vec<TextChunk>,
}

impl CreateMaterialRequest {
    pub fn new(details: MaterialDetails, text_chunks: Vec<TextChunk>) -> Self {
        Self {
            title: details.title,
            topic: details.topic,
            subject: details.subject,
            text_chunks,
        }
    }

    /// Total words across all chunks (overlap counted twice)
    pub fn total_words(&self) -> u64 {
        self.text_chunks.iter().map(|c| c.word_count as u64).sum()
    }
}

/// Processing state reported by the material service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialStatus {
    /// Chunks accepted, embeddings being built
    Processing,
    /// Material searchable
    Ready,
    /// Backend processing failed
    Failed,
}

impl MaterialStatus {
    /// Whether the status is terminal
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl std::fmt::Display for MaterialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Persisted material identifier plus its processing status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialReceipt {
    #[serde(alias = "_id")]
    pub id: String,
    pub status: MaterialStatus,
    /// Failure reason when `status` is `failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
