//! Core data models for the retrieval and citation pipeline.
//!
//! Everything here is derived: sentence units come from segmentation, hits
//! and citations are recomputed per query and never persisted.

use serde::{Deserialize, Serialize};

/// A sentence-sized slice of one page, with page-relative byte offsets.
///
/// Always satisfies `char_start < char_end` and
/// `&page[char_start..char_end] == text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentenceUnit {
    pub document_id: i64,
    pub page_index: usize,
    pub char_start: usize,
    pub char_end: usize,
    pub text: String,
}

/// A ranked sentence for one query.
#[derive(Debug, Clone)]
pub struct RetrievalHit {
    pub document_id: i64,
    pub page_index: usize,
    pub unit: SentenceUnit,
    pub score: f64,
}

/// Wire shape of a [`RetrievalHit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHitItem {
    pub document_id: i64,
    pub page_index: usize,
    pub sentence_text: String,
    pub sentence_char_start: usize,
    pub score: f64,
}

impl From<&RetrievalHit> for SearchHitItem {
    fn from(hit: &RetrievalHit) -> Self {
        Self {
            document_id: hit.document_id,
            page_index: hit.page_index,
            sentence_text: hit.unit.text.clone(),
            sentence_char_start: hit.unit.char_start,
            score: hit.score,
        }
    }
}

/// An exact, page-relative reference to the text that answers a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub document_id: i64,
    pub page: usize,
    pub start_char: usize,
    pub end_char: usize,
    pub text: String,
}

impl Citation {
    /// True when the offsets reproduce `text` verbatim from `page_text`.
    pub fn verify(&self, page_text: &str) -> bool {
        self.start_char < self.end_char
            && page_text
                .get(self.start_char..self.end_char)
                .is_some_and(|s| s == self.text)
    }

    pub fn reference(&self) -> CitationRef {
        CitationRef {
            document_id: self.document_id,
            page: self.page,
        }
    }
}

/// Document and page of a citation, as sent at the end of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRef {
    pub document_id: i64,
    pub page: usize,
}

/// Non-streaming answer returned by `ask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

/// Fixed answer text when nothing in the corpus matches.
pub const NO_CONTENT_ANSWER: &str = "No relevant content found in uploaded documents.";

impl Answer {
    pub fn no_content() -> Self {
        Self {
            answer: NO_CONTENT_ANSWER.to_string(),
            citations: Vec::new(),
        }
    }

    pub fn has_content(&self) -> bool {
        !self.citations.is_empty()
    }
}
