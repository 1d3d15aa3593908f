use thiserror::Error;

/// Errors raised by the question-answering core.
///
/// A query with no matching content is not an error; it produces an empty
/// result instead.
#[derive(Debug, Error)]
pub enum CiteError {
    /// The caller supplied an empty or whitespace-only query.
    #[error("query must not be empty")]
    EmptyQuery,

    /// A composed citation does not fit inside its sentence. This points at a
    /// bug in segmentation or span extraction and is never corrected silently.
    #[error(
        "citation span {span_start}..{span_end} does not fit sentence {char_start}..{char_end} \
         (document {document_id}, page {page_index})"
    )]
    CitationOutOfBounds {
        document_id: i64,
        page_index: usize,
        char_start: usize,
        char_end: usize,
        span_start: usize,
        span_end: usize,
    },
}

impl CiteError {
    /// True for failures caused by the caller's input rather than the server.
    pub fn is_user_error(&self) -> bool {
        matches!(self, CiteError::EmptyQuery)
    }
}
