//! Composition of page-absolute citations.

use crate::error::CiteError;
use crate::models::{Citation, SentenceUnit};

/// Lift a sentence-relative span to a citation on the unit's page.
///
/// `span_start..span_end` must be a non-empty range inside the unit's text
/// on `char` boundaries. Anything else means segmentation or span
/// extraction produced inconsistent offsets, and is reported as
/// [`CiteError::CitationOutOfBounds`].
pub fn compose(
    unit: &SentenceUnit,
    span_start: usize,
    span_end: usize,
) -> Result<Citation, CiteError> {
    let out_of_bounds = || CiteError::CitationOutOfBounds {
        document_id: unit.document_id,
        page_index: unit.page_index,
        char_start: unit.char_start,
        char_end: unit.char_end,
        span_start,
        span_end,
    };

    if span_start >= span_end {
        return Err(out_of_bounds());
    }
    let absolute_start = unit.char_start + span_start;
    let absolute_end = unit.char_start + span_end;
    if absolute_end > unit.char_end {
        return Err(out_of_bounds());
    }
    let text = unit.text.get(span_start..span_end).ok_or_else(out_of_bounds)?;

    Ok(Citation {
        document_id: unit.document_id,
        page: unit.page_index,
        start_char: absolute_start,
        end_char: absolute_end,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_in(page: &str, sentence: &str) -> SentenceUnit {
        let start = page.find(sentence).unwrap();
        SentenceUnit {
            document_id: 4,
            page_index: 2,
            char_start: start,
            char_end: start + sentence.len(),
            text: sentence.to_string(),
        }
    }

    #[test]
    fn test_offsets_shift_by_sentence_start() {
        let page = "Preamble text. Fees are payable in advance by wire transfer.";
        let unit = unit_in(page, "Fees are payable in advance by wire transfer.");
        let c = compose(&unit, 17, 27).unwrap();
        assert_eq!(c.start_char, unit.char_start + 17);
        assert_eq!(c.end_char, unit.char_start + 27);
        assert_eq!(c.text, "in advance");
        assert!(c.verify(page));
        assert_eq!(c.document_id, 4);
        assert_eq!(c.page, 2);
    }

    #[test]
    fn test_whole_sentence_span() {
        let page = "  Whole sentence here.";
        let unit = unit_in(page, "Whole sentence here.");
        let c = compose(&unit, 0, unit.text.len()).unwrap();
        assert_eq!(c.end_char, unit.char_end);
        assert!(c.verify(page));
    }

    #[test]
    fn test_span_past_sentence_end_is_fatal() {
        let page = "Short. Next sentence.";
        let unit = unit_in(page, "Short.");
        let err = compose(&unit, 0, 10).unwrap_err();
        assert!(matches!(err, CiteError::CitationOutOfBounds { .. }));
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_empty_span_is_fatal() {
        let unit = unit_in("Text.", "Text.");
        assert!(compose(&unit, 3, 3).is_err());
        assert!(compose(&unit, 4, 2).is_err());
    }

    #[test]
    fn test_split_character_is_fatal() {
        let page = "Prix €.";
        let unit = unit_in(page, "Prix €.");
        // byte 6 is inside the three-byte euro sign
        assert!(compose(&unit, 0, 6).is_err());
    }

    #[test]
    fn test_verify_rejects_mismatch() {
        let page = "Alpha beta.";
        let c = Citation {
            document_id: 1,
            page: 0,
            start_char: 0,
            end_char: 5,
            text: "Beta!".to_string(),
        };
        assert!(!c.verify(page));
        let past_end = Citation {
            end_char: 50,
            ..c.clone()
        };
        assert!(!past_end.verify(page));
    }
}
