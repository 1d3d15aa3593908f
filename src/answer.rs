//! Question answering over the current index.
//!
//! Retrieves the best sentence for a question, narrows it to an answer span,
//! and composes a verified citation. Shared by the `cite ask` command and the
//! HTTP `ask` endpoints.

use anyhow::Result;

use crate::citation::compose;
use crate::config::Config;
use crate::error::CiteError;
use crate::index::SentenceIndex;
use crate::ingest;
use crate::models::Answer;
use crate::retrieve::retrieve;
use crate::span::extract_answer_span;

/// Answer `query` from `index`, considering the `top_k` best sentences.
///
/// Returns [`Answer::no_content`] when nothing matches. Fails only for an
/// empty query or an internal offset inconsistency.
pub fn answer(index: &SentenceIndex, query: &str, top_k: usize) -> Result<Answer, CiteError> {
    if query.trim().is_empty() {
        return Err(CiteError::EmptyQuery);
    }

    let hits = retrieve(index, query, top_k);
    let Some(best) = hits.first() else {
        tracing::debug!(query, "no matching sentences");
        return Ok(Answer::no_content());
    };

    let span = extract_answer_span(&best.unit.text, query);
    let citation = compose(&best.unit, span.start, span.end).inspect_err(|e| {
        tracing::error!(error = %e, query, "citation composition failed");
    })?;

    Ok(Answer {
        answer: citation.text.clone(),
        citations: vec![citation],
    })
}

/// CLI entry point for `cite ask`.
pub async fn run_ask(config: &Config, query: &str) -> Result<()> {
    let (pool, handle) = ingest::open_index(config).await?;
    let index = handle.snapshot();
    pool.close().await;

    let result = answer(&index, query, config.retrieval.top_k)?;
    println!("{}", result.answer);
    for c in &result.citations {
        println!(
            "    [document {} / page {} / chars {}..{}]",
            c.document_id, c.page, c.start_char, c.end_char
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocumentSet;
    use crate::models::NO_CONTENT_ANSWER;

    fn index_of(entries: Vec<(i64, Vec<&str>)>) -> SentenceIndex {
        let set: DocumentSet = entries
            .into_iter()
            .map(|(id, pages)| (id, pages.into_iter().map(String::from).collect()))
            .collect();
        SentenceIndex::build(&set, 1)
    }

    #[test]
    fn test_notice_scenario_citation() {
        let page = "This Agreement may be terminated with 15 days notice.";
        let idx = index_of(vec![(1, vec![page])]);
        let ans = answer(&idx, "termination notice period", 5).unwrap();

        assert_eq!(ans.citations.len(), 1);
        let c = &ans.citations[0];
        assert_eq!(c.document_id, 1);
        assert_eq!(c.page, 0);
        assert!(c.text.contains("15 days notice"));
        assert_eq!(&page[c.start_char..c.end_char], c.text);
        assert_eq!(ans.answer, c.text);
    }

    #[test]
    fn test_citation_offsets_are_page_absolute() {
        let pages = vec![
            "Cover page only",
            "Definitions follow. The Customer shall pay all fees within 30 days of invoice. Late fees accrue.",
        ];
        let idx = index_of(vec![(9, pages.clone())]);
        let ans = answer(&idx, "when are fees paid invoice", 3).unwrap();
        let c = &ans.citations[0];
        assert_eq!(c.page, 1);
        assert!(c.start_char > 0);
        assert!(c.verify(pages[1]));
        assert!(c.verify(idx.page_text(9, 1).unwrap()));
    }

    #[test]
    fn test_empty_corpus_gives_no_content() {
        let idx = SentenceIndex::empty();
        let ans = answer(&idx, "termination notice", 5).unwrap();
        assert_eq!(ans.answer, NO_CONTENT_ANSWER);
        assert!(ans.citations.is_empty());
        assert!(!ans.has_content());
    }

    #[test]
    fn test_empty_query_is_user_error() {
        let idx = index_of(vec![(1, vec!["Anything."])]);
        let err = answer(&idx, "   ", 5).unwrap_err();
        assert!(matches!(err, CiteError::EmptyQuery));
        assert!(err.is_user_error());
    }

    #[test]
    fn test_stop_word_query_is_no_content() {
        let idx = index_of(vec![(1, vec!["The term is one year."])]);
        let ans = answer(&idx, "what is the", 5).unwrap();
        assert_eq!(ans, Answer::no_content());
    }

    #[test]
    fn test_every_citation_verifies_against_its_page() {
        let pages = vec![
            "MASTER SERVICES AGREEMENT\n\nThis Agreement is governed by the laws of Delaware. \
             Either party may terminate for convenience upon 60 days written notice.",
            "Fees are invoiced monthly.  Payment is due net 30.\n\nLiability is capped at fees paid.",
        ];
        let idx = index_of(vec![(1, pages.clone())]);
        for q in [
            "governing law",
            "terminate convenience notice",
            "payment due",
            "liability cap",
            "invoiced monthly fees",
            "unrelated query words",
        ] {
            let ans = answer(&idx, q, 5).unwrap();
            for c in &ans.citations {
                assert!(c.start_char < c.end_char);
                assert!(c.end_char <= pages[c.page].len());
                assert!(c.verify(pages[c.page]), "bad citation for {:?}: {:?}", q, c);
            }
        }
    }
}
