//! Lexical ranking of sentence units.
//!
//! # Scoring
//!
//! For a query with distinct terms `q₁..qₙ`, a unit's score is
//!
//! ```text
//! score(u) = Σ tf(qᵢ, u) × idf(qᵢ)      idf(t) = ln((N + 1) / (df(t) + 1)) + 1
//! ```
//!
//! where `N` is the number of units in the index and `df(t)` the number of
//! units containing `t`. Results are sorted by score (desc), then document
//! id, page index, and offset (asc), so identical corpora and queries always
//! produce identical orderings.

use anyhow::Result;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::config::Config;
use crate::index::SentenceIndex;
use crate::ingest;
use crate::models::{RetrievalHit, SearchHitItem};
use crate::tokenize::normalize;

/// Smoothed inverse document frequency over sentence units.
pub fn idf(total_units: usize, df: usize) -> f64 {
    ((total_units as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0
}

/// Rank units of `index` against `query`, returning at most `top_k` hits.
///
/// A query with no usable terms returns an empty list rather than an error.
pub fn retrieve(index: &SentenceIndex, query: &str, top_k: usize) -> Vec<RetrievalHit> {
    let terms: BTreeSet<String> = normalize(query).into_iter().collect();
    if terms.is_empty() || top_k == 0 || index.is_empty() {
        return Vec::new();
    }

    let n = index.unit_count();
    let mut scores: HashMap<usize, f64> = HashMap::new();
    for term in &terms {
        let postings = index.postings(term);
        if postings.is_empty() {
            continue;
        }
        let weight = idf(n, postings.len());
        for p in postings {
            *scores.entry(p.unit).or_insert(0.0) += p.tf as f64 * weight;
        }
    }

    let mut hits: Vec<RetrievalHit> = scores
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .filter_map(|(pos, score)| {
            index.unit(pos).map(|unit| RetrievalHit {
                document_id: unit.document_id,
                page_index: unit.page_index,
                unit: unit.clone(),
                score,
            })
        })
        .collect();

    hits.sort_by(compare_hits);
    hits.truncate(top_k);
    hits
}

/// Score descending, then `(document_id, page_index, char_start)` ascending.
fn compare_hits(a: &RetrievalHit, b: &RetrievalHit) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then(a.document_id.cmp(&b.document_id))
        .then(a.page_index.cmp(&b.page_index))
        .then(a.unit.char_start.cmp(&b.unit.char_start))
}

/// CLI entry point for `cite search`.
pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let (pool, handle) = ingest::open_index(config).await?;
    let index = handle.snapshot();
    let hits = retrieve(&index, query, limit.unwrap_or(config.retrieval.top_k));
    pool.close().await;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let item = SearchHitItem::from(hit);
        println!(
            "{}. [{:.3}] document {} / page {} @ {}",
            i + 1,
            item.score,
            item.document_id,
            item.page_index,
            item.sentence_char_start
        );
        println!("    \"{}\"", item.sentence_text.replace('\n', " "));
        println!();
    }

    Ok(())
}
