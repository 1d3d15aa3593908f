//! Answer span selection inside a retrieved sentence.
//!
//! Picks the shortest run of tokens that covers every query term present in
//! the sentence, widens it by one token on each side, and maps it back to
//! byte offsets in the sentence. When the sentence shares no term with the
//! query the whole sentence is the answer, so extraction never fails.

use std::collections::{HashMap, HashSet};

use crate::tokenize::{normalize, tokens, Token};

/// A slice of the sentence chosen as the answer, with sentence-relative
/// byte offsets: `&sentence[start..end] == text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerSpan<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl<'a> AnswerSpan<'a> {
    fn whole(sentence: &'a str) -> Self {
        Self {
            text: sentence,
            start: 0,
            end: sentence.len(),
        }
    }
}

/// Select the part of `sentence` that best answers `query`.
pub fn extract_answer_span<'a>(sentence: &'a str, query: &str) -> AnswerSpan<'a> {
    let query_terms: HashSet<String> = normalize(query).into_iter().collect();
    let toks = tokens(sentence);

    let relevant = |t: &Token| !t.stop && query_terms.contains(&t.term);
    let needed: HashSet<&str> = toks
        .iter()
        .filter(|t| relevant(*t))
        .map(|t| t.term.as_str())
        .collect();
    if needed.is_empty() {
        return AnswerSpan::whole(sentence);
    }

    let Some((lo, hi)) = minimal_window(&toks, &needed) else {
        return AnswerSpan::whole(sentence);
    };

    let lo = lo.saturating_sub(1);
    let hi = (hi + 1).min(toks.len() - 1);
    let start = toks[lo].start;
    let end = toks[hi].end;

    AnswerSpan {
        text: &sentence[start..end],
        start,
        end,
    }
}

/// Token index range `[lo, hi]` of the shortest window containing every term
/// in `needed`. Ties keep the earliest window.
fn minimal_window(toks: &[Token], needed: &HashSet<&str>) -> Option<(usize, usize)> {
    let is_needed = |t: &Token| !t.stop && needed.contains(t.term.as_str());

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut covered = 0;
    let mut best: Option<(usize, usize)> = None;
    let mut lo = 0;

    for hi in 0..toks.len() {
        if is_needed(&toks[hi]) {
            let c = counts.entry(toks[hi].term.as_str()).or_insert(0);
            *c += 1;
            if *c == 1 {
                covered += 1;
            }
        }

        while covered == needed.len() && lo <= hi {
            if best.map_or(true, |(bl, bh)| hi - lo < bh - bl) {
                best = Some((lo, hi));
            }
            if is_needed(&toks[lo]) {
                if let Some(c) = counts.get_mut(toks[lo].term.as_str()) {
                    *c -= 1;
                    if *c == 0 {
                        covered -= 1;
                    }
                }
            }
            lo += 1;
        }
    }

    best
}
