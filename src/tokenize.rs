//! Text normalization shared by indexing, querying, and span selection.
//!
//! A token is a maximal run of alphanumeric characters. Tokens are
//! lowercased, stop words are flagged, and the remaining words pass through a
//! small suffix stemmer so that `termination` and `terminated` produce the
//! same term. Everything here is pure: the same input always yields the same
//! terms, which keeps scoring reproducible.

/// Words too common to carry any ranking signal.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "as", "at", "be", "been", "by", "can", "do", "does", "for",
    "from", "has", "have", "how", "if", "in", "into", "is", "it", "its", "of", "on", "or", "our",
    "shall", "such", "that", "the", "their", "then", "there", "these", "this", "those", "to",
    "was", "we", "were", "what", "when", "where", "which", "who", "will", "with", "you", "your",
];

/// Suffixes removed by [`stem`], tried in order. The first one that leaves a
/// stem of at least [`MIN_STEM`] bytes wins.
const SUFFIXES: &[&str] = &[
    "ational", "ations", "ation", "ating", "ated", "ates", "ate", "ments", "ment", "ions", "ion",
    "ings", "ing", "edly", "ed", "ly",
];

const MIN_STEM: usize = 3;

/// A word token with its byte range in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Normalized (lowercased, stemmed) term.
    pub term: String,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// True when the word is a stop word and never matches a query.
    pub stop: bool,
}

/// Split `text` into normalized query/index terms, dropping stop words.
pub fn normalize(text: &str) -> Vec<String> {
    tokens(text)
        .into_iter()
        .filter(|t| !t.stop)
        .map(|t| t.term)
        .collect()
}

/// Every word token in `text`, stop words included, in order of appearance.
pub fn tokens(text: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let mut word_start: Option<usize> = None;

    for (i, ch) in text.char_indices() {
        if ch.is_alphanumeric() {
            if word_start.is_none() {
                word_start = Some(i);
            }
        } else if let Some(start) = word_start.take() {
            out.push(make_token(text, start, i));
        }
    }
    if let Some(start) = word_start {
        out.push(make_token(text, start, text.len()));
    }

    out
}

fn make_token(text: &str, start: usize, end: usize) -> Token {
    let lower = text[start..end].to_lowercase();
    let stop = STOP_WORDS.contains(&lower.as_str());
    let term = if stop { lower } else { stem(&lower) };
    Token {
        term,
        start,
        end,
        stop,
    }
}

/// Light suffix stripping for lowercase words.
pub fn stem(word: &str) -> String {
    if !word.is_ascii() || word.chars().all(|c| c.is_ascii_digit()) {
        return word.to_string();
    }

    if let Some(base) = word.strip_suffix("ies").or_else(|| word.strip_suffix("ied")) {
        if base.len() >= MIN_STEM - 1 {
            return format!("{}y", base);
        }
    }

    for suffix in SUFFIXES {
        if let Some(base) = word.strip_suffix(suffix) {
            if base.len() >= MIN_STEM {
                return base.to_string();
            }
        }
    }

    if word.len() > MIN_STEM
        && word.ends_with('s')
        && !(word.ends_with("ss") || word.ends_with("us") || word.ends_with("is"))
    {
        return word[..word.len() - 1].to_string();
    }

    word.to_string()
}
