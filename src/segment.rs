//! Sentence segmentation with exact page offsets.
//!
//! Splits page text into sentence units. A sentence ends at a run of
//! terminal punctuation (`.`, `!`, `?`, optionally followed by closing quotes
//! or brackets) when the next non-whitespace character is not a lowercase
//! letter, so abbreviations like `e.g. the` stay inside one sentence. On a
//! page that has terminal punctuation a blank line also ends a unit, which
//! keeps headings apart from the clause below. A page without any terminal
//! punctuation is always a single unit.
//!
//! Offsets are byte positions in the original page string and are never
//! shifted by normalization: `&page[s.char_start..s.char_end] == s.text`.

/// A sentence unit borrowed from its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub char_start: usize,
    pub char_end: usize,
    pub text: &'a str,
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}')
}

/// Split `page` into trimmed, non-empty sentence units in page order.
pub fn segment(page: &str) -> Vec<Segment<'_>> {
    let chars: Vec<(usize, char)> = page.char_indices().collect();
    let n = chars.len();
    let mut out = Vec::new();
    let mut piece_start = 0;
    let mut i = 0;
    // Without terminal punctuation the whole page is one unit
    let split_blank_lines = chars.iter().any(|&(_, c)| is_terminal(c));

    while i < n {
        let (pos, ch) = chars[i];

        if is_terminal(ch) {
            let mut j = i + 1;
            while j < n && (is_terminal(chars[j].1) || is_closer(chars[j].1)) {
                j += 1;
            }
            let end = if j < n { chars[j].0 } else { page.len() };

            if j == n {
                push_trimmed(page, piece_start, end, &mut out);
                piece_start = end;
            } else if chars[j].1.is_whitespace() {
                let mut k = j;
                while k < n && chars[k].1.is_whitespace() {
                    k += 1;
                }
                if k == n || !chars[k].1.is_lowercase() {
                    push_trimmed(page, piece_start, end, &mut out);
                    piece_start = end;
                }
            }
            i = j;
            continue;
        }

        if split_blank_lines && ch == '\n' && blank_line_follows(&chars[i + 1..]) {
            push_trimmed(page, piece_start, pos, &mut out);
            piece_start = pos;
        }

        i += 1;
    }

    push_trimmed(page, piece_start, page.len(), &mut out);
    out
}

/// True when the characters after a newline reach another newline through
/// horizontal whitespace only.
fn blank_line_follows(rest: &[(usize, char)]) -> bool {
    for &(_, c) in rest {
        match c {
            '\n' => return true,
            ' ' | '\t' | '\r' => continue,
            _ => return false,
        }
    }
    false
}

fn push_trimmed<'a>(page: &'a str, start: usize, end: usize, out: &mut Vec<Segment<'a>>) {
    if start >= end {
        return;
    }
    let raw = &page[start..end];
    let lead = raw.len() - raw.trim_start().len();
    let text = raw.trim();
    if text.is_empty() {
        return;
    }
    let char_start = start + lead;
    out.push(Segment {
        char_start,
        char_end: char_start + text.len(),
        text,
    });
}
