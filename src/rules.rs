//! Heuristic contract field extraction and risk audit.
//!
//! Both passes are plain regular expressions over page text. Field
//! extraction looks at the opening pages for core metadata and at the
//! closing pages for signature blocks. The audit scans the whole document.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::Serialize;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::store;

/// Pages scanned for core metadata.
const METADATA_PAGES: usize = 8;
/// Pages scanned for party names.
const PARTY_PAGES: usize = 3;
/// Trailing pages scanned for signature blocks.
const SIGNATURE_PAGES: usize = 3;
/// Lines kept from a signature marker onward.
const SIGNATURE_LINES: usize = 4;
/// Bytes of context on each side of an audit match.
const SNIPPET_CONTEXT: usize = 80;
/// Auto-renewal notice periods shorter than this are high severity.
const SHORT_NOTICE_DAYS: u32 = 30;

// ============================================================================
// Patterns
// ============================================================================

static EFFECTIVE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:Effective Date|Effective as of|Effective)\s*[:\-]?\s*(\w+\s+\d{1,2},\s*\d{4}|\d{1,2}/\d{1,2}/\d{2,4})",
    )
    .expect("effective date pattern should compile")
});

static LAWS_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\blaws\s+of\s+(?:the\s+)?([A-Za-z][A-Za-z ,&.]*)")
        .expect("laws-of pattern should compile")
});

static GOVERNING_LAW_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bgoverning\s+law\s*[:\-]\s*([A-Za-z][A-Za-z ,&.]*)")
        .expect("governing law pattern should compile")
});

static TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bterm\s+of\s+(\w+(?:\s+\(\d+\))?\s+(?:years?|months?|days?))\b")
        .expect("term pattern should compile")
});

static PAYMENT_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bnet\s*\d{1,3}\b|\bwithin\s+\d{1,3}\s+days\s+(?:of|after|from)\s+(?:the\s+)?(?:receipt\s+of\s+)?(?:the\s+|an\s+|each\s+)?invoice\w*",
    )
    .expect("payment terms pattern should compile")
});

static TERMINATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bterminat\w*[^.\n]{0,80}?(\d{1,3}\s*days?['’]?\s+(?:prior\s+)?(?:written\s+)?notice)",
    )
    .expect("termination pattern should compile")
});

static AUTO_RENEWAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:auto-?\s?renew(?:al|s|ed)?|renews?\s+automatically|automatically\s+renews?|renewal\s+term)\b")
        .expect("auto-renewal pattern should compile")
});

static CONFIDENTIALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:confidential|confidentiality|non-?disclos\w*)\b")
        .expect("confidentiality pattern should compile")
});

static INDEMNITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:indemnif\w*|hold\s+harmless)\b").expect("indemnity pattern should compile")
});

static UNLIMITED_LIABILITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bunlimited\s+liability\b|\bno\s+limit\b")
        .expect("unlimited liability pattern should compile")
});

static LIABILITY_CAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\blimit(?:ed)?\s+(?:liability\s+)?(?:to\s+)?(USD|\$|EUR|INR|Rs\.?)?\s*(\d[\d.,]*)")
        .expect("liability cap pattern should compile")
});

static BETWEEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)\bbetween\s+(.+?)\s+and\s+(.+?)\s*(?:[.;(]|,\s*(?:effective|dated)|$)")
        .expect("parties pattern should compile")
});

static SIGNATURE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)signed|signature|sign(?:ed)?\s+by").expect("signature pattern should compile")
});

static NOTICE_DAYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)notice[^\n]*?(\d{1,3})\s*days?\b|(\d{1,3})\s*days?['’]?\s+(?:prior\s+)?(?:written\s+)?notice",
    )
    .expect("notice pattern should compile")
});

// ============================================================================
// Field extraction
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiabilityCap {
    /// `None` when the matched figure is not a number.
    pub amount: Option<f64>,
    /// Currency marker as written, or empty.
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signatory {
    pub raw: String,
}

/// Structured fields recovered from a contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContractFields {
    pub parties: Vec<String>,
    pub effective_date: Option<String>,
    pub term: Option<String>,
    pub governing_law: Option<String>,
    pub payment_terms: Option<String>,
    pub termination: Option<String>,
    pub auto_renewal: Option<String>,
    pub confidentiality: Option<String>,
    pub indemnity: Option<String>,
    pub liability_cap: Option<LiabilityCap>,
    pub signatories: Vec<Signatory>,
}

pub fn extract_fields(pages: &[String]) -> ContractFields {
    let head = pages[..pages.len().min(METADATA_PAGES)].join("\n");

    ContractFields {
        parties: find_parties(pages),
        effective_date: capture(&EFFECTIVE_DATE, &head, 1),
        term: capture(&TERM, &head, 1),
        governing_law: find_governing_law(&head),
        payment_terms: capture(&PAYMENT_TERMS, &head, 0),
        termination: capture(&TERMINATION, &head, 1),
        auto_renewal: AUTO_RENEWAL.is_match(&head).then(|| "mentioned".to_string()),
        confidentiality: CONFIDENTIALITY.is_match(&head).then(|| "present".to_string()),
        indemnity: INDEMNITY.is_match(&head).then(|| "present".to_string()),
        liability_cap: find_liability_cap(&head),
        signatories: find_signatories(pages),
    }
}

fn capture(re: &Regex, text: &str, group: usize) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(group))
        .map(|m| m.as_str().trim().to_string())
}

fn find_governing_law(text: &str) -> Option<String> {
    capture(&LAWS_OF, text, 1)
        .or_else(|| capture(&GOVERNING_LAW_HEADING, text, 1))
        .map(|s| s.trim_end_matches([' ', ',', '.']).to_string())
        .filter(|s| !s.is_empty())
}

fn find_liability_cap(text: &str) -> Option<LiabilityCap> {
    let caps = LIABILITY_CAP.captures(text)?;
    let currency = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
    let amount = caps.get(2).and_then(|m| {
        m.as_str()
            .trim_end_matches(['.', ','])
            .replace(',', "")
            .parse::<f64>()
            .ok()
    });
    Some(LiabilityCap {
        amount,
        currency: currency.to_string(),
    })
}

fn find_parties(pages: &[String]) -> Vec<String> {
    let mut parties = Vec::new();
    for page in pages.iter().take(PARTY_PAGES) {
        for caps in BETWEEN.captures_iter(page) {
            for group in [1, 2] {
                if let Some(m) = caps.get(group) {
                    push_unique(&mut parties, m.as_str().trim().trim_end_matches(','));
                }
            }
        }
        if !parties.is_empty() {
            break;
        }
    }
    parties
}

fn find_signatories(pages: &[String]) -> Vec<Signatory> {
    let start = pages.len().saturating_sub(SIGNATURE_PAGES);
    let mut raw = Vec::new();
    for page in &pages[start..] {
        let lines: Vec<&str> = page
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        for (i, line) in lines.iter().enumerate() {
            if SIGNATURE_MARKER.is_match(line) {
                let end = (i + SIGNATURE_LINES).min(lines.len());
                for nearby in &lines[i..end] {
                    push_unique(&mut raw, nearby);
                }
            }
        }
    }
    raw.into_iter().map(|raw| Signatory { raw }).collect()
}

fn push_unique(out: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !out.iter().any(|v| v == value) {
        out.push(value.to_string());
    }
}

// ============================================================================
// Audit
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evidence {
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditFinding {
    pub issue: String,
    pub severity: Severity,
    pub evidence: Evidence,
}

impl AuditFinding {
    fn new(issue: &str, severity: Severity, snippet: String) -> Self {
        Self {
            issue: issue.to_string(),
            severity,
            evidence: Evidence { snippet },
        }
    }
}

/// Check a document for risky clauses. Findings come out in a fixed order:
/// auto-renewal, unlimited liability, indemnity.
pub fn audit(pages: &[String]) -> Vec<AuditFinding> {
    let joined = pages.join("\n");
    let mut findings = Vec::new();

    if let Some(renewal) = AUTO_RENEWAL.find(&joined) {
        match notice_days(&joined) {
            Some((days, start, end)) if days < SHORT_NOTICE_DAYS => findings.push(AuditFinding::new(
                "Auto-renewal with short notice",
                Severity::High,
                snippet(&joined, start, end),
            )),
            Some((_, start, end)) => findings.push(AuditFinding::new(
                "Auto-renewal found",
                Severity::Medium,
                snippet(&joined, start, end),
            )),
            None => findings.push(AuditFinding::new(
                "Auto-renewal clause found (notice period not specified)",
                Severity::Medium,
                snippet(&joined, renewal.start(), renewal.end()),
            )),
        }
    }

    if let Some(m) = UNLIMITED_LIABILITY.find(&joined) {
        findings.push(AuditFinding::new(
            "Potential unlimited liability",
            Severity::High,
            snippet(&joined, m.start(), m.end()),
        ));
    }

    if let Some(m) = INDEMNITY.find(&joined) {
        findings.push(AuditFinding::new(
            "Indemnity / Hold harmless clause present",
            Severity::Medium,
            snippet(&joined, m.start(), m.end()),
        ));
    }

    findings
}

/// First notice period in days, with the byte range of the phrase.
fn notice_days(text: &str) -> Option<(u32, usize, usize)> {
    let caps = NOTICE_DAYS.captures(text)?;
    let whole = caps.get(0)?;
    let days = caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()?;
    Some((days, whole.start(), whole.end()))
}

/// `text[start..end]` widened by [`SNIPPET_CONTEXT`] bytes on each side,
/// clamped to the text and to char boundaries.
fn snippet(text: &str, start: usize, end: usize) -> String {
    let mut lo = start.saturating_sub(SNIPPET_CONTEXT);
    while !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (end + SNIPPET_CONTEXT).min(text.len());
    while !text.is_char_boundary(hi) {
        hi += 1;
    }
    text[lo..hi].trim().to_string()
}

// ============================================================================
// CLI
// ============================================================================

async fn load_pages(config: &Config, document_id: i64) -> Result<Vec<String>> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;
    let pages = store::get_pages(&pool, document_id).await?;
    pool.close().await;
    pages.ok_or_else(|| anyhow::anyhow!("Document {} not found", document_id))
}

/// CLI entry point for `cite extract`.
pub async fn run_extract(config: &Config, document_id: i64) -> Result<()> {
    let pages = load_pages(config, document_id).await?;
    let fields = extract_fields(&pages);
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

/// CLI entry point for `cite audit`.
pub async fn run_audit(config: &Config, document_id: i64) -> Result<()> {
    let pages = load_pages(config, document_id).await?;
    let findings = audit(&pages);
    println!("{}", serde_json::to_string_pretty(&findings)?);
    Ok(())
}
