use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const MSA: &str = "MASTER SERVICES AGREEMENT\n\
This Agreement is made between Acme Corp. and Beta Widgets LLC.\n\
Effective Date: January 5, 2024\n\x0c\
This Agreement may be terminated with 15 days notice.\n\n\
This Agreement shall auto-renew for successive one year terms.\n\n\
Supplier shall indemnify the Customer against third party claims.\n\
This Agreement is governed by the laws of the State of Delaware.\n";

const NDA: &str = "MUTUAL NONDISCLOSURE AGREEMENT\n\n\
Each party shall protect Confidential Information using reasonable care.\n\
Obligations survive for three years after disclosure.\n";

fn cite_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cite");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(files_dir.join("msa.txt"), MSA).unwrap();
    fs::write(files_dir.join("nda.txt"), NDA).unwrap();
    fs::write(files_dir.join("scan.docx"), "PK not supported").unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/cite.sqlite"

[retrieval]
top_k = 5

[server]
bind = "127.0.0.1:7339"
"#,
        root.display()
    );

    let config_path = config_dir.join("cite.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_cite(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = cite_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run cite binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn ingest_samples(tmp: &TempDir, config: &Path) {
    let msa = tmp.path().join("files/msa.txt");
    let nda = tmp.path().join("files/nda.txt");
    let (stdout, stderr, ok) = run_cite(
        config,
        &["ingest", msa.to_str().unwrap(), nda.to_str().unwrap()],
    );
    assert!(ok, "ingest failed: {}", stderr);
    assert!(stdout.contains("Ingested msa.txt as document 1"), "{}", stdout);
    assert!(stdout.contains("Ingested nda.txt as document 2"), "{}", stdout);
}

/// Parse `[document D / page P / chars S..E]` from `cite ask` output.
fn parse_citation(stdout: &str) -> (i64, usize, usize, usize) {
    let line = stdout
        .lines()
        .find(|l| l.trim_start().starts_with("[document"))
        .unwrap_or_else(|| panic!("no citation in output: {}", stdout));
    let inner = line.trim().trim_start_matches('[').trim_end_matches(']');
    let parts: Vec<&str> = inner.split(" / ").collect();
    let doc = parts[0].trim_start_matches("document ").parse().unwrap();
    let page = parts[1].trim_start_matches("page ").parse().unwrap();
    let (s, e) = parts[2].trim_start_matches("chars ").split_once("..").unwrap();
    (doc, page, s.parse().unwrap(), e.parse().unwrap())
}

#[test]
fn test_init_creates_database() {
    let (tmp, config) = setup_test_env();
    let (stdout, stderr, ok) = run_cite(&config, &["init"]);
    assert!(ok, "init failed: {}", stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/cite.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config) = setup_test_env();
    let (_, _, ok1) = run_cite(&config, &["init"]);
    let (_, _, ok2) = run_cite(&config, &["init"]);
    assert!(ok1 && ok2);
}

#[test]
fn test_ingest_and_list() {
    let (tmp, config) = setup_test_env();
    ingest_samples(&tmp, &config);

    let (stdout, stderr, ok) = run_cite(&config, &["list"]);
    assert!(ok, "list failed: {}", stderr);
    assert!(stdout.contains("1\tmsa.txt\t2 pages"), "{}", stdout);
    assert!(stdout.contains("2\tnda.txt\t1 pages"), "{}", stdout);
}

#[test]
fn test_ingest_rejects_unsupported_file() {
    let (tmp, config) = setup_test_env();
    let docx = tmp.path().join("files/scan.docx");
    let (_, stderr, ok) = run_cite(&config, &["ingest", docx.to_str().unwrap()]);
    assert!(!ok);
    assert!(stderr.contains("unsupported file type"), "{}", stderr);

    let (stdout, _, _) = run_cite(&config, &["list"]);
    assert!(stdout.contains("No documents."));
}

#[test]
fn test_ask_notice_period_cites_exact_span() {
    let (tmp, config) = setup_test_env();
    ingest_samples(&tmp, &config);

    let (stdout, stderr, ok) = run_cite(&config, &["ask", "termination notice period"]);
    assert!(ok, "ask failed: {}", stderr);
    assert!(stdout.contains("15 days notice"), "{}", stdout);

    let (doc, page, start, end) = parse_citation(&stdout);
    assert_eq!(doc, 1);
    assert_eq!(page, 1);

    let page_text = MSA.split('\x0c').nth(1).unwrap();
    let cited = &page_text[start..end];
    assert!(cited.contains("15 days notice"));
    assert_eq!(stdout.lines().next().unwrap(), cited);
}

#[test]
fn test_ask_deterministic() {
    let (tmp, config) = setup_test_env();
    ingest_samples(&tmp, &config);

    let (out1, _, _) = run_cite(&config, &["ask", "confidential information care"]);
    let (out2, _, _) = run_cite(&config, &["ask", "confidential information care"]);
    assert_eq!(out1, out2);
    assert!(out1.contains("Confidential Information"));
}

#[test]
fn test_ask_empty_query_errors() {
    let (tmp, config) = setup_test_env();
    ingest_samples(&tmp, &config);

    let (_, stderr, ok) = run_cite(&config, &["ask", "   "]);
    assert!(!ok);
    assert!(stderr.contains("query must not be empty"), "{}", stderr);
}

#[test]
fn test_ask_empty_corpus_has_no_content() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, ok) = run_cite(&config, &["ask", "termination notice"]);
    assert!(ok, "ask failed: {}", stderr);
    assert!(stdout.contains("No relevant content found in uploaded documents."));
    assert!(!stdout.contains("[document"));
}

#[test]
fn test_search_ranks_sentences() {
    let (tmp, config) = setup_test_env();
    ingest_samples(&tmp, &config);

    let (stdout, stderr, ok) = run_cite(&config, &["search", "governing laws Delaware", "--limit", "2"]);
    assert!(ok, "search failed: {}", stderr);
    let first = stdout.lines().next().unwrap();
    assert!(first.starts_with("1. "), "{}", stdout);
    assert!(first.contains("document 1 / page 1"), "{}", stdout);
    assert!(stdout.contains("State of Delaware"));
    assert!(!stdout.contains("3. "));
}

#[test]
fn test_search_no_results() {
    let (tmp, config) = setup_test_env();
    ingest_samples(&tmp, &config);

    let (stdout, _, ok) = run_cite(&config, &["search", "xylophone"]);
    assert!(ok);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_extract_fields_json() {
    let (tmp, config) = setup_test_env();
    ingest_samples(&tmp, &config);

    let (stdout, stderr, ok) = run_cite(&config, &["extract", "1"]);
    assert!(ok, "extract failed: {}", stderr);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(v["effective_date"], "January 5, 2024");
    assert_eq!(v["governing_law"], "State of Delaware");
    assert_eq!(v["auto_renewal"], "mentioned");
    assert_eq!(v["indemnity"], "present");
    assert_eq!(v["parties"][0], "Acme Corp.");
}

#[test]
fn test_audit_findings_json() {
    let (tmp, config) = setup_test_env();
    ingest_samples(&tmp, &config);

    let (stdout, stderr, ok) = run_cite(&config, &["audit", "1"]);
    assert!(ok, "audit failed: {}", stderr);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let findings = v.as_array().unwrap();
    // Notice of 15 days plus auto-renewal, then indemnity
    assert_eq!(findings[0]["severity"], "HIGH");
    assert_eq!(findings[0]["issue"], "Auto-renewal with short notice");
    assert!(findings
        .iter()
        .any(|f| f["issue"] == "Indemnity / Hold harmless clause present"));
}

#[test]
fn test_extract_missing_document() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, ok) = run_cite(&config, &["extract", "42"]);
    assert!(!ok);
    assert!(stderr.contains("not found"), "{}", stderr);
}
