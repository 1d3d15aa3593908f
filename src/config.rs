use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Candidates considered by `ask`.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Candidates considered by `ask/stream`.
    #[serde(default = "default_stream_top_k")]
    pub stream_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            stream_top_k: default_stream_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_stream_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    /// Delay before each streamed token, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl StreamConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

fn default_pacing_ms() -> u64 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.stream_top_k < 1 {
        anyhow::bail!("retrieval.stream_top_k must be >= 1");
    }
    if config.server.max_upload_bytes == 0 {
        anyhow::bail!("server.max_upload_bytes must be > 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<Config> {
        let cfg: Config = toml::from_str(s)?;
        validate(&cfg)?;
        Ok(cfg)
    }

    #[test]
    fn test_defaults_applied() {
        let cfg = parse(
            r#"
[db]
path = "./data/cite.sqlite"

[server]
bind = "127.0.0.1:8000"
"#,
        )
        .unwrap();
        assert_eq!(cfg.retrieval.top_k, 5);
        assert_eq!(cfg.retrieval.stream_top_k, 3);
        assert_eq!(cfg.stream.pacing(), Duration::from_millis(50));
        assert_eq!(cfg.server.max_upload_bytes, 25 * 1024 * 1024);
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let err = parse(
            r#"
[db]
path = "x.sqlite"

[retrieval]
top_k = 0

[server]
bind = "127.0.0.1:8000"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn test_missing_server_section_fails() {
        assert!(parse("[db]\npath = \"x.sqlite\"\n").is_err());
    }
}
