//! Document storage.
//!
//! Each uploaded document is one row holding its filename, upload time, and
//! page texts (as a JSON array). Ids are assigned by SQLite and never reused.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

use crate::index::DocumentSet;

/// Listing entry for a stored document.
#[derive(Debug, Clone, Serialize)]
pub struct StoredDocument {
    pub id: i64,
    pub filename: String,
    /// Upload time (ISO 8601).
    pub uploaded_at: String,
    pub page_count: usize,
}

/// Store a document's pages and return its new id.
///
/// Accepts a pool or an open transaction (`&mut *tx`), so a batch of
/// documents can be stored atomically.
pub async fn insert_document<'e, E>(executor: E, filename: &str, pages: &[String]) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let pages_json = serde_json::to_string(pages)?;
    let result = sqlx::query(
        "INSERT INTO documents (filename, uploaded_at, pages_json) VALUES (?, ?, ?)",
    )
    .bind(filename)
    .bind(Utc::now().timestamp())
    .bind(pages_json)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Pages of one document, or `None` if the id is unknown.
pub async fn get_pages(pool: &SqlitePool, id: i64) -> Result<Option<Vec<String>>> {
    let row = sqlx::query("SELECT pages_json FROM documents WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let pages_json: String = row.get("pages_json");
            let pages = serde_json::from_str(&pages_json)
                .with_context(|| format!("Corrupt pages for document {}", id))?;
            Ok(Some(pages))
        }
        None => Ok(None),
    }
}

/// Every stored document's pages, keyed by id.
pub async fn load_all_pages(pool: &SqlitePool) -> Result<DocumentSet> {
    let rows = sqlx::query("SELECT id, pages_json FROM documents ORDER BY id ASC")
        .fetch_all(pool)
        .await?;

    let mut set = DocumentSet::new();
    for row in rows {
        let id: i64 = row.get("id");
        let pages_json: String = row.get("pages_json");
        let pages: Vec<String> = serde_json::from_str(&pages_json)
            .with_context(|| format!("Corrupt pages for document {}", id))?;
        set.insert(id, pages);
    }
    Ok(set)
}

pub async fn list_documents(pool: &SqlitePool) -> Result<Vec<StoredDocument>> {
    let rows = sqlx::query("SELECT id, filename, uploaded_at, pages_json FROM documents ORDER BY id ASC")
        .fetch_all(pool)
        .await?;

    let mut docs = Vec::with_capacity(rows.len());
    for row in rows {
        let uploaded_at: i64 = row.get("uploaded_at");
        let pages_json: String = row.get("pages_json");
        let id: i64 = row.get("id");
        let pages: Vec<String> = serde_json::from_str(&pages_json)
            .with_context(|| format!("Corrupt pages for document {}", id))?;
        docs.push(StoredDocument {
            id,
            filename: row.get("filename"),
            uploaded_at: chrono::DateTime::from_timestamp(uploaded_at, 0)
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                .unwrap_or_else(|| uploaded_at.to_string()),
            page_count: pages.len(),
        });
    }
    Ok(docs)
}
