//! Document ingestion and index maintenance.
//!
//! Uploads are extracted into pages, stored, and then the whole index is
//! rebuilt from the full stored set. The stored set is read while holding
//! the index writer, so a slow rebuild can never publish a document set
//! older than one already published.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::extract::{extract_pages, ExtractError};
use crate::index::{IndexHandle, SentenceIndex};
use crate::migrate;
use crate::store;

/// A file received for ingestion.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Extract and store every upload, then reindex. Returns the new ids in
/// upload order.
///
/// All files are extracted before anything is stored, and all documents are
/// stored in one transaction, so a failure anywhere leaves the store and the
/// index untouched.
pub async fn ingest_uploads(
    pool: &SqlitePool,
    index: &IndexHandle,
    uploads: Vec<Upload>,
) -> Result<Vec<i64>> {
    // pdf-extract is CPU bound
    let extracted = tokio::task::spawn_blocking(move || {
        uploads
            .into_iter()
            .map(|u| extract_pages(&u.filename, &u.bytes).map(|pages| (u.filename, pages)))
            .collect::<Result<Vec<_>, ExtractError>>()
    })
    .await??;

    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(extracted.len());
    for (filename, pages) in &extracted {
        ids.push(store::insert_document(&mut *tx, filename, pages).await?);
    }
    tx.commit().await?;

    for ((filename, pages), id) in extracted.iter().zip(&ids) {
        tracing::info!(document_id = id, filename = %filename, pages = pages.len(), "stored document");
    }

    reindex_all(pool, index).await?;
    Ok(ids)
}

/// Rebuild the index from every stored document.
///
/// The build runs on a blocking thread; the writer lock is held throughout.
pub async fn reindex_all(pool: &SqlitePool, index: &IndexHandle) -> Result<Arc<SentenceIndex>> {
    let writer = index.begin_rebuild().await;
    let docs = store::load_all_pages(pool).await?;
    let version = writer.next_version();
    let built = tokio::task::spawn_blocking(move || SentenceIndex::build(&docs, version)).await?;
    Ok(writer.install(built))
}

/// Open the store, migrate it, and build an index over its contents.
pub async fn open_index(config: &Config) -> Result<(SqlitePool, IndexHandle)> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;
    let handle = IndexHandle::new();
    reindex_all(&pool, &handle).await?;
    Ok((pool, handle))
}

/// CLI entry point for `cite ingest`.
pub async fn run_ingest(config: &Config, paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
        anyhow::bail!("no files given");
    }

    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        uploads.push(Upload { filename, bytes });
    }

    let filenames: Vec<String> = uploads.iter().map(|u| u.filename.clone()).collect();
    let (pool, handle) = open_index(config).await?;
    let ids = ingest_uploads(&pool, &handle, uploads).await?;
    let index = handle.snapshot();
    pool.close().await;

    for (filename, id) in filenames.iter().zip(&ids) {
        println!("Ingested {} as document {}", filename, id);
    }
    println!(
        "Index: {} documents, {} sentences, {} terms",
        index.document_count(),
        index.unit_count(),
        index.term_count()
    );
    Ok(())
}

/// CLI entry point for `cite list`.
pub async fn run_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;
    let docs = store::list_documents(&pool).await?;
    pool.close().await;

    if docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for d in docs {
        println!(
            "{}\t{}\t{} pages\t{}",
            d.id, d.filename, d.page_count, d.uploaded_at
        );
    }
    Ok(())
}
