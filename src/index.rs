//! Inverted index over sentence units, published by atomic swap.
//!
//! A [`SentenceIndex`] is immutable once built. [`IndexHandle`] owns the
//! current one behind an `Arc`: readers clone the `Arc` and keep a
//! consistent snapshot for as long as they need it, while a rebuild
//! constructs a complete new index off to the side and replaces the pointer
//! in one step. Rebuilds are serialized through a writer lock, so two
//! uploads can never race to publish.
//!
//! # Layout
//!
//! Units are stored in `(document_id, page_index, char_start)` order.
//! Postings refer to units by position in that list and carry the term's
//! frequency within the unit, which is everything the retriever needs to
//! compute `tf × idf` without touching the text again.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, MutexGuard};

use crate::models::SentenceUnit;
use crate::segment::segment;
use crate::tokenize::normalize;

/// Document id → ordered page texts.
pub type DocumentSet = BTreeMap<i64, Vec<String>>;

/// One occurrence record of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    /// Position of the unit in [`SentenceIndex::units`].
    pub unit: usize,
    /// Number of times the term occurs in the unit.
    pub tf: u32,
}

/// Immutable, fully built index for one version of the document set.
#[derive(Debug, Default)]
pub struct SentenceIndex {
    version: u64,
    pages: DocumentSet,
    units: Vec<SentenceUnit>,
    postings: HashMap<String, Vec<Posting>>,
}

impl SentenceIndex {
    /// An index with no documents. Every query against it returns no hits.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Segment, normalize, and post every page of `docs`.
    pub fn build(docs: &DocumentSet, version: u64) -> Self {
        let mut units = Vec::new();
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();

        for (&document_id, pages) in docs {
            for (page_index, page) in pages.iter().enumerate() {
                for seg in segment(page) {
                    let unit_pos = units.len();

                    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
                    for term in normalize(seg.text) {
                        *counts.entry(term).or_insert(0) += 1;
                    }
                    for (term, tf) in counts {
                        postings.entry(term).or_default().push(Posting { unit: unit_pos, tf });
                    }

                    units.push(SentenceUnit {
                        document_id,
                        page_index,
                        char_start: seg.char_start,
                        char_end: seg.char_end,
                        text: seg.text.to_string(),
                    });
                }
            }
        }

        Self {
            version,
            pages: docs.clone(),
            units,
            postings,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn units(&self) -> &[SentenceUnit] {
        &self.units
    }

    pub fn unit(&self, pos: usize) -> Option<&SentenceUnit> {
        self.units.get(pos)
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn document_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Postings for `term`, empty when the term is unknown.
    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of units containing `term`.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings(term).len()
    }

    /// Raw text of one page, as indexed.
    pub fn page_text(&self, document_id: i64, page_index: usize) -> Option<&str> {
        self.pages
            .get(&document_id)
            .and_then(|pages| pages.get(page_index))
            .map(String::as_str)
    }
}

/// Owner of the current [`SentenceIndex`].
pub struct IndexHandle {
    current: RwLock<Arc<SentenceIndex>>,
    /// Last published version; holding the lock makes the holder the only writer.
    writer: Mutex<u64>,
}

impl IndexHandle {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(SentenceIndex::empty())),
            writer: Mutex::new(0),
        }
    }

    /// The index as of now. Later rebuilds do not affect the returned value.
    pub fn snapshot(&self) -> Arc<SentenceIndex> {
        self.current.read().clone()
    }

    /// Rebuild from `docs` and publish. Waits for any rebuild in progress.
    pub async fn index_documents(&self, docs: &DocumentSet) -> Arc<SentenceIndex> {
        self.begin_rebuild().await.publish(docs)
    }

    /// Acquire exclusive rebuild rights.
    ///
    /// Callers that need to load the document set themselves should load it
    /// while holding the returned writer, so the set they publish is never
    /// older than one published by a concurrent rebuild.
    pub async fn begin_rebuild(&self) -> IndexWriter<'_> {
        IndexWriter {
            handle: self,
            version: self.writer.lock().await,
        }
    }
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive right to publish the next index version.
pub struct IndexWriter<'a> {
    handle: &'a IndexHandle,
    version: MutexGuard<'a, u64>,
}

impl IndexWriter<'_> {
    /// Version the next published index will carry.
    pub fn next_version(&self) -> u64 {
        *self.version + 1
    }

    /// Build a new index from `docs` and swap it in.
    pub fn publish(self, docs: &DocumentSet) -> Arc<SentenceIndex> {
        let index = SentenceIndex::build(docs, self.next_version());
        self.install(index)
    }

    /// Swap in an index built elsewhere, e.g. on a blocking thread. Its
    /// version is overwritten with [`next_version`](Self::next_version).
    pub fn install(mut self, mut index: SentenceIndex) -> Arc<SentenceIndex> {
        let next = self.next_version();
        index.version = next;
        let index = Arc::new(index);
        *self.handle.current.write() = index.clone();
        *self.version = next;

        tracing::info!(
            version = next,
            documents = index.document_count(),
            units = index.unit_count(),
            terms = index.term_count(),
            "published sentence index"
        );
        index
    }
}
