//! # clausecite
//!
//! Question answering over uploaded contracts where every answer carries a
//! citation that reproduces the quoted text exactly: document id, page, and
//! byte range on that page.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────────┐
//! │ Uploads  │──▶│  SQLite  │──▶│ SentenceIndex  │ (rebuilt, then swapped in)
//! │ PDF/TXT  │   │  pages   │   │ segment+tokens │
//! └──────────┘   └──────────┘   └───────┬────────┘
//!                                       │ retrieve
//!                                       ▼
//!                       ┌──────────────────────────────┐
//!                       │ span → citation → answer     │
//!                       └──────┬────────────────┬──────┘
//!                              ▼                ▼
//!                         ┌────────┐      ┌──────────┐
//!                         │  CLI   │      │   HTTP   │ (JSON + SSE)
//!                         │ (cite) │      └──────────┘
//!                         └────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`tokenize`] | Term normalization, stop words, stemming |
//! | [`segment`] | Sentence segmentation with exact offsets |
//! | [`index`] | Inverted sentence index and copy-then-swap publishing |
//! | [`retrieve`] | TF-IDF sentence ranking |
//! | [`span`] | Minimal answer window inside a sentence |
//! | [`citation`] | Checked page-absolute citations |
//! | [`answer`] | Question answering pipeline |
//! | [`stream`] | Paced, cancellable token streaming |
//! | [`extract`] | Per-page text from PDF and plain text |
//! | [`store`] | Document storage |
//! | [`ingest`] | Upload handling and reindexing |
//! | [`rules`] | Heuristic field extraction and audit |
//! | [`server`] | HTTP API |
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod answer;
pub mod citation;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod retrieve;
pub mod rules;
pub mod segment;
pub mod server;
pub mod span;
pub mod store;
pub mod stream;
pub mod tokenize;
