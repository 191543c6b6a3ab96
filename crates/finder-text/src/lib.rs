//! finder-text
//!
//! BM25 keyword index for one conversation. Documents are tokenized by
//! `tokenize::tokenize`, fed to an in-memory Tantivy index as pre-tokenized
//! text, and persisted as a JSON snapshot of documents plus token lists. The
//! Tantivy index is derived state and is rebuilt on load and on every mutation.

pub mod tantivy_utils;
pub mod tokenize;
pub mod index;

pub use index::{KeywordIndex, SNAPSHOT_FILE};
pub use tokenize::{tokenize, STOP_WORDS};
