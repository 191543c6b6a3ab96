//! Vector Index on LanceDB.
//!
//! One table per conversation (`chat_<conversation>`), cosine distance, with a
//! JSON document cache alongside. Similarity is reported as `1 - distance`.

pub mod cache;
pub mod index;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use cache::{DocumentCache, CACHE_FILE};
pub use index::{delete_store, LanceVectorIndex, LANCE_DIR};
pub use search::VectorFilter;
