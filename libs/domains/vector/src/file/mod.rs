//! Flat-file vector store with brute-force cosine search.
//!
//! Meant for hundreds to low thousands of records: every search scans all
//! rows and every mutation rewrites the whole file. One process should own a
//! given file; there is no cross-process locking.

mod format;
mod store;

pub use format::{HEADERS, NULL_VECTOR};
pub use store::FileVectorStore;
