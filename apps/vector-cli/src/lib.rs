//! Vector CLI
//!
//! Command-line front end over the vector domain: ingest documents, query
//! them, and inspect the backing store.
//!
//! ## Architecture
//!
//! ```text
//! vector-cli <command>
//!   ↓ (clap, env overrides)
//! commands::execute
//!   ↓
//! ┌─────────────┬──────────────────┐
//! │ Retriever   │ VectorStore      │
//! │ (add/query) │ (get/delete/...) │
//! └─────────────┴──────────────────┘
//!   ↓                  ↓
//! OpenAI API       CSV file / Qdrant
//! ```
//!
//! ## Modules
//!
//! - `cli`: Argument parsing and configuration overrides
//! - `commands`: Command execution and JSON output

pub mod cli;
pub mod commands;

// Re-export for convenience
pub use cli::{Cli, Commands};
pub use commands::{execute, run};
