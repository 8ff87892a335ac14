//! # Chroma Viewer
//!
//! An interactive command-line viewer for a remote ChromaDB server. It connects
//! with HTTP basic auth, lists collections, and previews sampled records
//! (identifiers, documents and metadata) as styled tables.
//!
//! ## Modules
//!
//! - `db`: the vector store capability and its Chroma HTTP implementation
//! - `session`: list/peek/describe operations that report their own failures
//! - `console`: the output sink and terminal rendering
//! - `repl`: the numbered-menu loop
//! - `config`: viewer settings from `~/.chroma-viewer/config.toml` and the environment
//! - `logging`: tracing setup

pub mod config;
pub mod console;
pub mod db;
pub mod logging;
pub mod repl;
pub mod session;

pub use config::Settings;
pub use db::{ChromaClient, VectorStore};
pub use session::Session;
