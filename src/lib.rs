//! # doc-rag
//!
//! Ask questions about a single document. A document is extracted page by
//! page, cut into fixed-size chunks and stored as a named collection; a
//! question retrieves the most relevant chunks, wraps them in a constrained
//! prompt and sends that to an OpenAI-compatible completion endpoint.
//!
//! ## Architecture
//!
//! ```text
//!            index                                  ask
//! ┌──────────┐   ┌─────────┐   ┌──────────┐   ┌───────────┐   ┌────────┐   ┌────────────┐
//! │ Document │──▶│ Chunker │──▶│  Index   │──▶│ Retriever │──▶│ Prompt │──▶│ Completion │
//! │ PDF/OOXML│   │ extract │   │  Store   │   │   top-k   │   │ builder│   │  service   │
//! └──────────┘   └─────────┘   └──────────┘   └───────────┘   └────────┘   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docrag init
//! docrag index guide.pdf --collection oxford
//! docrag ask "How old is Oxford University?" --collection oxford
//! docrag serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`extract`] | PDF / DOCX / PPTX text extraction |
//! | [`chunk`] | Fixed-width chunking |
//! | [`store`] | Index store trait, SQLite and in-memory stores |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`retrieve`] | Top-k retrieval |
//! | [`prompt`] | Prompt template and fallback sentence |
//! | [`completion`] | Completion service client |
//! | [`pipeline`] | `index` and `ask` |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod ask;
pub mod chunk;
pub mod collections;
pub mod completion;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod retrieve;
pub mod server;
pub mod status;
pub mod store;

pub use error::RagError;
