//! Core library for testgen
//!
//! This crate implements the **Functional Core** of the testgen application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`testgen_core`** (this crate): Pure transformation functions and the
//!   code generation state store, with zero I/O
//! - **`testgen`**: GitHub access, LLM calls, the async pipeline, the CLI, and
//!   the HTTP server (the Imperative Shell)
//!
//! # Module Organization
//!
//! - [`files`]: The `(path, content)` records handed to the pipeline
//! - [`prompt`]: Renders file contents or a single summary into an LLM prompt
//! - [`summary`]: Turns the free-text summary response into indexed items
//! - [`state`]: Per-summary code generation lifecycle and the store that owns it
//! - [`tree`]: Repository tree responses to plain file path lists
//! - [`api`]: Request and response bodies shared by the server and its clients
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use testgen_core::{build_summary_prompt, parse_summaries, FileRecord};
//!
//! let files = vec![FileRecord::new("src/lib.rs", "pub fn add(a: i32, b: i32) -> i32 { a + b }")];
//! let prompt = build_summary_prompt(&files)?;
//!
//! // ... send `prompt` to a model ...
//! let items = parse_summaries("1. adds two numbers\n2. handles overflow");
//! assert_eq!(items.len(), 2);
//! ```

pub mod api;
pub mod error;
pub mod files;
pub mod prompt;
pub mod state;
pub mod summary;
pub mod tree;

pub use error::Error;
pub use files::FileRecord;
pub use prompt::{build_code_prompt, build_summary_prompt};
pub use state::{
    AttemptTicket, CodeGenerationState, CodeOutcome, CodeStatus, GenerationStore,
    ResolutionPolicy, RoundTicket, StoreSnapshot,
};
pub use summary::{parse_summaries, SummaryItem};
