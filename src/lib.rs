//! # lingualeap
//!
//! Populate a target-language document template with the names, numbers
//! and other literal values found in a source PDF, using a generative
//! language model as the "translation oracle".
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF + template
//!  │
//!  ├─ 1. Extract   first-page PDF text (pdfium) + raw template text (OOXML)
//!  ├─ 2. Request   validate and package {pdfText, templateText, targetLanguage}
//!  ├─ 3. Oracle    one LLM call → {"translatedContent": ...}
//!  └─ 4. Assemble  .docx or .txt artifact with a suggested file name
//! ```
//!
//! Every run walks a small state machine (see [`progress`]) whose stage and
//! percent are reported to an optional [`ProgressObserver`]. A failed run
//! carries a [`FailureKind`] that tells the caller whether trying again can
//! help.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lingualeap::{populate_files, IntegrationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / ...
//!     let config = IntegrationConfig::default();
//!     let output = populate_files("id-card.pdf", "form.docx", "Spanish", &config).await?;
//!     std::fs::write(&output.artifact.file_name, &output.artifact.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum HTTP surface (`POST /api/process`, `GET /health`) |
//! | `cli`    | on      | The `lingualeap` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable both when using only the library:
//! ```toml
//! lingualeap = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod boundary;
pub mod config;
pub mod document;
pub mod error;
pub mod integrate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use boundary::{process_inbound, InboundRequest, OutboundResponse};
pub use config::{ArtifactFormat, IntegrationConfig, IntegrationConfigBuilder};
pub use document::{
    DocumentInput, DocumentKind, ExtractedText, IntegrationRequest, SourceDocument,
    TemplateDocument,
};
pub use error::{FailureKind, IntegrationError};
pub use integrate::{
    populate_files, populate_sync, populate_to_file, write_artifact, Integrator, RunRequest,
};
pub use output::{Artifact, IntegrationResult, RunOutput, RunStats};
pub use pipeline::assemble::{assemble, suggested_file_name};
pub use pipeline::extract::{DocumentExtractor, Extractor};
pub use pipeline::oracle::{OracleClient, OracleReply, OracleTransport, TransportError};
pub use pipeline::request::build_request;
pub use progress::{
    NoopProgressObserver, PipelineRun, PipelineStage, ProgressCallback, ProgressObserver,
    RunFailure,
};
