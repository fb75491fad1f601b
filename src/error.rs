//! Error types for the lingualeap library.
//!
//! Every failure a pipeline run can hit is an [`IntegrationError`]. Each
//! variant maps onto exactly one [`FailureKind`], the coarse, serialisable
//! classification that survives to the response boundary and tells callers
//! whether re-running the pipeline can help.
//!
//! | Kind | Typical cause | Retryable |
//! |------|---------------|-----------|
//! | `validation_failure` | missing file, blank target language | no |
//! | `extraction_failure` | corrupt PDF, not a `.docx` | no |
//! | `oracle_unavailable` | network error, 5xx, 429, timeout | **yes** |
//! | `oracle_contract_failure` | model reply lacks `translatedContent` | no |
//! | `oracle_rejected` | policy / content-filter / bad request | no |
//! | `assembly_failure` | empty output, packaging failed | no |

use crate::document::DocumentKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the lingualeap library.
#[derive(Debug, Error)]
pub enum IntegrationError {
    // ── Caller errors ─────────────────────────────────────────────────────
    /// A required field was missing or blank.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Extraction ────────────────────────────────────────────────────────
    /// The decoder could not read the bytes as the declared format.
    #[error("Could not extract text from the {kind}: {reason}")]
    Extraction { kind: DocumentKind, reason: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (or --pdfium-lib) to use an existing copy,\n\
or install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Oracle ────────────────────────────────────────────────────────────
    /// The oracle could not be reached, or the call timed out.
    #[error("Translation service unavailable: {detail}")]
    OracleUnavailable { detail: String },

    /// The oracle answered, but without the required `translatedContent`.
    #[error("Translation service returned an unusable reply: {detail}")]
    OracleContract { detail: String },

    /// The oracle declined the request (policy, safety, or request validation).
    #[error("Translation service rejected the request: {detail}")]
    OracleRejected { detail: String },

    // ── Assembly ──────────────────────────────────────────────────────────
    /// The translated content could not be packaged as a document.
    #[error("Could not assemble the output document: {0}")]
    Assembly(String),

    // ── Configuration ─────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`IntegrationError`].
///
/// Serialised in `snake_case` (`"oracle_unavailable"`) on the response
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ValidationFailure,
    ExtractionFailure,
    OracleUnavailable,
    OracleContractFailure,
    OracleRejected,
    AssemblyFailure,
    ConfigurationFailure,
    IoFailure,
    InternalFailure,
}

impl FailureKind {
    /// Whether re-running the whole pipeline might succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::OracleUnavailable)
    }

    /// Stable machine-readable name, identical to the serialised form.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::ValidationFailure => "validation_failure",
            FailureKind::ExtractionFailure => "extraction_failure",
            FailureKind::OracleUnavailable => "oracle_unavailable",
            FailureKind::OracleContractFailure => "oracle_contract_failure",
            FailureKind::OracleRejected => "oracle_rejected",
            FailureKind::AssemblyFailure => "assembly_failure",
            FailureKind::ConfigurationFailure => "configuration_failure",
            FailureKind::IoFailure => "io_failure",
            FailureKind::InternalFailure => "internal_failure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IntegrationError {
    /// The failure kind this error belongs to.
    pub fn kind(&self) -> FailureKind {
        match self {
            IntegrationError::Validation(_)
            | IntegrationError::FileNotFound { .. }
            | IntegrationError::PermissionDenied { .. } => FailureKind::ValidationFailure,
            IntegrationError::DownloadFailed { .. } | IntegrationError::DownloadTimeout { .. } => {
                FailureKind::IoFailure
            }
            IntegrationError::Extraction { .. } => FailureKind::ExtractionFailure,
            IntegrationError::PdfiumBindingFailed(_)
            | IntegrationError::ProviderNotConfigured { .. }
            | IntegrationError::InvalidConfig(_) => FailureKind::ConfigurationFailure,
            IntegrationError::OracleUnavailable { .. } => FailureKind::OracleUnavailable,
            IntegrationError::OracleContract { .. } => FailureKind::OracleContractFailure,
            IntegrationError::OracleRejected { .. } => FailureKind::OracleRejected,
            IntegrationError::Assembly(_) => FailureKind::AssemblyFailure,
            IntegrationError::OutputWriteFailed { .. } => FailureKind::IoFailure,
            IntegrationError::Internal(_) => FailureKind::InternalFailure,
        }
    }

    /// Shorthand for `self.kind().is_retryable()`.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
