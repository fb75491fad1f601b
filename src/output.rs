//! Values produced by a successful run.

use crate::progress::PipelineStage;
use serde::{Deserialize, Serialize};

/// What the oracle returned for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationResult {
    /// The populated template text, in the target language.
    pub translated_content: String,
    /// Prompt tokens reported by the provider (0 if unknown).
    #[serde(default, skip_serializing)]
    pub input_tokens: usize,
    /// Completion tokens reported by the provider (0 if unknown).
    #[serde(default, skip_serializing)]
    pub output_tokens: usize,
}

impl IntegrationResult {
    pub fn new(translated_content: impl Into<String>) -> Self {
        Self {
            translated_content: translated_content.into(),
            input_tokens: 0,
            output_tokens: 0,
        }
    }
}

/// The downloadable document handed back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    /// The translated content the artifact was built from.
    pub content: String,
    /// Encoded document bytes (a `.docx` package or UTF-8 text).
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
    /// Suggested file name for download.
    pub file_name: String,
}

/// Timing and token accounting for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub pdf_chars: usize,
    pub template_chars: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub extract_duration_ms: u64,
    pub oracle_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub artifact: Artifact,
    pub result: IntegrationResult,
    pub stats: RunStats,
    /// Every `(stage, percent)` the run passed through, ending at `Completed`.
    pub history: Vec<(PipelineStage, u8)>,
}
