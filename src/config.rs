//! Configuration types for template population.
//!
//! All pipeline behaviour is controlled through [`IntegrationConfig`], built
//! via its [`IntegrationConfigBuilder`]. Credentials are not part of the
//! config: provider API keys are read from the environment when the
//! [`crate::pipeline::oracle::OracleClient`] is constructed, and a missing
//! key surfaces there as a configuration error.

use crate::error::IntegrationError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a template-population run.
///
/// # Example
/// ```rust
/// use lingualeap::{ArtifactFormat, IntegrationConfig};
///
/// let config = IntegrationConfig::builder()
///     .model("gemini-2.0-flash")
///     .artifact_format(ArtifactFormat::PlainText)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct IntegrationConfig {
    /// LLM model identifier, e.g. "gemini-2.0-flash", "gpt-4.1-mini".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Names and numbers must come through verbatim, so the model should
    /// stay close to deterministic.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Deadline for a single oracle call in seconds. Default: None.
    ///
    /// When unset the call is bounded only by the transport's own timeout.
    pub oracle_timeout_secs: Option<u64>,

    /// Whole-pipeline re-runs on a retryable failure, used by
    /// [`crate::integrate::Integrator::run_with_retry`]. Default: 0.
    pub max_retries: u32,

    /// Initial delay between re-runs in milliseconds (doubles each time). Default: 500.
    pub retry_backoff_ms: u64,

    /// Output packaging. Default: [`ArtifactFormat::Docx`].
    pub artifact_format: ArtifactFormat,

    /// Prefix of suggested artifact file names. Default: "LinguaLeap".
    pub file_name_prefix: String,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Explicit pdfium shared library. Falls back to `PDFIUM_LIB_PATH`,
    /// then the system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// Receives stage transitions of every run.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            system_prompt: None,
            oracle_timeout_secs: None,
            max_retries: 0,
            retry_backoff_ms: 500,
            artifact_format: ArtifactFormat::default(),
            file_name_prefix: "LinguaLeap".to_string(),
            download_timeout_secs: 120,
            pdfium_library_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for IntegrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("oracle_timeout_secs", &self.oracle_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("artifact_format", &self.artifact_format)
            .field("file_name_prefix", &self.file_name_prefix)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProgressObserver>"),
            )
            .finish()
    }
}

impl IntegrationConfig {
    /// Create a new builder for `IntegrationConfig`.
    pub fn builder() -> IntegrationConfigBuilder {
        IntegrationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`IntegrationConfig`].
#[derive(Debug)]
pub struct IntegrationConfigBuilder {
    config: IntegrationConfig,
}

impl IntegrationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn oracle_timeout_secs(mut self, secs: u64) -> Self {
        self.config.oracle_timeout_secs = Some(secs);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn artifact_format(mut self, format: ArtifactFormat) -> Self {
        self.config.artifact_format = format;
        self
    }

    pub fn file_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_name_prefix = prefix.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IntegrationConfig, IntegrationError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(IntegrationError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.oracle_timeout_secs == Some(0) {
            return Err(IntegrationError::InvalidConfig(
                "oracle timeout must be ≥ 1s".into(),
            ));
        }
        if c.file_name_prefix.trim().is_empty()
            || c.file_name_prefix.contains(['/', '\\'])
        {
            return Err(IntegrationError::InvalidConfig(format!(
                "file name prefix must be a non-empty plain name, got {:?}",
                c.file_name_prefix
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the translated content is packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// A WordprocessingML package, one paragraph per line. (default)
    #[default]
    Docx,
    /// Raw UTF-8 text.
    PlainText,
}

impl ArtifactFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Docx => "docx",
            ArtifactFormat::PlainText => "txt",
        }
    }
}
