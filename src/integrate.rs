//! Pipeline orchestration: one call from documents to artifact.
//!
//! [`Integrator::run`] drives a fresh [`PipelineRun`] through
//! extract → build request → invoke → assemble. Stages run strictly in
//! sequence and the first failure ends the run with its own
//! [`crate::error::FailureKind`]. There is no automatic retry inside a run;
//! [`Integrator::run_with_retry`] is the opt-in caller-level policy.
//!
//! The free functions at the bottom are file-oriented conveniences built
//! on the same orchestrator.

use crate::config::IntegrationConfig;
use crate::document::{DocumentInput, ExtractedText, SourceDocument, TemplateDocument};
use crate::error::IntegrationError;
use crate::output::{Artifact, RunOutput, RunStats};
use crate::pipeline::assemble::{assemble, suggested_file_name};
use crate::pipeline::extract::{DocumentExtractor, Extractor};
use crate::pipeline::input;
use crate::pipeline::oracle::OracleClient;
use crate::pipeline::request::build_request;
use crate::progress::{PipelineRun, PipelineStage};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// What the caller hands to one run.
///
/// Every field is optional so that incomplete requests can be reported as
/// a validation failure instead of being unrepresentable.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub source: Option<DocumentInput<SourceDocument>>,
    pub template: Option<DocumentInput<TemplateDocument>>,
    pub target_language: Option<String>,
}

impl RunRequest {
    /// A request over two documents that still need extracting.
    pub fn new(
        source: SourceDocument,
        template: TemplateDocument,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            source: Some(DocumentInput::Document(source)),
            template: Some(DocumentInput::Document(template)),
            target_language: Some(target_language.into()),
        }
    }

    /// A request over text the caller already extracted.
    pub fn from_text(
        pdf_text: impl Into<String>,
        template_text: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            source: Some(DocumentInput::Text(pdf_text.into())),
            template: Some(DocumentInput::Text(template_text.into())),
            target_language: Some(target_language.into()),
        }
    }

    /// Names of the fields that are missing or blank.
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.source.is_none() {
            missing.push("source document");
        }
        if self.template.is_none() {
            missing.push("template document");
        }
        if self
            .target_language
            .as_deref()
            .map_or(true, |l| l.trim().is_empty())
        {
            missing.push("target language");
        }
        missing
    }
}

/// Runs the integration pipeline.
///
/// Cheap to clone and holds no per-run state, so one instance can serve
/// any number of concurrent runs.
#[derive(Clone)]
pub struct Integrator {
    extractor: Arc<dyn Extractor>,
    oracle: OracleClient,
    config: IntegrationConfig,
}

impl fmt::Debug for Integrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Integrator")
            .field("extractor", &"<dyn Extractor>")
            .field("oracle", &self.oracle)
            .field("config", &self.config)
            .finish()
    }
}

impl Integrator {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        oracle: OracleClient,
        config: IntegrationConfig,
    ) -> Self {
        Self {
            extractor,
            oracle,
            config,
        }
    }

    /// Production wiring: pdfium/OOXML extraction and the configured LLM.
    ///
    /// Fails with a configuration error if no LLM provider can be resolved.
    pub fn from_config(config: &IntegrationConfig) -> Result<Self, IntegrationError> {
        let oracle = OracleClient::from_config(config)?;
        Ok(Self::new(
            Arc::new(DocumentExtractor::new(config)),
            oracle,
            config.clone(),
        ))
    }

    /// Replace the extractor, keeping everything else.
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    /// Execute one run.
    ///
    /// # Errors
    /// The error of the first failing stage, unchanged. Missing inputs fail
    /// before any extraction starts.
    pub async fn run(&self, request: &RunRequest) -> Result<RunOutput, IntegrationError> {
        self.run_tracked(request).await.1
    }

    /// Execute one run and hand back its terminal [`PipelineRun`] as well.
    ///
    /// On failure the run is in [`PipelineStage::Failed`], keeps the percent
    /// of the stage that failed, and carries the failure in
    /// [`PipelineRun::last_error`].
    pub async fn run_tracked(
        &self,
        request: &RunRequest,
    ) -> (PipelineRun, Result<RunOutput, IntegrationError>) {
        let mut run = PipelineRun::new(self.config.progress_callback.clone());
        let outcome = self.drive(&mut run, request).await;
        if let Err(ref e) = outcome {
            run.fail(e);
        }
        (run, outcome)
    }

    /// Execute a run, re-running the whole pipeline on retryable failures.
    ///
    /// Up to `max_retries` extra runs, each with a fresh [`PipelineRun`],
    /// separated by `retry_backoff_ms * 2^(attempt - 1)`. Non-retryable
    /// failures are returned immediately.
    pub async fn run_with_retry(&self, request: &RunRequest) -> Result<RunOutput, IntegrationError> {
        let mut attempt = 0u32;
        loop {
            match self.run(request).await {
                Ok(output) => return Ok(output),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = self
                        .config
                        .retry_backoff_ms
                        .saturating_mul(2u64.saturating_pow(attempt - 1));
                    warn!(
                        "Run failed [{}], retry {}/{} after {}ms: {}",
                        e.kind(),
                        attempt,
                        self.config.max_retries,
                        backoff,
                        e
                    );
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn drive(
        &self,
        run: &mut PipelineRun,
        request: &RunRequest,
    ) -> Result<RunOutput, IntegrationError> {
        let total_start = Instant::now();

        let missing = request.missing_fields();
        let (Some(source), Some(template), Some(language), true) = (
            request.source.as_ref(),
            request.template.as_ref(),
            request.target_language.as_deref(),
            missing.is_empty(),
        ) else {
            return Err(IntegrationError::Validation(format!(
                "missing {}",
                missing.join(", ")
            )));
        };

        // ── Extracting ───────────────────────────────────────────────────
        run.advance(PipelineStage::Extracting)?;
        let extract_start = Instant::now();
        let pdf_text = match source {
            DocumentInput::Document(doc) => self.extractor.extract_source(doc).await?,
            DocumentInput::Text(text) => ExtractedText::new(text.as_str()),
        };
        let template_text = match template {
            DocumentInput::Document(doc) => self.extractor.extract_template(doc).await?,
            DocumentInput::Text(text) => ExtractedText::new(text.as_str()),
        };
        let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
        let pdf_chars = pdf_text.as_str().chars().count();
        let template_chars = template_text.as_str().chars().count();
        debug!(
            "Extracted {} pdf chars, {} template chars in {}ms",
            pdf_chars, template_chars, extract_duration_ms
        );

        // ── BuildingRequest ──────────────────────────────────────────────
        run.advance(PipelineStage::BuildingRequest)?;
        let integration_request = build_request(pdf_text, template_text, language)?;

        // ── Invoking ─────────────────────────────────────────────────────
        run.advance(PipelineStage::Invoking)?;
        let oracle_start = Instant::now();
        let result = self.oracle.invoke(&integration_request).await?;
        let oracle_duration_ms = oracle_start.elapsed().as_millis() as u64;

        // ── Assembling ───────────────────────────────────────────────────
        run.advance(PipelineStage::Assembling)?;
        let file_name = suggested_file_name(
            template.name(),
            language,
            &self.config.file_name_prefix,
            self.config.artifact_format,
        );
        let artifact = assemble(&result, &file_name, self.config.artifact_format)?;

        run.advance(PipelineStage::Completed)?;

        let stats = RunStats {
            pdf_chars,
            template_chars,
            input_tokens: result.input_tokens as u64,
            output_tokens: result.output_tokens as u64,
            extract_duration_ms,
            oracle_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Run complete: {} ({} chars), {}ms total",
            artifact.file_name,
            artifact.content.len(),
            stats.total_duration_ms
        );

        Ok(RunOutput {
            artifact,
            result,
            stats,
            history: run.history().to_vec(),
        })
    }
}

/// Populate a template from a PDF, both given as local paths or URLs.
///
/// This is the primary file-oriented entry point. The LLM provider is
/// resolved from `config`, and the run honours `config.max_retries`.
pub async fn populate_files(
    pdf: impl AsRef<str>,
    template: impl AsRef<str>,
    target_language: &str,
    config: &IntegrationConfig,
) -> Result<RunOutput, IntegrationError> {
    let (pdf, template) = (pdf.as_ref(), template.as_ref());
    info!("Populating {} from {} ({})", template, pdf, target_language);

    let source = input::load_input(pdf, config.download_timeout_secs).await?;
    let template = input::load_input(template, config.download_timeout_secs).await?;

    let integrator = Integrator::from_config(config)?;
    let request = RunRequest::new(
        SourceDocument::new(source.bytes, source.media_type).with_name(source.name),
        TemplateDocument::new(template.bytes, template.media_type).with_name(template.name),
        target_language,
    );
    integrator.run_with_retry(&request).await
}

/// Populate a template and write the artifact to `output_path`.
pub async fn populate_to_file(
    pdf: impl AsRef<str>,
    template: impl AsRef<str>,
    target_language: &str,
    output_path: impl AsRef<Path>,
    config: &IntegrationConfig,
) -> Result<RunStats, IntegrationError> {
    let output = populate_files(pdf, template, target_language, config).await?;
    write_artifact(&output.artifact, output_path).await?;
    Ok(output.stats)
}

/// Write an artifact's bytes to `path`.
///
/// Writes into a temp file in the destination directory and renames it into
/// place, so readers never observe a partial file.
pub async fn write_artifact(
    artifact: &Artifact,
    path: impl AsRef<Path>,
) -> Result<(), IntegrationError> {
    let path = path.as_ref().to_path_buf();
    let bytes = artifact.bytes.clone();

    let target = path.clone();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| IntegrationError::Internal(format!("write task panicked: {}", e)))?
    .map_err(|source| IntegrationError::OutputWriteFailed {
        path: path.clone(),
        source,
    })?;

    info!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());
    Ok(())
}

/// Synchronous wrapper around [`populate_files`].
///
/// Creates a temporary tokio runtime internally.
pub fn populate_sync(
    pdf: impl AsRef<str>,
    template: impl AsRef<str>,
    target_language: &str,
    config: &IntegrationConfig,
) -> Result<RunOutput, IntegrationError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| IntegrationError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(populate_files(pdf, template, target_language, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_named() {
        assert_eq!(
            RunRequest::default().missing_fields(),
            vec!["source document", "template document", "target language"]
        );
        assert_eq!(
            RunRequest::from_text("a", "b", "   ").missing_fields(),
            vec!["target language"]
        );
        assert!(RunRequest::from_text("", "", "Spanish")
            .missing_fields()
            .is_empty());
    }

    #[tokio::test]
    async fn write_artifact_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/result.txt");
        let artifact = Artifact {
            content: "hola".into(),
            bytes: b"hola".to_vec(),
            media_type: crate::document::TEXT_MEDIA_TYPE,
            file_name: "result.txt".into(),
        };

        write_artifact(&artifact, &path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hola");

        // Overwrites in place.
        let artifact = Artifact {
            bytes: b"adios".to_vec(),
            ..artifact
        };
        write_artifact(&artifact, &path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"adios");
    }
}
