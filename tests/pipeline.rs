//! Orchestrator tests with stubbed extraction and oracle transport.
//!
//! No pdfium library or API key is needed: the [`Extractor`] and
//! [`OracleTransport`] seams are replaced by in-memory stubs.

use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions};
use lingualeap::{
    write_artifact, ExtractedText, FailureKind, IntegrationConfig, IntegrationError, Integrator,
    OracleClient, OracleReply, OracleTransport, PipelineStage, ProgressCallback, ProgressObserver,
    RunFailure, RunRequest, SourceDocument, TemplateDocument, TransportError,
};
use lingualeap::document::{DocumentKind, DOCX_MEDIA_TYPE, PDF_MEDIA_TYPE};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Stubs ────────────────────────────────────────────────────────────────────

/// Returns fixed texts, or fails extraction of the source.
#[derive(Default)]
struct StubExtractor {
    pdf_text: &'static str,
    template_text: &'static str,
    corrupt_source: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl lingualeap::Extractor for StubExtractor {
    async fn extract_source(&self, _doc: &SourceDocument) -> Result<ExtractedText, IntegrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.corrupt_source {
            return Err(IntegrationError::Extraction {
                kind: DocumentKind::Source,
                reason: "not a PDF".into(),
            });
        }
        Ok(self.pdf_text.into())
    }

    async fn extract_template(
        &self,
        _doc: &TemplateDocument,
    ) -> Result<ExtractedText, IntegrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.template_text.into())
    }
}

/// Plays back scripted outcomes, then repeats the last one.
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<String, TransportError>>>,
    last: Mutex<Option<Result<String, TransportError>>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<&str, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            ),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    fn replying(content: &str) -> Arc<Self> {
        Self::new(vec![Ok(content)])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OracleTransport for ScriptedTransport {
    async fn send(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<OracleReply, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let outcome = match next {
            Some(outcome) => {
                *self.last.lock().unwrap() = Some(outcome.clone());
                outcome
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(TransportError::Unavailable("script empty".into()))),
        };
        outcome.map(|content| OracleReply {
            content,
            input_tokens: 30,
            output_tokens: 10,
        })
    }
}

#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<(PipelineStage, u8)>>,
    failures: Mutex<Vec<(PipelineStage, FailureKind)>>,
}

impl ProgressObserver for Recorder {
    fn on_stage(&self, stage: PipelineStage, percent: u8) {
        self.stages.lock().unwrap().push((stage, percent));
    }

    fn on_failed(&self, stage: PipelineStage, failure: &RunFailure) {
        self.failures.lock().unwrap().push((stage, failure.kind));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

const SCENARIO_REPLY: &str = r#"{"translatedContent": "Nombre: John Doe, Edad: 42"}"#;

fn integrator_with(
    extractor: Arc<StubExtractor>,
    transport: Arc<ScriptedTransport>,
    recorder: Option<Arc<Recorder>>,
    tweak: impl FnOnce(lingualeap::IntegrationConfigBuilder) -> lingualeap::IntegrationConfigBuilder,
) -> Integrator {
    let mut builder = tweak(IntegrationConfig::builder());
    if let Some(recorder) = recorder {
        builder = builder.progress_callback(recorder as ProgressCallback);
    }
    let config = builder.build().unwrap();
    let oracle = OracleClient::new(transport, &config);
    Integrator::new(extractor, oracle, config)
}

fn integrator(transport: Arc<ScriptedTransport>, recorder: Option<Arc<Recorder>>) -> Integrator {
    integrator_with(Arc::new(StubExtractor::default()), transport, recorder, |b| b)
}

fn documents(language: &str) -> RunRequest {
    RunRequest::new(
        SourceDocument::new(b"%PDF-1.7".to_vec(), PDF_MEDIA_TYPE).with_name("id-card.pdf"),
        TemplateDocument::new(b"PK\x03\x04".to_vec(), DOCX_MEDIA_TYPE).with_name("plantilla.docx"),
        language,
    )
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_successful_population() {
    let transport = ScriptedTransport::replying(SCENARIO_REPLY);
    let recorder = Arc::new(Recorder::default());
    let integrator = integrator(transport.clone(), Some(recorder.clone()));

    let request = RunRequest::from_text("John Doe 42", "Name: {{name}}, Age: {{age}}", "Spanish");
    let output = integrator.run(&request).await.unwrap();

    assert_eq!(output.result.translated_content, "Nombre: John Doe, Edad: 42");
    assert_eq!(output.artifact.content, "Nombre: John Doe, Edad: 42");
    assert_eq!(output.artifact.file_name, "LinguaLeap_Translated_Document.docx");
    assert_eq!(output.artifact.media_type, DOCX_MEDIA_TYPE);
    assert_eq!(output.stats.pdf_chars, 11);
    assert_eq!(output.stats.input_tokens, 30);
    assert_eq!(output.stats.output_tokens, 10);
    assert_eq!(transport.calls(), 1);

    let stages = recorder.stages.lock().unwrap().clone();
    assert_eq!(stages.last(), Some(&(PipelineStage::Completed, 100)));
    assert!(recorder.failures.lock().unwrap().is_empty());
}

#[tokio::test]
async fn scenario_oracle_unavailable() {
    let transport = ScriptedTransport::new(vec![Err(TransportError::Unavailable(
        "connection refused".into(),
    ))]);
    let recorder = Arc::new(Recorder::default());
    let integrator = integrator(transport, Some(recorder.clone()));

    let request = RunRequest::from_text("John Doe 42", "Name: {{name}}", "Spanish");
    let err = integrator.run(&request).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::OracleUnavailable);
    assert!(err.is_retryable());
    assert_eq!(
        *recorder.failures.lock().unwrap(),
        vec![(PipelineStage::Invoking, FailureKind::OracleUnavailable)]
    );
    // Never reached Assembling.
    let stages = recorder.stages.lock().unwrap().clone();
    assert_eq!(stages.last(), Some(&(PipelineStage::Invoking, 70)));
}

#[tokio::test]
async fn scenario_contract_violation() {
    let integrator = integrator(ScriptedTransport::replying("{}"), None);

    let request = RunRequest::from_text("John Doe 42", "Name: {{name}}", "Spanish");
    let err = integrator.run(&request).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::OracleContractFailure);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn scenario_empty_template_still_invokes_oracle() {
    let transport = ScriptedTransport::replying(r#"{"translatedContent":"data"}"#);
    let integrator = integrator(transport.clone(), None);

    let request = RunRequest::from_text("data", "", "Spanish");
    let output = integrator.run(&request).await.unwrap();

    assert_eq!(transport.calls(), 1);
    assert_eq!(output.stats.template_chars, 0);
    assert_eq!(output.result.translated_content, "data");
}

// ── Orchestration properties ─────────────────────────────────────────────────

#[tokio::test]
async fn progress_is_monotonic_and_hits_100_once() {
    let recorder = Arc::new(Recorder::default());
    let integrator = integrator(ScriptedTransport::replying(SCENARIO_REPLY), Some(recorder.clone()));

    integrator
        .run(&RunRequest::from_text("a", "b", "German"))
        .await
        .unwrap();

    let stages = recorder.stages.lock().unwrap().clone();
    assert_eq!(
        stages,
        vec![
            (PipelineStage::Extracting, 5),
            (PipelineStage::BuildingRequest, 50),
            (PipelineStage::Invoking, 70),
            (PipelineStage::Assembling, 90),
            (PipelineStage::Completed, 100),
        ]
    );
}

#[tokio::test]
async fn completed_run_reports_its_history() {
    let integrator = integrator(ScriptedTransport::replying(SCENARIO_REPLY), None);

    let (run, outcome) = integrator
        .run_tracked(&RunRequest::from_text("a", "b", "German"))
        .await;
    let output = outcome.unwrap();

    assert_eq!(run.stage(), PipelineStage::Completed);
    assert_eq!(run.progress_percent(), 100);
    assert!(run.last_error().is_none());
    assert_eq!(output.history.as_slice(), run.history());
    assert_eq!(output.history.first(), Some(&(PipelineStage::Idle, 0)));
    assert_eq!(output.history.last(), Some(&(PipelineStage::Completed, 100)));
}

#[tokio::test]
async fn failed_run_keeps_stage_percent_and_error() {
    let transport = ScriptedTransport::new(vec![Err(TransportError::Unavailable(
        "HTTP 503 Service Unavailable".into(),
    ))]);
    let integrator = integrator(transport, None);

    let (run, outcome) = integrator
        .run_tracked(&RunRequest::from_text("John Doe 42", "Name: {{name}}", "Spanish"))
        .await;

    assert_eq!(outcome.unwrap_err().kind(), FailureKind::OracleUnavailable);
    assert_eq!(run.stage(), PipelineStage::Failed);
    assert_eq!(run.progress_percent(), 70);
    assert_eq!(
        run.last_error().map(|f| f.kind),
        Some(FailureKind::OracleUnavailable)
    );
    assert_eq!(run.history().last(), Some(&(PipelineStage::Failed, 70)));

    // Validation failures never leave Idle's percent.
    let (run, _) = integrator.run_tracked(&RunRequest::default()).await;
    assert_eq!(run.stage(), PipelineStage::Failed);
    assert_eq!(run.progress_percent(), 0);
    assert_eq!(
        run.last_error().map(|f| f.kind),
        Some(FailureKind::ValidationFailure)
    );
}

#[tokio::test]
async fn missing_inputs_fail_before_extraction() {
    let extractor = Arc::new(StubExtractor::default());
    let transport = ScriptedTransport::replying(SCENARIO_REPLY);
    let recorder = Arc::new(Recorder::default());
    let integrator = integrator_with(
        extractor.clone(),
        transport.clone(),
        Some(recorder.clone()),
        |b| b,
    );

    let mut no_template = documents("Spanish");
    no_template.template = None;
    let blank_language = documents(" \t ");

    for request in [RunRequest::default(), no_template, blank_language] {
        let err = integrator.run(&request).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ValidationFailure, "{err}");
    }

    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(transport.calls(), 0);
    assert!(recorder.stages.lock().unwrap().is_empty());
    assert!(recorder
        .failures
        .lock()
        .unwrap()
        .iter()
        .all(|f| *f == (PipelineStage::Idle, FailureKind::ValidationFailure)));
}

#[tokio::test]
async fn documents_are_extracted_and_artifact_named_after_template() {
    let extractor = Arc::new(StubExtractor {
        pdf_text: "John Doe 42",
        template_text: "Nombre: {{name}}\n\nEdad: {{age}}\n\n",
        ..Default::default()
    });
    let integrator = integrator_with(
        extractor.clone(),
        ScriptedTransport::replying(r#"{"translatedContent":"Nombre: John Doe\nEdad: 42"}"#),
        None,
        |b| b,
    );

    let output = integrator.run(&documents(" Spanish ")).await.unwrap();

    assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
    assert_eq!(output.artifact.file_name, "LinguaLeap_plantilla_spanish.docx");
    assert!(output.artifact.bytes.starts_with(b"PK\x03\x04"));
}

#[tokio::test]
async fn extraction_failure_keeps_its_kind() {
    let extractor = Arc::new(StubExtractor {
        corrupt_source: true,
        ..Default::default()
    });
    let transport = ScriptedTransport::replying(SCENARIO_REPLY);
    let recorder = Arc::new(Recorder::default());
    let integrator = integrator_with(extractor, transport.clone(), Some(recorder.clone()), |b| b);

    let err = integrator.run(&documents("Spanish")).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::ExtractionFailure);
    assert_eq!(transport.calls(), 0);
    assert_eq!(
        *recorder.failures.lock().unwrap(),
        vec![(PipelineStage::Extracting, FailureKind::ExtractionFailure)]
    );
}

#[tokio::test]
async fn plain_text_artifact() {
    let integrator = integrator_with(
        Arc::new(StubExtractor::default()),
        ScriptedTransport::replying(SCENARIO_REPLY),
        None,
        |b| {
            b.artifact_format(lingualeap::ArtifactFormat::PlainText)
                .file_name_prefix("Acme")
        },
    );

    let output = integrator.run(&documents("French")).await.unwrap();
    assert_eq!(output.artifact.file_name, "Acme_plantilla_french.txt");
    assert_eq!(output.artifact.bytes, b"Nombre: John Doe, Edad: 42");
}

#[test]
fn identical_requests_give_identical_results() {
    let integrator = integrator(ScriptedTransport::replying(SCENARIO_REPLY), None);
    let request = RunRequest::from_text("John Doe 42", "Name: {{name}}", "Spanish");

    let first = tokio_test::block_on(integrator.run(&request)).unwrap();
    let second = tokio_test::block_on(integrator.run(&request)).unwrap();
    assert_eq!(first.result, second.result);
    assert_eq!(first.artifact.bytes, second.artifact.bytes);
}

#[tokio::test]
async fn concurrent_runs_are_independent() {
    let recorder = Arc::new(Recorder::default());
    let integrator = integrator(ScriptedTransport::replying(SCENARIO_REPLY), Some(recorder.clone()));
    let languages = ["Spanish", "French", "German", "Italian", "Dutch", "Polish"];

    let handles: Vec<_> = languages
        .iter()
        .map(|lang| {
            let integrator = integrator.clone();
            let request = documents(lang);
            tokio::spawn(async move { integrator.run(&request).await })
        })
        .collect();

    let mut names = Vec::new();
    for handle in handles {
        names.push(handle.await.unwrap().unwrap().artifact.file_name);
    }

    for (lang, name) in languages.iter().zip(&names) {
        assert_eq!(name, &format!("LinguaLeap_plantilla_{}.docx", lang.to_lowercase()));
    }
    let completed = recorder
        .stages
        .lock()
        .unwrap()
        .iter()
        .filter(|(stage, _)| *stage == PipelineStage::Completed)
        .count();
    assert_eq!(completed, languages.len());
}

// ── Caller-level retry ───────────────────────────────────────────────────────

#[tokio::test]
async fn retry_recovers_from_unavailable_oracle() {
    let transport = ScriptedTransport::new(vec![
        Err(TransportError::Unavailable("503".into())),
        Err(TransportError::Unavailable("429".into())),
        Ok(SCENARIO_REPLY),
    ]);
    let integrator = integrator_with(
        Arc::new(StubExtractor::default()),
        transport.clone(),
        None,
        |b| b.max_retries(2).retry_backoff_ms(1),
    );

    let output = integrator
        .run_with_retry(&RunRequest::from_text("John Doe 42", "Name: {{name}}", "Spanish"))
        .await
        .unwrap();

    assert_eq!(transport.calls(), 3);
    assert_eq!(output.result.translated_content, "Nombre: John Doe, Edad: 42");
}

#[tokio::test]
async fn retry_gives_up_after_max_retries() {
    let transport = ScriptedTransport::new(vec![Err(TransportError::Unavailable("503".into()))]);
    let integrator = integrator_with(
        Arc::new(StubExtractor::default()),
        transport.clone(),
        None,
        |b| b.max_retries(1).retry_backoff_ms(1),
    );

    let err = integrator
        .run_with_retry(&RunRequest::from_text("a", "b", "Spanish"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::OracleUnavailable);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn non_retryable_failures_are_not_retried() {
    let transport = ScriptedTransport::new(vec![Err(TransportError::Rejected(
        "blocked by safety filter".into(),
    ))]);
    let integrator = integrator_with(
        Arc::new(StubExtractor::default()),
        transport.clone(),
        None,
        |b| b.max_retries(5).retry_backoff_ms(1),
    );

    let err = integrator
        .run_with_retry(&RunRequest::from_text("a", "b", "Spanish"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::OracleRejected);
    assert_eq!(transport.calls(), 1);
}

// ── File helpers ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn artifact_written_to_disk() {
    let integrator = integrator(ScriptedTransport::replying(SCENARIO_REPLY), None);
    let output = integrator.run(&documents("Spanish")).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(&output.artifact.file_name);
    write_artifact(&output.artifact, &path).await.unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), output.artifact.bytes);
    // No temp files left behind.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn populate_files_rejects_missing_inputs() {
    let err = lingualeap::populate_files(
        "/no/such/dir/id-card.pdf",
        "/no/such/dir/form.docx",
        "Spanish",
        &IntegrationConfig::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), FailureKind::ValidationFailure);
}
