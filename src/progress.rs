//! Run state machine and progress-callback trait.
//!
//! Every pipeline run owns one [`PipelineRun`], which walks the stages
//!
//! ```text
//! Idle → Extracting → BuildingRequest → Invoking → Assembling → Completed
//!   └──────────┴─────────────┴──────────────┴───────────┴──→ Failed
//! ```
//!
//! strictly in order. Progress percent never decreases within a run and
//! only reaches 100 at `Completed`. `Failed` keeps whatever percent the run
//! had reached.
//!
//! Inject an [`Arc<dyn ProgressObserver>`] via
//! [`crate::config::IntegrationConfigBuilder::progress_callback`] to mirror
//! the transitions into a progress bar, a WebSocket, or a log.

use crate::error::{FailureKind, IntegrationError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// One stage of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Extracting,
    BuildingRequest,
    Invoking,
    Assembling,
    Completed,
    Failed,
}

impl PipelineStage {
    /// Progress percent reported on entering this stage. `None` for `Failed`.
    pub fn percent(self) -> Option<u8> {
        match self {
            PipelineStage::Idle => Some(0),
            PipelineStage::Extracting => Some(5),
            PipelineStage::BuildingRequest => Some(50),
            PipelineStage::Invoking => Some(70),
            PipelineStage::Assembling => Some(90),
            PipelineStage::Completed => Some(100),
            PipelineStage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Completed | PipelineStage::Failed)
    }

    /// Human-readable status line for this stage.
    pub fn label(self) -> &'static str {
        match self {
            PipelineStage::Idle => "Initializing...",
            PipelineStage::Extracting => "Extracting document content...",
            PipelineStage::BuildingRequest => "Preparing request...",
            PipelineStage::Invoking => "AI processing content...",
            PipelineStage::Assembling => "Assembling document...",
            PipelineStage::Completed => "Document ready",
            PipelineStage::Failed => "Processing failed",
        }
    }

    fn successor(self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Idle => Some(PipelineStage::Extracting),
            PipelineStage::Extracting => Some(PipelineStage::BuildingRequest),
            PipelineStage::BuildingRequest => Some(PipelineStage::Invoking),
            PipelineStage::Invoking => Some(PipelineStage::Assembling),
            PipelineStage::Assembling => Some(PipelineStage::Completed),
            PipelineStage::Completed | PipelineStage::Failed => None,
        }
    }
}

/// The error a run ended with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Called by the pipeline as a run moves between stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Concurrent runs may share one observer, so
/// implementations must be `Send + Sync`.
pub trait ProgressObserver: Send + Sync {
    /// Called on entering every non-failed stage, including `Completed`.
    fn on_stage(&self, stage: PipelineStage, percent: u8) {
        let _ = (stage, percent);
    }

    /// Called once when the run enters `Failed`.
    ///
    /// # Arguments
    /// * `stage`   : the stage that was running when the failure happened
    /// * `failure` : kind and human-readable message
    fn on_failed(&self, stage: PipelineStage, failure: &RunFailure) {
        let _ = (stage, failure);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressObserver;

impl ProgressObserver for NoopProgressObserver {}

/// Convenience alias matching the type stored in [`crate::config::IntegrationConfig`].
pub type ProgressCallback = Arc<dyn ProgressObserver>;

/// State of one in-flight run.
pub struct PipelineRun {
    stage: PipelineStage,
    progress_percent: u8,
    last_error: Option<RunFailure>,
    history: Vec<(PipelineStage, u8)>,
    observer: Option<ProgressCallback>,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PipelineRun {
    pub fn new(observer: Option<ProgressCallback>) -> Self {
        Self {
            stage: PipelineStage::Idle,
            progress_percent: 0,
            last_error: None,
            history: vec![(PipelineStage::Idle, 0)],
            observer,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn last_error(&self) -> Option<&RunFailure> {
        self.last_error.as_ref()
    }

    /// Every `(stage, percent)` the run has passed through, in order.
    pub fn history(&self) -> &[(PipelineStage, u8)] {
        &self.history
    }

    /// Move to `next`, which must be the immediate successor of the current stage.
    pub fn advance(&mut self, next: PipelineStage) -> Result<(), IntegrationError> {
        if self.stage.successor() != Some(next) {
            return Err(IntegrationError::Internal(format!(
                "illegal stage transition {:?} → {:?}",
                self.stage, next
            )));
        }
        let percent = next
            .percent()
            .unwrap_or(self.progress_percent)
            .max(self.progress_percent);

        debug!("Stage {:?} → {:?} ({}%)", self.stage, next, percent);
        self.stage = next;
        self.progress_percent = percent;
        self.history.push((next, percent));

        if let Some(ref cb) = self.observer {
            cb.on_stage(next, percent);
        }
        Ok(())
    }

    /// Enter `Failed`, recording the error. A no-op on terminal runs.
    pub fn fail(&mut self, err: &IntegrationError) {
        if self.stage.is_terminal() {
            return;
        }
        let failure = RunFailure {
            kind: err.kind(),
            message: err.to_string(),
        };
        warn!(
            "Run failed during {:?} [{}]: {}",
            self.stage, failure.kind, failure.message
        );

        if let Some(ref cb) = self.observer {
            cb.on_failed(self.stage, &failure);
        }
        self.stage = PipelineStage::Failed;
        self.history.push((PipelineStage::Failed, self.progress_percent));
        self.last_error = Some(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<(PipelineStage, u8)>>,
        failures: AtomicUsize,
    }

    impl ProgressObserver for Recorder {
        fn on_stage(&self, stage: PipelineStage, percent: u8) {
            self.stages.lock().unwrap().push((stage, percent));
        }

        fn on_failed(&self, _stage: PipelineStage, _failure: &RunFailure) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    const FORWARD: [PipelineStage; 5] = [
        PipelineStage::Extracting,
        PipelineStage::BuildingRequest,
        PipelineStage::Invoking,
        PipelineStage::Assembling,
        PipelineStage::Completed,
    ];

    #[test]
    fn full_run_is_monotonic_and_ends_at_100() {
        let mut run = PipelineRun::default();
        for stage in FORWARD {
            run.advance(stage).unwrap();
        }
        assert_eq!(run.stage(), PipelineStage::Completed);
        assert_eq!(run.progress_percent(), 100);

        let percents: Vec<u8> = run.history().iter().map(|(_, p)| *p).collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
        let hundreds: Vec<_> = run.history().iter().filter(|(_, p)| *p == 100).collect();
        assert_eq!(hundreds, vec![&(PipelineStage::Completed, 100)]);
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let mut run = PipelineRun::default();
        run.advance(PipelineStage::Extracting).unwrap();
        let err = run.advance(PipelineStage::Invoking).unwrap_err();
        assert_eq!(err.kind(), FailureKind::InternalFailure);
        assert_eq!(run.stage(), PipelineStage::Extracting);
    }

    #[test]
    fn failed_is_terminal_and_keeps_percent() {
        let mut run = PipelineRun::default();
        run.advance(PipelineStage::Extracting).unwrap();
        run.advance(PipelineStage::BuildingRequest).unwrap();
        run.fail(&IntegrationError::Validation("blank".into()));

        assert_eq!(run.stage(), PipelineStage::Failed);
        assert_eq!(run.progress_percent(), 50);
        assert_eq!(
            run.last_error().map(|f| f.kind),
            Some(FailureKind::ValidationFailure)
        );
        assert!(run.advance(PipelineStage::Invoking).is_err());

        // A second failure does not overwrite the first.
        run.fail(&IntegrationError::Internal("late".into()));
        assert_eq!(
            run.last_error().map(|f| f.kind),
            Some(FailureKind::ValidationFailure)
        );
    }

    #[test]
    fn observer_sees_every_transition() {
        let recorder = Arc::new(Recorder::default());
        let mut run = PipelineRun::new(Some(recorder.clone() as ProgressCallback));
        run.advance(PipelineStage::Extracting).unwrap();
        run.advance(PipelineStage::BuildingRequest).unwrap();
        run.fail(&IntegrationError::Assembly("empty".into()));

        assert_eq!(
            *recorder.stages.lock().unwrap(),
            vec![
                (PipelineStage::Extracting, 5),
                (PipelineStage::BuildingRequest, 50)
            ]
        );
        assert_eq!(recorder.failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let cb: Arc<dyn ProgressObserver> = Arc::new(NoopProgressObserver);
        cb.on_stage(PipelineStage::Invoking, 70);
        cb.on_failed(
            PipelineStage::Invoking,
            &RunFailure {
                kind: FailureKind::OracleUnavailable,
                message: "timeout".into(),
            },
        );
    }
}
