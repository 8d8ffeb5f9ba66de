//! The upload/generate flow.
//!
//! One [`Orchestrator::upload`] call runs a whole session: policy check, letter
//! extraction, sentence generation, local validation. Progress animates from 0 to
//! a random midpoint during extraction and from there to 100 during generation.
//! Starting a new upload supersedes the previous one; the superseded run finishes
//! its in-flight call but its result is discarded.

use std::ops::Range;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use signshuffle_core::{annotate, LetterCount, UploadPolicy, Verdict};

use crate::gateway::AnagramGateway;
use crate::progress::ProgressTimer;
use crate::session::{SessionError, SessionPhase, SessionStore, Ticket, UploadSession};
use crate::upload::ImageUpload;

/// Fired once when every generated sentence is valid.
pub trait Celebration: Send + Sync {
    fn celebrate(&self, verdicts: &[Verdict]);
}

/// Default celebration: a log line.
pub struct LogCelebration;

impl Celebration for LogCelebration {
    fn celebrate(&self, verdicts: &[Verdict]) {
        info!(sentences = verdicts.len(), "Every sentence fits the sign");
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Nominal length of each progress segment.
    pub segment_duration: Duration,
    pub tick: Duration,
    /// Where the extraction segment ends, drawn uniformly per upload.
    pub midpoint: Range<f64>,
    pub policy: UploadPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            segment_duration: Duration::from_millis(3000),
            tick: Duration::from_millis(10),
            midpoint: 25.0..50.0,
            policy: UploadPolicy::default(),
        }
    }
}

/// How an upload run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(Vec<Verdict>),
    Failed(SessionError),
    /// A newer upload started; this run's result was dropped.
    Superseded,
}

pub struct Orchestrator {
    gateway: Arc<dyn AnagramGateway>,
    store: SessionStore,
    timer: ProgressTimer,
    celebration: Arc<dyn Celebration>,
    rng: Mutex<StdRng>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn AnagramGateway>, config: OrchestratorConfig) -> Self {
        let store = SessionStore::new();
        Self {
            gateway,
            timer: ProgressTimer::new(store.clone(), config.tick),
            store,
            celebration: Arc::new(LogCelebration),
            rng: Mutex::new(StdRng::from_entropy()),
            config,
        }
    }

    pub fn with_celebration(mut self, celebration: Arc<dyn Celebration>) -> Self {
        self.celebration = celebration;
        self
    }

    /// Makes midpoints and progress jumps reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self.timer = ProgressTimer::new(self.store.clone(), self.config.tick).with_seed(seed);
        self
    }

    /// Current session state.
    pub fn session(&self) -> UploadSession {
        self.store.snapshot()
    }

    /// Handle for observers polling progress while an upload runs.
    pub fn store(&self) -> SessionStore {
        self.store.clone()
    }

    fn draw_midpoint(&self) -> f64 {
        let range = self.config.midpoint.clone();
        if range.is_empty() {
            return range.start;
        }
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(range)
    }

    fn fail(&self, ticket: Ticket, error: SessionError) -> RunOutcome {
        let published = self.store.settle(ticket, |s| {
            s.loading = false;
            s.progress = 0.0;
            s.results.clear();
            s.error = Some(error.clone());
            s.phase = SessionPhase::Idle;
        });
        if published {
            warn!(ticket = ticket.id(), error = %error, "Upload failed");
            RunOutcome::Failed(error)
        } else {
            RunOutcome::Superseded
        }
    }

    fn enter(&self, ticket: Ticket, phase: SessionPhase) -> bool {
        self.store.update(ticket, |s| s.phase = phase)
    }

    pub async fn upload(&self, upload: ImageUpload) -> RunOutcome {
        let ticket = self.store.begin();
        info!(
            ticket = ticket.id(),
            file = %upload.filename,
            mime = %upload.mime_type,
            size_bytes = upload.size(),
            "Upload started"
        );

        if let Err(violation) = self.config.policy.check(&upload.mime_type, upload.size()) {
            return self.fail(ticket, violation.into());
        }

        let request = upload.to_extract_request();
        let midpoint = self.draw_midpoint();
        if !self.enter(ticket, SessionPhase::Extracting) {
            return RunOutcome::Superseded;
        }
        self.timer
            .start(ticket, 0.0, midpoint, self.config.segment_duration);

        let letters = match self.gateway.extract_letters(&request).await {
            Ok(Some(letters)) if !letters.is_empty() => letters,
            Ok(_) => return self.fail(ticket, SessionError::NoTextFound),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Letter extraction failed");
                return self.fail(ticket, SessionError::ExtractionFailed);
            }
        };
        info!(ticket = ticket.id(), letters = %letters, "Letters received");

        if !self.enter(ticket, SessionPhase::Generating) {
            return RunOutcome::Superseded;
        }
        self.timer
            .start(ticket, midpoint, 100.0, self.config.segment_duration);

        let sentences = match self.gateway.generate_sentences(&letters).await {
            Ok(sentences) => sentences,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Sentence generation failed");
                return self.fail(ticket, SessionError::GenerationFailed);
            }
        };

        if !self.enter(ticket, SessionPhase::Annotating) {
            return RunOutcome::Superseded;
        }
        self.finish(ticket, sentences, &letters)
    }

    fn finish(&self, ticket: Ticket, sentences: Vec<String>, letters: &LetterCount) -> RunOutcome {
        let verdicts = annotate(sentences, letters);
        let published = self.store.settle(ticket, |s| {
            s.loading = false;
            s.progress = 0.0;
            s.error = None;
            s.results = verdicts.clone();
            s.phase = SessionPhase::Idle;
        });
        if !published {
            return RunOutcome::Superseded;
        }

        let valid = verdicts.iter().filter(|v| v.valid).count();
        info!(
            ticket = ticket.id(),
            total = verdicts.len(),
            valid,
            "Upload complete"
        );
        if valid == verdicts.len() {
            self.celebration.celebrate(&verdicts);
        }
        RunOutcome::Completed(verdicts)
    }
}
