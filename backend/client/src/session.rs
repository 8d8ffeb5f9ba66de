//! Upload session state.
//!
//! A [`SessionStore`] holds the one active [`UploadSession`] together with the
//! progress timer that animates it. Every upload takes a [`Ticket`]; mutations made
//! with a stale ticket are refused, so a superseded run can never overwrite the
//! state of the run that replaced it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::task::JoinHandle;

use signshuffle_core::{PolicyViolation, Verdict};

/// Terminal errors of an upload. `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{0}")]
    InvalidUpload(#[from] PolicyViolation),

    #[error("Okay, something went wrong getting letters out of that image. Try it again?")]
    ExtractionFailed,

    #[error("No text found in the image.")]
    NoTextFound,

    #[error("Okay, something went wrong generating sentences from that image. Sometimes the AI acts up. Maybe try again?")]
    GenerationFailed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Idle,
    Extracting,
    Generating,
    Annotating,
}

/// Snapshot of the active upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSession {
    pub loading: bool,
    /// 0–100, simulated.
    pub progress: f64,
    pub error: Option<SessionError>,
    /// Verdicts in the order the sentences were generated.
    pub results: Vec<Verdict>,
    pub phase: SessionPhase,
}

/// Identifies one upload run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Default)]
struct Inner {
    session: UploadSession,
    ticket: u64,
    timer_epoch: u64,
    timer: Option<JoinHandle<()>>,
}

impl Inner {
    fn halt_timer(&mut self) {
        self.timer_epoch += 1;
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<Inner>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> UploadSession {
        self.lock().session.clone()
    }

    /// Start a new upload: halt any running timer, reset all state, and
    /// invalidate every earlier ticket.
    pub fn begin(&self) -> Ticket {
        let mut inner = self.lock();
        inner.halt_timer();
        inner.ticket += 1;
        inner.session = UploadSession {
            loading: true,
            ..UploadSession::default()
        };
        Ticket(inner.ticket)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.lock().ticket == ticket.0
    }

    /// Apply `f` if `ticket` is still the active upload.
    pub fn update(&self, ticket: Ticket, f: impl FnOnce(&mut UploadSession)) -> bool {
        let mut inner = self.lock();
        if inner.ticket != ticket.0 {
            return false;
        }
        f(&mut inner.session);
        true
    }

    /// Halt the timer and apply `f` in one step, if `ticket` is still active.
    /// Used for the terminal transition of a run.
    pub fn settle(&self, ticket: Ticket, f: impl FnOnce(&mut UploadSession)) -> bool {
        let mut inner = self.lock();
        if inner.ticket != ticket.0 {
            return false;
        }
        inner.halt_timer();
        f(&mut inner.session);
        true
    }

    /// Swap in a new progress segment. `spawn` receives the segment's epoch and
    /// returns its task. Refused for stale tickets.
    pub(crate) fn replace_segment(
        &self,
        ticket: Ticket,
        start: f64,
        spawn: impl FnOnce(u64) -> JoinHandle<()>,
    ) -> bool {
        let mut inner = self.lock();
        if inner.ticket != ticket.0 {
            return false;
        }
        inner.halt_timer();
        inner.session.progress = start;
        let epoch = inner.timer_epoch;
        inner.timer = Some(spawn(epoch));
        true
    }

    /// Record a tick from the segment with `epoch`. Returns false once that
    /// segment has been halted or replaced.
    pub(crate) fn write_progress(&self, epoch: u64, value: f64) -> bool {
        let mut inner = self.lock();
        if inner.timer_epoch != epoch {
            return false;
        }
        inner.session.progress = value;
        true
    }

    /// Halt the timer if `ticket` is still active.
    pub(crate) fn stop_segment(&self, ticket: Ticket) -> bool {
        let mut inner = self.lock();
        if inner.ticket != ticket.0 {
            return false;
        }
        inner.halt_timer();
        true
    }

    /// Halt the timer unconditionally.
    pub(crate) fn halt_timer(&self) {
        self.lock().halt_timer();
    }
}
