//! Client side of signshuffle: encodes an image, drives the two gateway calls,
//! and validates the returned sentences locally.

pub mod gateway;
pub mod orchestrator;
pub mod progress;
pub mod session;
pub mod upload;

pub use gateway::{AnagramGateway, HttpGateway};
pub use orchestrator::{Celebration, LogCelebration, Orchestrator, OrchestratorConfig, RunOutcome};
pub use progress::{ProgressCurve, ProgressTimer};
pub use session::{SessionError, SessionPhase, SessionStore, Ticket, UploadSession};
pub use upload::{detect_mime_type, select_single, ImageUpload};
