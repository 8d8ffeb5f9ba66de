//! Simulated progress.
//!
//! The gateway reports nothing while it works, so progress is an animation: an
//! eased curve from `start` to `end` over a nominal duration that may jump ahead
//! at random. [`ProgressCurve`] is the pure arithmetic; [`ProgressTimer`] drives
//! it on a tokio interval and writes into the [`SessionStore`].

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

use crate::session::{SessionStore, Ticket};

const EASE: f64 = 0.75;

/// Eased interpolation `f(t) = -0.75t² + 1.75t`, monotone on `[0, 1]` with `f(1) = 1`.
fn ease(t: f64) -> f64 {
    -EASE * t * t + (1.0 + EASE) * t
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressCurve {
    start: f64,
    end: f64,
    duration_ms: f64,
    tick_ms: f64,
    elapsed_ms: f64,
    jump_ms: f64,
}

impl ProgressCurve {
    pub fn new(start: f64, end: f64, duration: Duration, tick: Duration) -> Self {
        Self {
            start,
            end,
            duration_ms: duration.as_secs_f64() * 1000.0,
            tick_ms: tick.as_secs_f64() * 1000.0,
            elapsed_ms: 0.0,
            jump_ms: 0.0,
        }
    }

    /// Advance one tick. `roll` is uniform in `[0, 1)`; the accumulated jump
    /// budget is spent once `roll * 1000` falls at or under it.
    pub fn advance(&mut self, roll: f64) -> f64 {
        self.elapsed_ms += self.tick_ms;
        self.jump_ms += self.tick_ms * 2.0;
        if roll * 1000.0 <= self.jump_ms {
            self.elapsed_ms += self.jump_ms;
            self.jump_ms = 0.0;
        }
        self.value()
    }

    pub fn value(&self) -> f64 {
        let t = if self.duration_ms > 0.0 {
            (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let raw = self.start + ease(t) * (self.end - self.start);
        raw.clamp(self.start.min(self.end), self.start.max(self.end))
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }
}

async fn run_segment(
    store: SessionStore,
    epoch: u64,
    mut curve: ProgressCurve,
    mut rng: StdRng,
    tick: Duration,
) {
    let mut interval = interval_at(Instant::now() + tick, tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let value = curve.advance(rng.gen::<f64>());
        if !store.write_progress(epoch, value) {
            trace!(epoch, "Progress segment superseded");
            break;
        }
        if curve.is_complete() {
            break;
        }
    }
}

/// Owns the progress animation of one [`SessionStore`]. At most one segment runs
/// at a time; dropping the timer halts it.
pub struct ProgressTimer {
    store: SessionStore,
    tick: Duration,
    rng: Mutex<StdRng>,
}

impl ProgressTimer {
    /// `tick` is floored at 1 ms.
    pub fn new(store: SessionStore, tick: Duration) -> Self {
        Self {
            store,
            tick: tick.max(Duration::from_millis(1)),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Animate from `start` to `end` over `duration`, replacing any running
    /// segment. Progress is set to `start` immediately. Returns false if
    /// `ticket` is no longer the active upload.
    pub fn start(&self, ticket: Ticket, start: f64, end: f64, duration: Duration) -> bool {
        let seed = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen::<u64>();
        let curve = ProgressCurve::new(start, end, duration, self.tick);
        let tick = self.tick;
        let store = self.store.clone();
        self.store.replace_segment(ticket, start, move |epoch| {
            tokio::spawn(run_segment(
                store,
                epoch,
                curve,
                StdRng::seed_from_u64(seed),
                tick,
            ))
        })
    }

    /// Halt the running segment. No update lands after this returns.
    pub fn stop(&self, ticket: Ticket) -> bool {
        self.store.stop_segment(ticket)
    }
}

impl Drop for ProgressTimer {
    fn drop(&mut self) {
        self.store.halt_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(10);
    const SEGMENT: Duration = Duration::from_millis(3000);

    #[test]
    fn curve_is_monotone_and_bounded() {
        let mut curve = ProgressCurve::new(0.0, 50.0, SEGMENT, TICK);
        let mut rng = StdRng::seed_from_u64(7);
        let mut last = curve.value();
        assert_eq!(last, 0.0);
        for _ in 0..300 {
            let v = curve.advance(rng.gen());
            assert!(v >= last, "{v} < {last}");
            assert!((0.0..=50.0).contains(&v));
            last = v;
        }
        assert!(curve.is_complete());
        assert_eq!(curve.value(), 50.0);
    }

    #[test]
    fn low_roll_spends_jump_budget() {
        let mut curve = ProgressCurve::new(0.0, 100.0, SEGMENT, TICK);
        curve.advance(0.0);
        assert_eq!(curve.elapsed_ms, 30.0);
        assert_eq!(curve.jump_ms, 0.0);

        curve.advance(0.999);
        assert_eq!(curve.elapsed_ms, 40.0);
        assert_eq!(curve.jump_ms, 20.0);
    }

    #[test]
    fn curve_follows_easing() {
        let mut curve = ProgressCurve::new(
            25.0,
            100.0,
            Duration::from_millis(100),
            Duration::from_millis(50),
        );
        // 0.999 * 1000 > accumulated jump for the first tick.
        let v = curve.advance(0.999);
        assert!((v - (25.0 + ease(0.5) * 75.0)).abs() < 1e-9);
        assert!((ease(0.5) - 0.6875).abs() < 1e-12);
    }

    #[test]
    fn zero_duration_completes_at_once() {
        let curve = ProgressCurve::new(10.0, 40.0, Duration::ZERO, TICK);
        assert!(curve.is_complete());
        assert_eq!(curve.value(), 40.0);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_end_of_segment() {
        let store = SessionStore::new();
        let ticket = store.begin();
        let timer = ProgressTimer::new(store.clone(), TICK).with_seed(1);

        assert!(timer.start(ticket, 0.0, 50.0, SEGMENT));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let midway = store.snapshot().progress;
        assert!(midway > 0.0 && midway <= 50.0);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(store.snapshot().progress, 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_updates() {
        let store = SessionStore::new();
        let ticket = store.begin();
        let timer = ProgressTimer::new(store.clone(), TICK);

        timer.start(ticket, 0.0, 50.0, SEGMENT);
        assert!(timer.stop(ticket));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.snapshot().progress, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_running_segment() {
        let store = SessionStore::new();
        let ticket = store.begin();
        let timer = ProgressTimer::new(store.clone(), TICK).with_seed(3);

        timer.start(ticket, 0.0, 40.0, SEGMENT);
        tokio::time::sleep(Duration::from_millis(500)).await;
        timer.start(ticket, 40.0, 100.0, SEGMENT);
        assert_eq!(store.snapshot().progress, 40.0);

        for _ in 0..50 {
            tokio::time::sleep(TICK * 7).await;
            let p = store.snapshot().progress;
            assert!((40.0..=100.0).contains(&p));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stale_ticket_cannot_start() {
        let store = SessionStore::new();
        let old = store.begin();
        let _current = store.begin();
        let timer = ProgressTimer::new(store.clone(), TICK);

        assert!(!timer.start(old, 30.0, 60.0, SEGMENT));
        assert!(!timer.stop(old));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.snapshot().progress, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_halts_timer() {
        let store = SessionStore::new();
        let ticket = store.begin();
        let timer = ProgressTimer::new(store.clone(), TICK);
        timer.start(ticket, 0.0, 50.0, SEGMENT);
        drop(timer);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(store.snapshot().progress, 0.0);
    }
}
