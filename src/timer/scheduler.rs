use crate::store::TargetStore;
use crate::timer::clock::Clock;
use crate::timer::countdown::Countdown;
use crate::timer::engine::{Evaluation, Phase};
use chrono::{DateTime, FixedOffset};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Tick periods per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub active: Duration,
    pub pending: Duration,
    pub inactive: Duration,
    /// One-off early re-check right after entering a coarse phase.
    pub recheck: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            active: Duration::from_secs(1),
            pending: Duration::from_secs(10),
            inactive: Duration::from_secs(30),
            recheck: Duration::from_secs(1),
        }
    }
}

/// Adaptive tick rate: fine while counting down, coarse while waiting for a
/// window, none once expired.
#[derive(Debug, Clone)]
pub struct Pacer {
    cadence: Cadence,
    rechecked: bool,
}

impl Pacer {
    pub fn new(cadence: Cadence) -> Self {
        Self {
            cadence,
            rechecked: false,
        }
    }

    /// Delay before the next tick, or `None` when the loop should stop.
    pub fn next(&mut self, evaluation: &Evaluation, now: DateTime<FixedOffset>) -> Option<Duration> {
        let coarse = match evaluation.phase {
            Phase::Expired => return None,
            Phase::Active => {
                self.rechecked = false;
                return Some(self.cadence.active);
            }
            Phase::Pending => self.cadence.pending,
            Phase::Inactive => self.cadence.inactive,
        };

        if !self.rechecked {
            self.rechecked = true;
            return Some(self.cadence.recheck.min(coarse));
        }

        // Wake up on the opening instant instead of overshooting it by a poll
        let until_change = evaluation
            .next_change
            .and_then(|at| at.signed_duration_since(now).to_std().ok())
            .map(|until| until.max(Duration::from_millis(1)));

        Some(match until_change {
            Some(until) => coarse.min(until),
            None => coarse,
        })
    }
}

/// Owns a running tick loop. Dropping the handle also stops the loop.
pub struct TickerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TickerHandle {
    /// Stop scheduling ticks and wait for the loop to exit.
    pub async fn stop(self) {
        let TickerHandle { shutdown, task } = self;
        let _ = shutdown.send(true);
        if let Err(e) = task.await {
            tracing::warn!("countdown ticker ended abnormally: {}", e);
        }
    }

    /// Wait for the loop to end on its own (terminal phase).
    pub async fn finished(self) {
        let TickerHandle { shutdown, task } = self;
        if let Err(e) = task.await {
            tracing::warn!("countdown ticker ended abnormally: {}", e);
        }
        drop(shutdown);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Evaluate once immediately, then keep evaluating on the cadence, handing
/// every result to `consumer`.
pub fn spawn_ticker<S, C, F>(
    mut countdown: Countdown<S>,
    clock: C,
    cadence: Cadence,
    mut consumer: F,
) -> TickerHandle
where
    S: TargetStore + 'static,
    C: Clock + 'static,
    F: FnMut(&Evaluation) + Send + 'static,
{
    let (shutdown, mut stopped) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut pacer = Pacer::new(cadence);
        loop {
            let now = clock.now();
            let evaluation = countdown.tick(now);
            consumer(&evaluation);

            let Some(delay) = pacer.next(&evaluation, now) else {
                tracing::debug!(kind = %countdown.config().kind, "countdown reached a terminal phase");
                break;
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stopped.changed() => break,
            }
        }
    });

    TickerHandle { shutdown, task }
}
