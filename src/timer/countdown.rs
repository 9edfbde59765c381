use crate::error::Diagnostic;
use crate::store::TargetStore;
use crate::timer::engine::{Evaluation, PersistAction, Phase, evaluate, settle};
use crate::timer::models::{TimerConfig, TimerKind};
use chrono::{DateTime, FixedOffset};

/// One engine instance: a widget mount or an admin preview.
///
/// A fixed timer is armed on its first tick (reusing a persisted target when
/// one is still in the future) and later ticks settle against that target.
/// Every other kind is re-evaluated from its config on each tick.
///
/// Once a non-daily timer expires the session keeps answering with that
/// `Expired` result, even if the clock later steps backwards.
pub struct Countdown<S: TargetStore> {
    config: TimerConfig,
    store: S,
    armed: Option<DateTime<FixedOffset>>,
    terminal: Option<Evaluation>,
    last_phase: Option<Phase>,
    reported: Vec<Diagnostic>,
}

impl<S: TargetStore> Countdown<S> {
    pub fn new(config: TimerConfig, store: S) -> Self {
        Self {
            config,
            store,
            armed: None,
            terminal: None,
            last_phase: None,
            reported: Vec::new(),
        }
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// True once the countdown reached a terminal `Expired` result.
    pub fn is_finished(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn tick(&mut self, now: DateTime<FixedOffset>) -> Evaluation {
        if let Some(terminal) = &self.terminal {
            return terminal.clone();
        }

        let mut evaluation = match (self.config.kind, self.armed) {
            (TimerKind::Fixed, Some(target)) => {
                let mut settled = settle(&self.config, now, target);
                self.persist(&mut settled);
                settled
            }
            (TimerKind::Fixed, None) => self.arm(now),
            _ => evaluate(&self.config, now, None),
        };

        if self.config.kind == TimerKind::Fixed {
            self.armed = evaluation.target.or(self.armed);
        }
        // Daily windows reopen, so only one-shot kinds latch
        if evaluation.is_terminal() && self.config.kind != TimerKind::Daily {
            let mut terminal = evaluation.clone();
            terminal.persist = PersistAction::Keep;
            self.terminal = Some(terminal);
        }

        self.report(&mut evaluation);
        evaluation
    }

    fn arm(&mut self, now: DateTime<FixedOffset>) -> Evaluation {
        let Some(key) = self.config.persistence_key.clone() else {
            return evaluate(&self.config, now, None);
        };

        let config = &self.config;
        let mut outcome: Option<Evaluation> = None;
        let result = self.store.update(&key, &mut |persisted| {
            let evaluation = evaluate(config, now, persisted);
            let write = match evaluation.persist {
                PersistAction::Store(target) => Some(target.to_rfc3339()),
                PersistAction::Keep | PersistAction::Clear => None,
            };
            outcome = Some(evaluation);
            write
        });

        match (result, outcome) {
            (Ok(()), Some(evaluation)) => evaluation,
            (Err(e), Some(mut evaluation)) => {
                evaluation
                    .diagnostics
                    .push(Diagnostic::StoreUnavailable(format!("{:#}", e)));
                evaluation
            }
            (result, None) => {
                let mut evaluation = evaluate(config, now, None);
                let reason = match result {
                    Err(e) => format!("{:#}", e),
                    Ok(()) => "store skipped the update".to_string(),
                };
                evaluation.diagnostics.push(Diagnostic::StoreUnavailable(reason));
                evaluation
            }
        }
    }

    fn persist(&self, evaluation: &mut Evaluation) {
        let Some(key) = self.config.persistence_key.as_deref() else {
            return;
        };

        let result = match evaluation.persist {
            PersistAction::Keep => return,
            PersistAction::Store(target) => self.store.set(key, &target.to_rfc3339()),
            PersistAction::Clear => self.store.remove(key),
        };

        if let Err(e) = result {
            evaluation
                .diagnostics
                .push(Diagnostic::StoreUnavailable(format!("{:#}", e)));
        }
    }

    fn report(&mut self, evaluation: &mut Evaluation) {
        if self.last_phase != Some(evaluation.phase) {
            tracing::debug!(
                kind = %self.config.kind,
                phase = ?evaluation.phase,
                target = ?evaluation.target,
                "countdown phase changed"
            );
            self.last_phase = Some(evaluation.phase);
        }

        // Only log a diagnostic set once; ticks repeat every second
        if evaluation.diagnostics != self.reported {
            for diagnostic in &evaluation.diagnostics {
                tracing::warn!(kind = %self.config.kind, "{}", diagnostic);
            }
            self.reported = evaluation.diagnostics.clone();
        }
    }
}
