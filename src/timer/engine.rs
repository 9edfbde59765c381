//! Countdown evaluation.
//!
//! Everything here is a pure function of `(config, now, persisted)`. Side
//! effects the caller should apply (storing or clearing a fixed timer's
//! target) are returned as a [`PersistAction`] instead of being performed.

use crate::error::Diagnostic;
use crate::timer::models::{TimerConfig, TimerKind};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDateTime};
use serde::Serialize;

/// Added to a fresh fixed target so the first tick does not land a second early.
pub const FIXED_START_OFFSET_MS: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Scheduled start not reached yet.
    Pending,
    Active,
    /// Target reached; the caller applies the expiry action.
    Expired,
    /// Outside a recurring (or unusable) window.
    Inactive,
}

/// Why nothing is being counted down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleReason {
    BeforeStart,
    NotScheduledToday,
    OutsideDateRange,
    BeforeWindow,
    WindowClosed,
    MissingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum PersistAction {
    Keep,
    Store(DateTime<FixedOffset>),
    Clear,
}

/// Time left, floor-decomposed. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Remaining {
    pub days: u64,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Remaining {
    pub const ZERO: Remaining = Remaining {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    pub fn from_seconds(total: u64) -> Self {
        Self {
            days: total / 86_400,
            hours: ((total % 86_400) / 3600) as u32,
            minutes: ((total % 3600) / 60) as u32,
            seconds: (total % 60) as u32,
        }
    }

    /// Whole seconds of `delta`, rounded down; negative deltas clamp to zero.
    pub fn from_duration(delta: Duration) -> Self {
        let millis = delta.num_milliseconds().max(0);
        Self::from_seconds((millis / 1000) as u64)
    }

    pub fn total_seconds(&self) -> u64 {
        self.days * 86_400
            + u64::from(self.hours) * 3600
            + u64::from(self.minutes) * 60
            + u64::from(self.seconds)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl std::fmt::Display for Remaining {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub phase: Phase,
    pub remaining: Remaining,
    pub target: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_reason: Option<IdleReason>,
    /// When the engine expects the phase to change without a config change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_change: Option<DateTime<FixedOffset>>,
    pub persist: PersistAction,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Evaluation {
    fn idle(phase: Phase, reason: IdleReason, next_change: Option<DateTime<FixedOffset>>) -> Self {
        Self {
            phase,
            remaining: Remaining::ZERO,
            target: None,
            idle_reason: Some(reason),
            next_change,
            persist: PersistAction::Keep,
            diagnostics: Vec::new(),
        }
    }

    /// Expired is final for one activation; nothing more will happen.
    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Expired
    }

    /// Pending and Inactive both mean "nothing to show yet".
    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Pending | Phase::Inactive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Armed {
        at: DateTime<FixedOffset>,
        persist: PersistAction,
    },
    Idle {
        phase: Phase,
        reason: IdleReason,
        next_change: Option<DateTime<FixedOffset>>,
    },
}

impl Target {
    fn missing(kind: TimerKind) -> Self {
        let phase = match kind {
            TimerKind::GenericScheduled => Phase::Pending,
            _ => Phase::Inactive,
        };
        Target::Idle {
            phase,
            reason: IdleReason::MissingConfig,
            next_change: None,
        }
    }
}

fn require<T: Copy>(
    value: Option<T>,
    kind: TimerKind,
    field: &'static str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<T> {
    if value.is_none() {
        diagnostics.push(Diagnostic::MissingField {
            kind: kind.to_string(),
            field,
        });
    }
    value
}

/// Resolve a wall-clock instant in the offset `now` is expressed in.
fn at_offset(
    naive: NaiveDateTime,
    now: &DateTime<FixedOffset>,
    field: &'static str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<DateTime<FixedOffset>> {
    let resolved = naive.and_local_timezone(*now.offset()).single();
    if resolved.is_none() {
        diagnostics.push(Diagnostic::invalid(
            field,
            naive.to_string(),
            "not representable in the local offset",
        ));
    }
    resolved
}

/// A fresh fixed-duration target starting at `now`.
pub fn fixed_target(config: &TimerConfig, now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    let delta = Duration::seconds(i64::from(config.fixed_duration_secs))
        + Duration::milliseconds(FIXED_START_OFFSET_MS);
    now.checked_add_signed(delta)
}

pub fn parse_persisted(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value.trim()).ok()
}

/// Decide what instant the countdown is heading for, if any.
pub fn compute_target(
    config: &TimerConfig,
    now: DateTime<FixedOffset>,
    persisted: Option<&str>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Target {
    let kind = config.kind;
    match kind {
        TimerKind::Fixed => {
            match persisted {
                Some(raw) => match parse_persisted(raw) {
                    Some(stored) if stored > now => {
                        return Target::Armed {
                            at: stored,
                            persist: PersistAction::Keep,
                        };
                    }
                    Some(_) => {}
                    None => diagnostics.push(Diagnostic::CorruptPersistedTarget {
                        key: config.persistence_key.clone().unwrap_or_default(),
                        value: raw.to_string(),
                    }),
                },
                None => {}
            }

            match fixed_target(config, now) {
                Some(at) => Target::Armed {
                    at,
                    persist: PersistAction::Store(at),
                },
                None => {
                    diagnostics.push(Diagnostic::invalid(
                        "fixed_minutes",
                        config.fixed_duration_secs.to_string(),
                        "duration overflows the calendar",
                    ));
                    Target::missing(kind)
                }
            }
        }
        TimerKind::GenericNow | TimerKind::Unknown => {
            let Some(end) = require(config.end, kind, "end_date", diagnostics)
                .and_then(|end| at_offset(end, &now, "end_date", diagnostics))
            else {
                return Target::missing(kind);
            };
            Target::Armed {
                at: end,
                persist: PersistAction::Keep,
            }
        }
        TimerKind::GenericScheduled => {
            let start = require(config.start, kind, "start_date", diagnostics)
                .and_then(|start| at_offset(start, &now, "start_date", diagnostics));
            let end = require(config.end, kind, "end_date", diagnostics)
                .and_then(|end| at_offset(end, &now, "end_date", diagnostics));
            let (Some(start), Some(end)) = (start, end) else {
                return Target::missing(kind);
            };

            if now < start {
                Target::Idle {
                    phase: Phase::Pending,
                    reason: IdleReason::BeforeStart,
                    next_change: Some(start),
                }
            } else {
                Target::Armed {
                    at: end,
                    persist: PersistAction::Keep,
                }
            }
        }
        TimerKind::Daily => daily_target(config, now, diagnostics),
    }
}

fn daily_target(
    config: &TimerConfig,
    now: DateTime<FixedOffset>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Target {
    let kind = config.kind;
    let range_start = require(config.date_range_start, kind, "start_date", diagnostics);
    let range_end = require(config.date_range_end, kind, "end_date", diagnostics);
    let window_start = require(config.daily_start, kind, "start_time", diagnostics);
    let window_end = require(config.daily_end, kind, "end_time", diagnostics);
    let (Some(range_start), Some(range_end), Some(window_start), Some(window_end)) =
        (range_start, range_end, window_start, window_end)
    else {
        return Target::missing(kind);
    };

    if window_start >= window_end {
        diagnostics.push(Diagnostic::invalid(
            "end_time",
            window_end.format("%H:%M").to_string(),
            "daily window must end after it starts",
        ));
        return Target::missing(kind);
    }

    let idle = |reason, next_change| Target::Idle {
        phase: Phase::Inactive,
        reason,
        next_change,
    };

    let today = now.date_naive();
    if !config.recurrence.contains(&now.weekday()) {
        return idle(IdleReason::NotScheduledToday, None);
    }
    if today < range_start || today > range_end {
        return idle(IdleReason::OutsideDateRange, None);
    }

    let time_of_day = now.time();
    if time_of_day < window_start {
        let opens = at_offset(today.and_time(window_start), &now, "start_time", diagnostics);
        return idle(IdleReason::BeforeWindow, opens);
    }
    if time_of_day >= window_end {
        return idle(IdleReason::WindowClosed, None);
    }

    match at_offset(today.and_time(window_end), &now, "end_time", diagnostics) {
        Some(at) => Target::Armed {
            at,
            persist: PersistAction::Keep,
        },
        None => Target::missing(kind),
    }
}

/// Compare an armed target against `now` and apply the expiry policy.
pub fn settle(
    config: &TimerConfig,
    now: DateTime<FixedOffset>,
    target: DateTime<FixedOffset>,
) -> Evaluation {
    let left = target.signed_duration_since(now);
    if left > Duration::zero() {
        return Evaluation {
            phase: Phase::Active,
            remaining: Remaining::from_duration(left),
            target: Some(target),
            idle_reason: None,
            next_change: Some(target),
            persist: PersistAction::Keep,
            diagnostics: Vec::new(),
        };
    }

    if config.repeats() {
        if let Some(fresh) = fixed_target(config, now) {
            return Evaluation {
                phase: Phase::Active,
                remaining: Remaining::from_duration(fresh.signed_duration_since(now)),
                target: Some(fresh),
                idle_reason: None,
                next_change: Some(fresh),
                persist: PersistAction::Store(fresh),
                diagnostics: Vec::new(),
            };
        }
    }

    Evaluation {
        phase: Phase::Expired,
        remaining: Remaining::ZERO,
        target: Some(target),
        idle_reason: None,
        next_change: None,
        persist: if config.kind == TimerKind::Fixed {
            PersistAction::Clear
        } else {
            PersistAction::Keep
        },
        diagnostics: Vec::new(),
    }
}

/// Evaluate a timer from scratch.
pub fn evaluate(
    config: &TimerConfig,
    now: DateTime<FixedOffset>,
    persisted: Option<&str>,
) -> Evaluation {
    let mut diagnostics = Vec::new();
    let mut evaluation = match compute_target(config, now, persisted, &mut diagnostics) {
        Target::Armed { at, persist } => {
            let mut settled = settle(config, now, at);
            if settled.persist == PersistAction::Keep {
                settled.persist = persist;
            }
            settled
        }
        Target::Idle {
            phase,
            reason,
            next_change,
        } => Evaluation::idle(phase, reason, next_change),
    };
    evaluation.diagnostics = diagnostics;
    evaluation
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Weekday};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
    }

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_remaining_decomposition() {
        let r = Remaining::from_seconds(2 * 86_400 + 3 * 3600 + 4 * 60 + 5);
        assert_eq!(
            r,
            Remaining {
                days: 2,
                hours: 3,
                minutes: 4,
                seconds: 5
            }
        );
        assert_eq!(r.to_string(), "02:03:04:05");
        assert_eq!(r.total_seconds(), 2 * 86_400 + 3 * 3600 + 4 * 60 + 5);
    }

    #[test]
    fn test_remaining_floors_and_clamps() {
        assert_eq!(Remaining::from_duration(Duration::milliseconds(1999)).seconds, 1);
        assert!(Remaining::from_duration(Duration::seconds(-5)).is_zero());
    }

    #[test]
    fn test_fixed_fresh_target_includes_offset() {
        let now = at(2026, 10, 19, 12, 0, 0);
        let config = TimerConfig::fixed(60);
        let eval = evaluate(&config, now, None);

        let expected = now + Duration::milliseconds(60_500);
        assert_eq!(eval.phase, Phase::Active);
        assert_eq!(eval.target, Some(expected));
        assert_eq!(eval.persist, PersistAction::Store(expected));
        assert_eq!(eval.remaining.total_seconds(), 60);
    }

    #[test]
    fn test_fixed_reuses_future_persisted() {
        let now = at(2026, 10, 19, 12, 0, 0);
        let stored = now + Duration::seconds(42);
        let config = TimerConfig::fixed(3600);
        let eval = evaluate(&config, now, Some(&stored.to_rfc3339()));

        assert_eq!(eval.target, Some(stored));
        assert_eq!(eval.persist, PersistAction::Keep);
        assert_eq!(eval.remaining.seconds, 42);
    }

    #[test]
    fn test_fixed_past_persisted_restarts() {
        let now = at(2026, 10, 19, 12, 0, 0);
        let stale = now - Duration::seconds(1);
        let config = TimerConfig::fixed(120);
        let eval = evaluate(&config, now, Some(&stale.to_rfc3339()));

        assert_eq!(eval.phase, Phase::Active);
        assert!(matches!(eval.persist, PersistAction::Store(_)));
        assert!(eval.diagnostics.is_empty());
    }

    #[test]
    fn test_fixed_corrupt_persisted_discarded() {
        let now = at(2026, 10, 19, 12, 0, 0);
        let config = TimerConfig::fixed(120).with_persistence_key("timer-cd-endtime-3");
        let eval = evaluate(&config, now, Some("not a date"));

        assert_eq!(eval.phase, Phase::Active);
        assert!(matches!(
            eval.diagnostics.as_slice(),
            [Diagnostic::CorruptPersistedTarget { key, .. }] if key == "timer-cd-endtime-3"
        ));
    }

    #[test]
    fn test_generic_now_missing_end_is_inactive() {
        let mut config = TimerConfig::generic_now(naive(2026, 12, 1, 0, 0));
        config.end = None;
        let eval = evaluate(&config, at(2026, 10, 19, 12, 0, 0), None);

        assert_eq!(eval.phase, Phase::Inactive);
        assert_eq!(eval.idle_reason, Some(IdleReason::MissingConfig));
        assert!(eval.remaining.is_zero());
        assert_eq!(eval.diagnostics.len(), 1);
    }

    #[test]
    fn test_scheduled_missing_start_is_pending() {
        let mut config = TimerConfig::generic_scheduled(naive(2026, 1, 1, 0, 0), naive(2026, 12, 1, 0, 0));
        config.start = None;
        let eval = evaluate(&config, at(2026, 10, 19, 12, 0, 0), None);

        assert_eq!(eval.phase, Phase::Pending);
        assert_eq!(eval.idle_reason, Some(IdleReason::MissingConfig));
    }

    #[test]
    fn test_generic_resolved_in_now_offset() {
        let config = TimerConfig::generic_now(naive(2026, 10, 19, 18, 0));
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = plus_two.with_ymd_and_hms(2026, 10, 19, 17, 0, 0).unwrap();
        let eval = evaluate(&config, now, None);

        assert_eq!(eval.remaining.total_seconds(), 3600);
        assert_eq!(eval.target.unwrap().offset(), &plus_two);
    }

    #[test]
    fn test_unknown_kind_counts_to_end() {
        let mut config = TimerConfig::generic_now(naive(2026, 10, 19, 13, 0));
        config.kind = TimerKind::Unknown;
        let eval = evaluate(&config, at(2026, 10, 19, 12, 0, 0), None);

        assert_eq!(eval.phase, Phase::Active);
        assert_eq!(eval.remaining.hours, 1);
    }

    fn weekday_window() -> TimerConfig {
        TimerConfig::daily(
            vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
            (
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            ),
            (
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            ),
        )
    }

    #[test]
    fn test_daily_outside_date_range() {
        // 2027-01-04 is a Monday, past the end of the range
        let eval = evaluate(&weekday_window(), at(2027, 1, 4, 10, 0, 0), None);
        assert_eq!(eval.idle_reason, Some(IdleReason::OutsideDateRange));
    }

    #[test]
    fn test_daily_range_is_inclusive() {
        // 2026-12-31 is a Thursday
        let eval = evaluate(&weekday_window(), at(2026, 12, 31, 16, 0, 0), None);
        assert_eq!(eval.phase, Phase::Active);
        assert_eq!(eval.remaining.hours, 1);
    }

    #[test]
    fn test_daily_before_window_reports_opening() {
        // 2026-10-19 is a Monday
        let eval = evaluate(&weekday_window(), at(2026, 10, 19, 8, 0, 0), None);
        assert_eq!(eval.idle_reason, Some(IdleReason::BeforeWindow));
        assert_eq!(eval.next_change, Some(at(2026, 10, 19, 9, 0, 0)));
    }

    #[test]
    fn test_daily_inverted_window_never_opens() {
        let mut config = weekday_window();
        config.daily_start = NaiveTime::from_hms_opt(18, 0, 0);
        let eval = evaluate(&config, at(2026, 10, 19, 12, 0, 0), None);

        assert_eq!(eval.phase, Phase::Inactive);
        assert_eq!(eval.idle_reason, Some(IdleReason::MissingConfig));
        assert_eq!(eval.diagnostics.len(), 1);
    }

    #[test]
    fn test_daily_missing_fields_all_reported() {
        let mut config = weekday_window();
        config.daily_start = None;
        config.date_range_end = None;
        let eval = evaluate(&config, at(2026, 10, 19, 12, 0, 0), None);

        assert_eq!(eval.phase, Phase::Inactive);
        assert_eq!(eval.diagnostics.len(), 2);
    }

    #[test]
    fn test_expired_generic_keeps_target() {
        let config = TimerConfig::generic_now(naive(2026, 10, 19, 11, 0));
        let eval = evaluate(&config, at(2026, 10, 19, 12, 0, 0), None);

        assert_eq!(eval.phase, Phase::Expired);
        assert_eq!(eval.target, Some(at(2026, 10, 19, 11, 0, 0)));
        assert_eq!(eval.persist, PersistAction::Keep);
        assert!(eval.is_terminal());
    }

    #[test]
    fn test_settle_fixed_expiry_clears_store() {
        let now = at(2026, 10, 19, 12, 0, 0);
        let eval = settle(&TimerConfig::fixed(60), now, now);
        assert_eq!(eval.phase, Phase::Expired);
        assert_eq!(eval.persist, PersistAction::Clear);
    }
}
