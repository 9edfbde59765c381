use crate::error::Diagnostic;
use crate::placement::PlacementConfig;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FIXED_MINUTES: u32 = 60;
pub const DEFAULT_END_TITLE: &str = "Sales Ends";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Fixed,
    GenericNow,
    GenericScheduled,
    Daily,
    /// Unrecognized `timer_type`; counts down to the end instant.
    Unknown,
}

impl std::fmt::Display for TimerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TimerKind::Fixed => "fixed",
            TimerKind::GenericNow => "generic",
            TimerKind::GenericScheduled => "scheduled generic",
            TimerKind::Daily => "daily",
            TimerKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnExpiry {
    #[default]
    Hide,
    /// Fixed timers only.
    Repeat,
    ShowCustomTitle,
    DoNothing,
}

/// Immutable input to the countdown engine.
///
/// Generic start/end instants are wall-clock values; the engine resolves them
/// in the UTC offset of the `now` it is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerConfig {
    pub kind: TimerKind,
    pub fixed_duration_secs: u32,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub recurrence: Vec<Weekday>,
    pub date_range_start: Option<NaiveDate>,
    pub date_range_end: Option<NaiveDate>,
    pub daily_start: Option<NaiveTime>,
    pub daily_end: Option<NaiveTime>,
    pub on_expiry: OnExpiry,
    pub custom_end_title: String,
    pub persistence_key: Option<String>,
}

impl TimerConfig {
    fn blank(kind: TimerKind) -> Self {
        Self {
            kind,
            fixed_duration_secs: DEFAULT_FIXED_MINUTES * 60,
            start: None,
            end: None,
            recurrence: Vec::new(),
            date_range_start: None,
            date_range_end: None,
            daily_start: None,
            daily_end: None,
            on_expiry: OnExpiry::Hide,
            custom_end_title: DEFAULT_END_TITLE.to_string(),
            persistence_key: None,
        }
    }

    pub fn fixed(duration_secs: u32) -> Self {
        Self {
            fixed_duration_secs: duration_secs,
            ..Self::blank(TimerKind::Fixed)
        }
    }

    pub fn generic_now(end: NaiveDateTime) -> Self {
        Self {
            end: Some(end),
            ..Self::blank(TimerKind::GenericNow)
        }
    }

    pub fn generic_scheduled(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::blank(TimerKind::GenericScheduled)
        }
    }

    pub fn daily(
        recurrence: Vec<Weekday>,
        date_range: (NaiveDate, NaiveDate),
        window: (NaiveTime, NaiveTime),
    ) -> Self {
        Self {
            recurrence,
            date_range_start: Some(date_range.0),
            date_range_end: Some(date_range.1),
            daily_start: Some(window.0),
            daily_end: Some(window.1),
            ..Self::blank(TimerKind::Daily)
        }
    }

    pub fn with_on_expiry(mut self, on_expiry: OnExpiry) -> Self {
        self.on_expiry = on_expiry;
        self
    }

    pub fn with_persistence_key(mut self, key: impl Into<String>) -> Self {
        self.persistence_key = Some(key.into());
        self
    }

    pub fn with_custom_end_title(mut self, title: impl Into<String>) -> Self {
        self.custom_end_title = title.into();
        self
    }

    pub fn repeats(&self) -> bool {
        self.kind == TimerKind::Fixed && self.on_expiry == OnExpiry::Repeat
    }
}

/// A JSON scalar the admin UI may send as either a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl Scalar {
    /// Whole-number reading of the value. Numbers truncate toward zero and
    /// text keeps its leading signed digits, so `"1.5"` and `"15abc"` read
    /// as 1 and 15.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            Scalar::Float(n) if n.is_finite() => Some(n.trunc() as i64),
            Scalar::Float(_) => None,
            Scalar::Text(s) => leading_integer(s),
        }
    }
}

fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let unsigned = text.trim_start_matches(['+', '-']);
    if text.len() - unsigned.len() > 1 {
        return None;
    }
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .map_or(unsigned, |end| &unsigned[..end]);
    if digits.is_empty() {
        return None;
    }
    let magnitude = digits.parse::<i64>().ok()?;
    Some(if text.starts_with('-') { -magnitude } else { magnitude })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerLabels {
    pub days: Option<String>,
    pub hours: Option<String>,
    pub minutes: Option<String>,
    pub seconds: Option<String>,
}

/// The `timer_config` object of a countdown timer record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_minutes: Option<Scalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_days: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub once_it_ends: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_end_title: Option<String>,
}

/// Storefront view of a published countdown timer
/// (`GET /countdown-timers/config/{timer_id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Scalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sub_heading: String,
    #[serde(default)]
    pub timer_labels: TimerLabels,
    #[serde(default)]
    pub timer_type: String,
    #[serde(default)]
    pub timer_config: TimerSettings,
    #[serde(default)]
    pub placement_config: PlacementConfig,
    #[serde(default)]
    pub is_published: bool,
}

impl TimerRecord {
    pub fn kind(&self) -> TimerKind {
        match self.timer_type.as_str() {
            "fixed" => TimerKind::Fixed,
            "generic" => match self.timer_config.timer_start.as_deref() {
                Some("schedule") => TimerKind::GenericScheduled,
                _ => TimerKind::GenericNow,
            },
            "daily" => TimerKind::Daily,
            _ => TimerKind::Unknown,
        }
    }

    /// Key under which a fixed countdown's target survives page reloads.
    pub fn persistence_key(&self) -> Option<String> {
        let id = self
            .id
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| self.timer_id.clone())?;
        Some(format!("timer-cd-endtime-{}", id))
    }

    /// Convert into an engine config. Malformed fields are dropped and
    /// reported; the engine decides later whether a missing field matters.
    pub fn to_config(&self) -> (TimerConfig, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let kind = self.kind();
        let settings = &self.timer_config;
        let mut config = TimerConfig::blank(kind);

        match kind {
            TimerKind::Fixed => {
                config.fixed_duration_secs =
                    parse_fixed_minutes(settings.fixed_minutes.as_ref(), &mut diagnostics) * 60;
                config.persistence_key = self.persistence_key();
            }
            TimerKind::GenericNow | TimerKind::Unknown => {
                if kind == TimerKind::Unknown {
                    diagnostics.push(Diagnostic::UnknownTimerType(self.timer_type.clone()));
                }
                config.end = parse_datetime(
                    ("end_date", settings.end_date.as_deref()),
                    ("end_time", settings.end_time.as_deref()),
                    &mut diagnostics,
                );
            }
            TimerKind::GenericScheduled => {
                config.start = parse_datetime(
                    ("start_date", settings.start_date.as_deref()),
                    ("start_time", settings.start_time.as_deref()),
                    &mut diagnostics,
                );
                config.end = parse_datetime(
                    ("end_date", settings.end_date.as_deref()),
                    ("end_time", settings.end_time.as_deref()),
                    &mut diagnostics,
                );
            }
            TimerKind::Daily => {
                config.recurrence = parse_selected_days(settings.selected_days.as_deref(), &mut diagnostics);
                config.date_range_start =
                    parse_date("start_date", settings.start_date.as_deref(), &mut diagnostics);
                config.date_range_end =
                    parse_date("end_date", settings.end_date.as_deref(), &mut diagnostics);
                config.daily_start =
                    parse_time("start_time", settings.start_time.as_deref(), &mut diagnostics);
                config.daily_end =
                    parse_time("end_time", settings.end_time.as_deref(), &mut diagnostics);
            }
        }

        config.on_expiry = parse_on_expiry(settings.once_it_ends.as_deref(), kind, &mut diagnostics);
        if let Some(title) = settings.custom_end_title.as_deref().filter(|t| !t.trim().is_empty()) {
            config.custom_end_title = title.to_string();
        }

        (config, diagnostics)
    }
}

/// Map a UI day index (Monday=0..Sunday=6) to a weekday.
pub fn weekday_from_index(index: i64) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_fixed_minutes(value: Option<&Scalar>, diagnostics: &mut Vec<Diagnostic>) -> u32 {
    let Some(value) = value else {
        return DEFAULT_FIXED_MINUTES;
    };
    let minutes = value.as_integer();

    match minutes.and_then(|m| u32::try_from(m).ok()).filter(|m| *m > 0) {
        Some(m) => m.min(u32::MAX / 60),
        None => {
            diagnostics.push(Diagnostic::invalid(
                "fixed_minutes",
                value.to_string(),
                format!("expected a positive whole number, using {}", DEFAULT_FIXED_MINUTES),
            ));
            DEFAULT_FIXED_MINUTES
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(field: &'static str, value: Option<&str>, diagnostics: &mut Vec<Diagnostic>) -> Option<NaiveDate> {
    let raw = present(value)?;
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| diagnostics.push(Diagnostic::invalid(field, raw, e)))
        .ok()
}

fn parse_time(field: &'static str, value: Option<&str>, diagnostics: &mut Vec<Diagnostic>) -> Option<NaiveTime> {
    let raw = present(value)?;
    // The admin UI stores HH:MM; tolerate a trailing seconds component.
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| diagnostics.push(Diagnostic::invalid(field, raw, e)))
        .ok()
}

fn parse_datetime(
    date: (&'static str, Option<&str>),
    time: (&'static str, Option<&str>),
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<NaiveDateTime> {
    let date = parse_date(date.0, date.1, diagnostics);
    let time = parse_time(time.0, time.1, diagnostics);
    Some(date?.and_time(time?))
}

fn parse_selected_days(days: Option<&[i64]>, diagnostics: &mut Vec<Diagnostic>) -> Vec<Weekday> {
    let Some(days) = days else {
        return vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri];
    };

    let mut recurrence = Vec::with_capacity(days.len());
    for &index in days {
        match weekday_from_index(index) {
            Some(day) if !recurrence.contains(&day) => recurrence.push(day),
            Some(_) => {}
            None => diagnostics.push(Diagnostic::invalid(
                "selected_days",
                index.to_string(),
                "day index must be between 0 (Monday) and 6 (Sunday)",
            )),
        }
    }
    recurrence
}

fn parse_on_expiry(value: Option<&str>, kind: TimerKind, diagnostics: &mut Vec<Diagnostic>) -> OnExpiry {
    match value.map(str::trim) {
        None | Some("") | Some("hide") => OnExpiry::Hide,
        Some("custom") => OnExpiry::ShowCustomTitle,
        Some("nothing") => OnExpiry::DoNothing,
        Some("repeat") if kind == TimerKind::Fixed => OnExpiry::Repeat,
        Some("repeat") => {
            diagnostics.push(Diagnostic::UnsupportedExpiry {
                action: "repeat".to_string(),
                kind: kind.to_string(),
            });
            OnExpiry::DoNothing
        }
        Some(other) => {
            diagnostics.push(Diagnostic::invalid(
                "once_it_ends",
                other,
                "expected one of hide, repeat, custom, nothing",
            ));
            OnExpiry::Hide
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> TimerRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_fixed_record_defaults() {
        let rec = record(json!({
            "id": 7,
            "title": "Hurry!",
            "timer_type": "fixed",
            "timer_config": {}
        }));
        let (config, diags) = rec.to_config();

        assert!(diags.is_empty());
        assert_eq!(config.kind, TimerKind::Fixed);
        assert_eq!(config.fixed_duration_secs, 3600);
        assert_eq!(config.on_expiry, OnExpiry::Hide);
        assert_eq!(config.custom_end_title, DEFAULT_END_TITLE);
        assert_eq!(config.persistence_key.as_deref(), Some("timer-cd-endtime-7"));
    }

    #[test]
    fn test_fixed_minutes_as_string() {
        let rec = record(json!({
            "id": 1,
            "timer_type": "fixed",
            "timer_config": { "fixed_minutes": "15", "once_it_ends": "repeat" }
        }));
        let (config, diags) = rec.to_config();

        assert!(diags.is_empty());
        assert_eq!(config.fixed_duration_secs, 900);
        assert!(config.repeats());
    }

    #[test]
    fn test_fixed_minutes_garbage_falls_back() {
        let rec = record(json!({
            "id": 1,
            "timer_type": "fixed",
            "timer_config": { "fixed_minutes": "soon" }
        }));
        let (config, diags) = rec.to_config();

        assert_eq!(config.fixed_duration_secs, 3600);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_fixed_minutes_keeps_leading_digits() {
        for (raw, secs) in [(json!("1.5"), 60), (json!(1.5), 60), (json!("15abc"), 900), (json!(" +20 "), 1200)] {
            let rec = record(json!({
                "timer_type": "fixed",
                "timer_config": { "fixed_minutes": raw.clone() }
            }));
            let (config, diags) = rec.to_config();
            assert_eq!(config.fixed_duration_secs, secs, "fixed_minutes {}", raw);
            assert!(diags.is_empty());
        }
    }

    #[test]
    fn test_scalar_as_integer() {
        assert_eq!(Scalar::Text("-7 days".to_string()).as_integer(), Some(-7));
        assert_eq!(Scalar::Text("abc".to_string()).as_integer(), None);
        assert_eq!(Scalar::Text("--3".to_string()).as_integer(), None);
        assert_eq!(Scalar::Text("-".to_string()).as_integer(), None);
        assert_eq!(Scalar::Float(f64::NAN).as_integer(), None);
        assert_eq!(Scalar::Float(-2.9).as_integer(), Some(-2));
    }

    #[test]
    fn test_missing_timer_type_counts_to_end_date() {
        let rec = record(json!({
            "id": 3,
            "timer_config": { "end_date": "2026-12-01", "end_time": "10:00" }
        }));
        let (config, diags) = rec.to_config();

        assert_eq!(rec.kind(), TimerKind::Unknown);
        assert_eq!(config.kind, TimerKind::Unknown);
        assert!(config.end.is_some());
        assert!(diags
            .iter()
            .any(|d| matches!(d, Diagnostic::UnknownTimerType(t) if t.is_empty())));
    }

    #[test]
    fn test_generic_schedule_maps_to_scheduled() {
        let rec = record(json!({
            "timer_type": "generic",
            "timer_config": {
                "timer_start": "schedule",
                "start_date": "2026-11-01",
                "start_time": "09:00",
                "end_date": "2026-11-02",
                "end_time": "18:30"
            }
        }));
        let (config, diags) = rec.to_config();

        assert!(diags.is_empty());
        assert_eq!(config.kind, TimerKind::GenericScheduled);
        assert_eq!(
            config.start,
            NaiveDate::from_ymd_opt(2026, 11, 1).unwrap().and_hms_opt(9, 0, 0)
        );
        assert_eq!(
            config.end,
            NaiveDate::from_ymd_opt(2026, 11, 2).unwrap().and_hms_opt(18, 30, 0)
        );
    }

    #[test]
    fn test_malformed_end_date_is_dropped() {
        let rec = record(json!({
            "timer_type": "generic",
            "timer_config": { "end_date": "31/12/2026", "end_time": "23:59" }
        }));
        let (config, diags) = rec.to_config();

        assert_eq!(config.kind, TimerKind::GenericNow);
        assert!(config.end.is_none());
        assert!(matches!(
            diags.as_slice(),
            [Diagnostic::InvalidField { field: "end_date", .. }]
        ));
    }

    #[test]
    fn test_daily_selected_days() {
        let rec = record(json!({
            "timer_type": "daily",
            "timer_config": {
                "selected_days": [0, 2, 2, 9],
                "start_date": "2026-01-01",
                "end_date": "2026-12-31",
                "start_time": "09:00",
                "end_time": "17:00"
            }
        }));
        let (config, diags) = rec.to_config();

        assert_eq!(config.recurrence, vec![Weekday::Mon, Weekday::Wed]);
        assert_eq!(diags.len(), 1);
        assert_eq!(config.daily_start, NaiveTime::from_hms_opt(9, 0, 0));
    }

    #[test]
    fn test_daily_defaults_to_weekdays() {
        let rec = record(json!({ "timer_type": "daily", "timer_config": {} }));
        let (config, _) = rec.to_config();
        assert_eq!(config.recurrence.len(), 5);
        assert!(!config.recurrence.contains(&Weekday::Sat));
    }

    #[test]
    fn test_repeat_rejected_for_generic() {
        let rec = record(json!({
            "timer_type": "generic",
            "timer_config": { "once_it_ends": "repeat" }
        }));
        let (config, diags) = rec.to_config();

        assert_eq!(config.on_expiry, OnExpiry::DoNothing);
        assert!(matches!(diags.as_slice(), [Diagnostic::UnsupportedExpiry { .. }]));
    }

    #[test]
    fn test_unknown_type_reported() {
        let rec = record(json!({ "timer_type": "weekly", "timer_config": {} }));
        let (config, diags) = rec.to_config();

        assert_eq!(config.kind, TimerKind::Unknown);
        assert_eq!(diags, vec![Diagnostic::UnknownTimerType("weekly".to_string())]);
    }

    #[test]
    fn test_custom_title_used() {
        let rec = record(json!({
            "timer_type": "fixed",
            "timer_config": { "once_it_ends": "custom", "custom_end_title": "Deal over" }
        }));
        let (config, _) = rec.to_config();

        assert_eq!(config.on_expiry, OnExpiry::ShowCustomTitle);
        assert_eq!(config.custom_end_title, "Deal over");
        assert!(config.persistence_key.is_none());
    }
}
