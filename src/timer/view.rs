use crate::timer::engine::{Evaluation, Phase, Remaining};
use crate::timer::models::{OnExpiry, TimerConfig, TimerLabels};
use serde::Serialize;

/// What a widget (storefront block or admin preview) should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum WidgetView {
    Hidden,
    Countdown { remaining: Remaining },
    EndTitle { title: String },
    /// Expired with no action: the zeroed clock stays on screen.
    Frozen,
}

impl WidgetView {
    pub fn from_evaluation(evaluation: &Evaluation, config: &TimerConfig) -> Self {
        match evaluation.phase {
            Phase::Pending | Phase::Inactive => WidgetView::Hidden,
            Phase::Active => WidgetView::Countdown {
                remaining: evaluation.remaining,
            },
            Phase::Expired => match config.on_expiry {
                OnExpiry::Hide => WidgetView::Hidden,
                OnExpiry::ShowCustomTitle => WidgetView::EndTitle {
                    title: config.custom_end_title.clone(),
                },
                // A repeating timer never surfaces Expired; freeze if it somehow does
                OnExpiry::DoNothing | OnExpiry::Repeat => WidgetView::Frozen,
            },
        }
    }

    /// One-line text rendering with the record's unit labels.
    pub fn render(&self, labels: &TimerLabels) -> String {
        match self {
            WidgetView::Hidden => String::new(),
            WidgetView::EndTitle { title } => title.clone(),
            WidgetView::Countdown { remaining } => render_clock(remaining, labels),
            WidgetView::Frozen => render_clock(&Remaining::ZERO, labels),
        }
    }
}

fn render_clock(remaining: &Remaining, labels: &TimerLabels) -> String {
    let label = |value: &Option<String>, fallback: &str| -> String {
        value.clone().unwrap_or_else(|| fallback.to_string())
    };
    format!(
        "{:02} {} : {:02} {} : {:02} {} : {:02} {}",
        remaining.days,
        label(&labels.days, "Days"),
        remaining.hours,
        label(&labels.hours, "Hrs"),
        remaining.minutes,
        label(&labels.minutes, "Mins"),
        remaining.seconds,
        label(&labels.seconds, "Secs"),
    )
}
