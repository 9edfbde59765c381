use crate::OutputFormat;
use crate::commands::{Source, current_time, load_timer, open_store};
use crate::config::Config;
use crate::error::Diagnostic;
use crate::placement::{PageType, PlacementConfig};
use crate::store::{MemoryTargetStore, TargetStore};
use crate::timer::{Countdown, Evaluation, TimerKind, TimerRecord, WidgetView};
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PreviewReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_id: Option<String>,
    pub title: String,
    pub kind: String,
    pub now: DateTime<FixedOffset>,
    #[serde(flatten)]
    pub evaluation: Evaluation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageType>,
    pub placed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_position: Option<String>,
    pub display: WidgetView,
    pub rendered: String,
}

/// Evaluate a timer once, as a freshly mounted widget would.
pub fn preview(
    config: &Config,
    source: &Source,
    at: Option<DateTime<FixedOffset>>,
    page: Option<&str>,
    persist: bool,
    format: OutputFormat,
) -> Result<()> {
    let record = load_timer(config, source)?;
    let now = match at {
        Some(at) => at,
        None => current_time(config)?,
    };

    let report = if persist && record.kind() == TimerKind::Fixed {
        evaluate_record(&record, open_store(config)?, now, page)
    } else {
        evaluate_record(&record, MemoryTargetStore::new(), now, page)
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize preview")?;
            println!("{}", json);
        }
        OutputFormat::Text => print_text(&report),
    }
    Ok(())
}

pub fn evaluate_record<S: TargetStore>(
    record: &TimerRecord,
    store: S,
    now: DateTime<FixedOffset>,
    page: Option<&str>,
) -> PreviewReport {
    let (timer_config, record_diagnostics) = record.to_config();
    let mut countdown = Countdown::new(timer_config, store);
    let mut evaluation = countdown.tick(now);
    merge_diagnostics(&mut evaluation, record_diagnostics);

    let page = PlacementConfig::page_for(page);
    let placed = record.placement_config.shows_on(page);
    let display = if placed {
        WidgetView::from_evaluation(&evaluation, countdown.config())
    } else {
        tracing::debug!(?page, "countdown timer not placed on this page");
        WidgetView::Hidden
    };
    PreviewReport {
        timer_id: record.timer_id.clone(),
        title: record.title.clone(),
        kind: record.kind().to_string(),
        now,
        page,
        placed,
        display_position: record.placement_config.display_position.clone(),
        rendered: display.render(&record.timer_labels),
        display,
        evaluation,
    }
}

/// Record-level diagnostics go first; the engine never repeats them.
fn merge_diagnostics(evaluation: &mut Evaluation, mut from_record: Vec<Diagnostic>) {
    for diagnostic in &from_record {
        tracing::warn!("{}", diagnostic);
    }
    from_record.append(&mut evaluation.diagnostics);
    evaluation.diagnostics = from_record;
}

fn print_text(report: &PreviewReport) {
    let evaluation = &report.evaluation;
    println!("Timer: {} ({})", display_title(report), report.kind);
    println!("Now: {}", report.now.to_rfc3339());
    println!("Phase: {:?}", evaluation.phase);
    if let Some(reason) = evaluation.idle_reason {
        println!("Reason: {:?}", reason);
    }
    println!("Remaining: {}", evaluation.remaining);
    if let Some(target) = evaluation.target {
        println!("Target: {}", target.to_rfc3339());
    }
    if let Some(next) = evaluation.next_change {
        println!("Next change: {}", next.to_rfc3339());
    }
    if let Some(position) = &report.display_position {
        println!("Position: {}", position);
    }
    if !report.placed {
        println!("Display: (hidden: not shown on this page)");
    } else if report.rendered.is_empty() {
        println!("Display: (hidden)");
    } else {
        println!("Display: {}", report.rendered);
    }
    for diagnostic in &evaluation.diagnostics {
        println!("⚠ {}", diagnostic);
    }
}

fn display_title(report: &PreviewReport) -> &str {
    if !report.title.is_empty() {
        return &report.title;
    }
    report.timer_id.as_deref().unwrap_or("untitled")
}
