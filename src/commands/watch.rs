use crate::commands::{Source, load_timer, open_store, system_clock};
use crate::config::Config;
use crate::placement::PlacementConfig;
use crate::store::{MemoryTargetStore, TargetStore};
use crate::timer::clock::Clock;
use crate::timer::engine::{Phase, Remaining};
use crate::timer::{Cadence, Countdown, TimerKind, TimerRecord, WidgetView, spawn_ticker};
use anyhow::Result;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickLine {
    pub phase: Phase,
    pub remaining: Remaining,
    pub rendered: String,
}

impl std::fmt::Display for TickLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = format!("{:?}", self.phase).to_lowercase();
        if self.rendered.is_empty() {
            write!(f, "{:<8} {} (hidden)", phase, self.remaining)
        } else {
            write!(f, "{:<8} {}", phase, self.rendered)
        }
    }
}

/// Follow a timer live until it expires, `ticks` lines were printed, or
/// Ctrl-C. A timer not placed on `page` ticks as hidden.
pub fn watch(config: &Config, source: &Source, page: Option<&str>, ticks: Option<u64>) -> Result<()> {
    // Blocking HTTP must finish before the runtime starts
    let record = load_timer(config, source)?;
    let clock = system_clock(config)?;
    let cadence = config.cadence.to_cadence();

    let runtime = tokio::runtime::Runtime::new()?;
    let printed = if record.kind() == TimerKind::Fixed {
        let store = open_store(config)?;
        runtime.block_on(run(&record, store, clock, cadence, page, ticks, |line| {
            println!("{}", line)
        }))
    } else {
        runtime.block_on(run(
            &record,
            MemoryTargetStore::new(),
            clock,
            cadence,
            page,
            ticks,
            |line| println!("{}", line),
        ))
    };

    tracing::debug!(printed, "watch finished");
    Ok(())
}

/// Drive a ticker for `record`, handing each rendered tick to `output`.
/// Returns the number of ticks delivered.
pub async fn run<S, C, F>(
    record: &TimerRecord,
    store: S,
    clock: C,
    cadence: Cadence,
    page: Option<&str>,
    ticks: Option<u64>,
    mut output: F,
) -> u64
where
    S: TargetStore + 'static,
    C: Clock + 'static,
    F: FnMut(&TickLine),
{
    let (timer_config, diagnostics) = record.to_config();
    for diagnostic in &diagnostics {
        tracing::warn!("{}", diagnostic);
    }

    let placed = record
        .placement_config
        .shows_on(PlacementConfig::page_for(page));
    if !placed {
        tracing::info!(page = ?page, "Timer is not shown on this page");
    }

    let view_config = timer_config.clone();
    let labels = record.timer_labels.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = spawn_ticker(
        Countdown::new(timer_config, store),
        clock,
        cadence,
        move |evaluation| {
            let view = if placed {
                WidgetView::from_evaluation(evaluation, &view_config)
            } else {
                WidgetView::Hidden
            };
            let _ = tx.send(TickLine {
                phase: evaluation.phase,
                remaining: evaluation.remaining,
                rendered: view.render(&labels),
            });
        },
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut delivered = 0;
    let interrupted = loop {
        tokio::select! {
            line = rx.recv() => match line {
                Some(line) => {
                    output(&line);
                    delivered += 1;
                    if ticks.is_some_and(|limit| delivered >= limit) {
                        break true;
                    }
                }
                None => break false,
            },
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, stopping countdown");
                break true;
            }
        }
    };

    if interrupted {
        handle.stop().await;
    } else {
        handle.finished().await;
    }
    delivered
}
