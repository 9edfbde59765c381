pub mod clock;
pub mod countdown;
pub mod engine;
pub mod models;
pub mod scheduler;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use countdown::Countdown;
pub use engine::{Evaluation, IdleReason, PersistAction, Phase, Remaining, evaluate};
pub use models::{OnExpiry, TimerConfig, TimerKind, TimerRecord};
pub use scheduler::{Cadence, TickerHandle, spawn_ticker};
pub use view::WidgetView;
