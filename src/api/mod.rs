pub mod client;
pub mod retry;

pub use client::WidgetClient;
pub use retry::with_retry;
