pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod placement;
pub mod platform;
pub mod state;
pub mod stock;
pub mod store;
pub mod timer;

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, ValueEnum, Debug, Default, Serialize)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
