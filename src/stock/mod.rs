pub mod level;
pub mod models;

pub use level::{ProgressBar, StockLevel};
pub use models::{StockRecord, VariantStock, parse_inventory};
