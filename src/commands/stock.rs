use crate::OutputFormat;
use crate::commands::{Source, client, load_stock};
use crate::config::Config;
use crate::placement::{PageType, PlacementConfig};
use crate::stock::{StockLevel, StockRecord};
use anyhow::{Context, Result};
use serde::Serialize;

/// Where the variant's quantity comes from.
#[derive(Debug, Clone)]
pub enum Quantity {
    Given(i64),
    /// Look it up through the inventory proxy for this product.
    Inventory { product_id: String },
}

#[derive(Debug, Serialize)]
pub struct StockReport {
    pub variant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageType>,
    pub placed: bool,
    #[serde(flatten)]
    pub level: StockLevel,
}

pub fn stock(
    config: &Config,
    source: &Source,
    variant: &str,
    quantity: Quantity,
    page: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let record = load_stock(config, source)?;

    let level = match quantity {
        Quantity::Given(quantity) => StockLevel::evaluate(&record, variant, quantity),
        Quantity::Inventory { product_id } => {
            let shop = record
                .shop_domain
                .as_deref()
                .context("Stock record has no shop_domain; pass --quantity instead")?;
            let inventory = crate::api::with_retry(
                || client(config).get_inventory(shop, &product_id),
                config.api.retries,
            )?;
            StockLevel::from_inventory(&record, variant, &inventory)
        }
    };

    let report = build_report(&record, variant, level, page);
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize stock report")?;
            println!("{}", json);
        }
        OutputFormat::Text => match &report.level {
            StockLevel::Shown { message, progress } if report.placed => {
                println!("{}", message);
                if let Some(bar) = progress {
                    println!("Progress: {}% ({:?})", bar.percent, bar.position);
                }
            }
            StockLevel::Shown { .. } => println!("(hidden: not shown on this page)"),
            StockLevel::Hidden => println!("(hidden)"),
        },
    }
    Ok(())
}

pub fn build_report(record: &StockRecord, variant: &str, level: StockLevel, page: Option<&str>) -> StockReport {
    let page = PlacementConfig::page_for(page);
    let placed = record.placement_config.shows_on(page);
    if !placed {
        tracing::debug!(?page, "stock countdown not placed on this page");
    }
    StockReport {
        variant: variant.to_string(),
        page,
        placed,
        level,
    }
}
