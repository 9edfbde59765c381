use crate::stock::models::{ProgressBarPosition, StockRecord, VariantStock, numeric_id};
use serde::Serialize;

const STOCK_PLACEHOLDER: &str = "{{stock}}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressBar {
    pub percent: u8,
    pub position: ProgressBarPosition,
}

/// Display decision for the low-stock widget on one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum StockLevel {
    Hidden,
    Shown {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        progress: Option<ProgressBar>,
    },
}

impl StockLevel {
    /// Shown only for selected variants with `0 < quantity <= stock_limit`.
    pub fn evaluate(record: &StockRecord, variant_id: &str, quantity: i64) -> Self {
        let variant_id = numeric_id(variant_id);
        if !record.allowed_variant_ids().iter().any(|id| id == variant_id) {
            tracing::debug!(variant_id, "variant not selected for stock countdown");
            return StockLevel::Hidden;
        }

        let Some(limit) = record.limit() else {
            tracing::warn!(stock_limit = ?record.stock_limit, "unusable stock limit");
            return StockLevel::Hidden;
        };
        let Ok(quantity) = u64::try_from(quantity) else {
            return StockLevel::Hidden;
        };
        if quantity == 0 || quantity > limit {
            return StockLevel::Hidden;
        }

        let progress = (record.show_progress_bar && quantity < limit).then(|| ProgressBar {
            percent: ((quantity as f64 / limit as f64) * 100.0).round() as u8,
            position: record.progress_bar_position,
        });

        StockLevel::Shown {
            message: record
                .message_template
                .replacen(STOCK_PLACEHOLDER, &quantity.to_string(), 1),
            progress,
        }
    }

    /// Look the variant up in an inventory listing; unknown variants count as
    /// out of stock.
    pub fn from_inventory(record: &StockRecord, variant_id: &str, inventory: &[VariantStock]) -> Self {
        let wanted = numeric_id(variant_id);
        let quantity = inventory
            .iter()
            .find(|v| numeric_id(&v.id) == wanted)
            .map(|v| v.inventory_quantity)
            .unwrap_or(0);
        Self::evaluate(record, variant_id, quantity)
    }
}
