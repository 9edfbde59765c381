use crate::placement::PlacementConfig;
use crate::timer::models::Scalar;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressBarPosition {
    Above,
    #[default]
    #[serde(other)]
    Below,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedVariant {
    /// Admin API gid, e.g. `gid://shopify/ProductVariant/4455`.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub variants: Vec<SelectedVariant>,
}

/// Storefront view of a published low-stock countdown
/// (`GET /stock-countdown/config/{stock_id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Scalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_limit: Option<Scalar>,
    #[serde(default)]
    pub message_template: String,
    #[serde(default)]
    pub selected_variants: Vec<SelectedProduct>,
    #[serde(default)]
    pub show_progress_bar: bool,
    #[serde(default)]
    pub progress_bar_position: ProgressBarPosition,
    #[serde(default)]
    pub placement_config: PlacementConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_domain: Option<String>,
}

/// Numeric tail of a Shopify gid (`gid://shopify/ProductVariant/42` -> `42`).
pub fn numeric_id(gid: &str) -> &str {
    gid.rsplit('/').next().unwrap_or(gid)
}

impl StockRecord {
    /// Threshold at or below which the message is shown. Missing or
    /// unparseable limits disable the widget.
    pub fn limit(&self) -> Option<u64> {
        let limit = self.stock_limit.as_ref()?.as_integer()?;
        u64::try_from(limit).ok()
    }

    pub fn allowed_variant_ids(&self) -> Vec<String> {
        self.selected_variants
            .iter()
            .flat_map(|product| product.variants.iter())
            .map(|variant| numeric_id(&variant.id).to_string())
            .collect()
    }
}

/// Inventory of one variant as reported by the app's inventory proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantStock {
    pub id: String,
    #[serde(rename = "inventoryQuantity", default)]
    pub inventory_quantity: i64,
}

#[derive(Debug, Deserialize)]
struct VariantEdge {
    node: VariantStock,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VariantList {
    Edges { edges: Vec<VariantEdge> },
    Plain(Vec<VariantStock>),
}

#[derive(Debug, Deserialize)]
struct InventoryProduct {
    variants: VariantList,
}

#[derive(Debug, Deserialize)]
struct InventoryData {
    product: Option<InventoryProduct>,
}

#[derive(Debug, Deserialize)]
struct InventoryResponse {
    data: Option<InventoryData>,
    product: Option<InventoryProduct>,
}

/// Extract per-variant quantities from an inventory response. Both the
/// GraphQL envelope (`data.product`) and a bare `product` are accepted, with
/// variants either as connection edges or a plain list.
pub fn parse_inventory(body: &serde_json::Value) -> anyhow::Result<Vec<VariantStock>> {
    let response: InventoryResponse = serde_json::from_value(body.clone())?;
    let product = response
        .data
        .and_then(|data| data.product)
        .or(response.product)
        .ok_or_else(|| anyhow::anyhow!("Inventory response has no product"))?;

    Ok(match product.variants {
        VariantList::Edges { edges } => edges.into_iter().map(|edge| edge.node).collect(),
        VariantList::Plain(variants) => variants,
    })
}
