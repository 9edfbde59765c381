//! Storefront page targeting for widgets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Product,
    Collection,
    Cart,
    Home,
    Other,
}

impl PageType {
    /// Classify a storefront page from the theme template name (when the
    /// theme exposes one) and the URL path.
    pub fn detect(template: Option<&str>, path: &str) -> Self {
        if let Some(template) = template.filter(|t| !t.is_empty()) {
            if template.contains("product") {
                return PageType::Product;
            }
            if template.contains("collection") {
                return PageType::Collection;
            }
            if template.contains("cart") {
                return PageType::Cart;
            }
            if template.contains("index") {
                return PageType::Home;
            }
        }

        if path.contains("/products/") {
            PageType::Product
        } else if path.contains("/collections/") {
            PageType::Collection
        } else if path.contains("/cart") {
            PageType::Cart
        } else if path.is_empty() || path == "/" {
            PageType::Home
        } else {
            PageType::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayPages {
    #[default]
    ProductOnly,
    Collection,
    All,
    /// Unrecognized setting; treated like `product-only`.
    #[serde(other)]
    Unrecognized,
}

impl DisplayPages {
    pub fn should_display(self, page: PageType) -> bool {
        match self {
            DisplayPages::All => true,
            DisplayPages::Collection => page == PageType::Collection,
            DisplayPages::ProductOnly | DisplayPages::Unrecognized => page == PageType::Product,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementConfig {
    #[serde(default)]
    pub display_pages: DisplayPages,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_position: Option<String>,
}

impl PlacementConfig {
    /// Page type of a storefront path, when one was given.
    pub fn page_for(path: Option<&str>) -> Option<PageType> {
        path.map(|path| PageType::detect(None, path))
    }

    /// An unknown page counts as placed.
    pub fn shows_on(&self, page: Option<PageType>) -> bool {
        page.is_none_or(|page| self.display_pages.should_display(page))
    }
}
