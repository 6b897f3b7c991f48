//! Lenient read of Shopify REST product JSON for display.
//!
//! The products API passes upstream JSON through untouched. Cards are only
//! built for rendering, so every field is optional and unknown shapes degrade
//! to fallbacks instead of errors.

use serde::Deserialize;
use serde_json::Value;

use crate::types::{Price, ProductStatus, StatusBadge};

/// Image shown when a product has no images at all.
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/250x250?text=No+Image";

/// A product as the catalog grid sees it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProductCard {
    pub id: Value,
    pub title: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub status: Option<ProductStatus>,
    pub image: Option<ProductImage>,
    pub images: Option<Vec<ProductImage>>,
    pub variants: Option<Vec<ProductVariant>>,
}

/// A product image reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProductImage {
    pub src: Option<String>,
}

/// The variant fields the catalog displays.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProductVariant {
    /// Shopify sends prices as strings; some fixtures use numbers.
    pub price: Option<Value>,
    pub inventory_quantity: Option<i64>,
}

impl ProductCard {
    /// Read a card from one element of the upstream `products` array.
    ///
    /// Malformed elements become an empty card rather than an error.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self::deserialize(value).unwrap_or_default()
    }

    /// Read cards from the whole upstream `products` array.
    #[must_use]
    pub fn from_values(values: &[Value]) -> Vec<Self> {
        values.iter().map(Self::from_value).collect()
    }

    /// Product id rendered as text, whether Shopify sent a number or a string.
    #[must_use]
    pub fn id_text(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn vendor_label(&self) -> &str {
        non_empty(self.vendor.as_deref()).unwrap_or("No vendor")
    }

    #[must_use]
    pub fn type_label(&self) -> &str {
        non_empty(self.product_type.as_deref()).unwrap_or("No type")
    }

    fn variants(&self) -> &[ProductVariant] {
        self.variants.as_deref().unwrap_or_default()
    }

    /// Featured image, then the first gallery image, then the placeholder.
    #[must_use]
    pub fn image_src(&self) -> &str {
        let featured = self.image.as_ref().and_then(|i| non_empty(i.src.as_deref()));
        let first = || {
            self.images
                .as_deref()
                .and_then(<[ProductImage]>::first)
                .and_then(|i| non_empty(i.src.as_deref()))
        };
        featured.or_else(first).unwrap_or(PLACEHOLDER_IMAGE)
    }

    #[must_use]
    pub fn status_badge(&self) -> Option<StatusBadge> {
        self.status.and_then(ProductStatus::badge)
    }

    /// First variant's price, or `No variants`.
    #[must_use]
    pub fn price_label(&self) -> String {
        self.variants()
            .first()
            .map_or_else(|| "No variants".to_string(), format_price)
    }

    /// `+N variants` when there is more than one variant.
    #[must_use]
    pub fn extra_variants_label(&self) -> Option<String> {
        match self.variants().len() {
            0 | 1 => None,
            n => Some(format!("+{} variants", n - 1)),
        }
    }

    /// `Stock: N` for the first variant, when one exists.
    #[must_use]
    pub fn stock_label(&self) -> Option<String> {
        self.variants()
            .first()
            .map(|v| format!("Stock: {}", v.inventory_quantity.unwrap_or(0)))
    }

    /// Case-insensitive substring match on title or vendor.
    ///
    /// `needle` must already be lowercase.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(needle));
        hit(self.title.as_deref()) || hit(self.vendor.as_deref())
    }
}

/// Format a variant price as `$0.00`, or `N/A` when missing or unparsable.
#[must_use]
pub fn format_price(variant: &ProductVariant) -> String {
    let raw = match &variant.price {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return "N/A".to_string(),
    };

    Price::parse(&raw).map_or_else(|| "N/A".to_string(), |p| p.display())
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
