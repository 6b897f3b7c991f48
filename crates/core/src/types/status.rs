//! Status enums for catalog entities.

use serde::{Deserialize, Serialize};

/// Product publication status.
///
/// Maps to Shopify's REST `status` values. Anything Shopify adds later
/// lands in `Other` instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Draft,
    #[default]
    #[serde(other)]
    Other,
}

impl ProductStatus {
    /// Badge shown on a product card, if the status gets one.
    #[must_use]
    pub const fn badge(self) -> Option<StatusBadge> {
        match self {
            Self::Active => Some(StatusBadge {
                label: "Active",
                css_class: "active",
            }),
            Self::Draft => Some(StatusBadge {
                label: "Draft",
                css_class: "draft",
            }),
            Self::Other => None,
        }
    }
}

/// Label and style class for a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBadge {
    pub label: &'static str,
    pub css_class: &'static str,
}
