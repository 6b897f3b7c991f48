//! Core types for Shop Catalog.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod price;
pub mod shop;
pub mod status;

pub use price::Price;
pub use shop::{
    InstallError, MYSHOPIFY_SUFFIX, ShopDomain, ShopDomainError, install_redirect_url,
    normalize_shop_input,
};
pub use status::{ProductStatus, StatusBadge};
