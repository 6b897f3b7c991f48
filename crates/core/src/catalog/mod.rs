//! Catalog presentation logic: product cards, search, and page state.

pub mod bridge;
pub mod filter;
pub mod product;
pub mod view;

pub use bridge::{BridgeOutcome, resolve_bridge};
pub use filter::filter_products;
pub use product::{PLACEHOLDER_IMAGE, ProductCard, ProductImage, ProductVariant, format_price};
pub use view::{
    FetchOutcome, FetchTicket, ProductsView, ScheduledRedirect, ViewErrorKind, ViewState,
};
