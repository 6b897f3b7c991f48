//! Client-side search over an already fetched product list.

use super::product::ProductCard;

/// Keep products whose title or vendor contains `term`, ignoring case.
///
/// An empty term keeps everything. Order is preserved.
#[must_use]
pub fn filter_products<'a>(products: &'a [ProductCard], term: &str) -> Vec<&'a ProductCard> {
    let needle = term.to_lowercase();
    if needle.is_empty() {
        return products.iter().collect();
    }

    products.iter().filter(|p| p.matches(&needle)).collect()
}
