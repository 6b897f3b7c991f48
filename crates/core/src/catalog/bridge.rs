//! Outcome of the development-only callback bridge page.
//!
//! In development the backend redirects to a separate frontend origin after
//! OAuth. The bridge page there confirms the session exists and forwards the
//! browser to the catalog, or back to the install page.

use std::time::Duration;

use super::view::{INSTALL_ROUTE, ScheduledRedirect};

pub const BRIDGE_SUCCESS_DELAY: Duration = Duration::from_millis(1500);
pub const BRIDGE_FAILURE_DELAY: Duration = Duration::from_secs(3);

/// Status line and scheduled navigation for the bridge page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOutcome {
    pub status: &'static str,
    pub authenticated: bool,
    pub redirect: ScheduledRedirect,
}

/// Decide what the bridge page shows.
///
/// `session_found` is only consulted when a shop was supplied.
#[must_use]
pub fn resolve_bridge(shop: Option<&str>, session_found: bool) -> BridgeOutcome {
    match shop.filter(|s| !s.is_empty()) {
        None => BridgeOutcome {
            status: "Authentication failed: Missing shop parameter",
            authenticated: false,
            redirect: ScheduledRedirect::new(INSTALL_ROUTE, BRIDGE_FAILURE_DELAY),
        },
        Some(shop) if session_found => BridgeOutcome {
            status: "Authentication successful! Redirecting to products...",
            authenticated: true,
            redirect: ScheduledRedirect::new(
                format!("/products?shop={}", urlencoding::encode(shop)),
                BRIDGE_SUCCESS_DELAY,
            ),
        },
        Some(_) => BridgeOutcome {
            status: "Authentication failed. Redirecting to install page...",
            authenticated: false,
            redirect: ScheduledRedirect::new(INSTALL_ROUTE, BRIDGE_FAILURE_DELAY),
        },
    }
}
