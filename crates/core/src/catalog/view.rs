//! Products view state machine.
//!
//! ```text
//! Idle ──fetch──▶ Loading ──resolve──▶ Success ──refresh──▶ Loading
//!                         └─────────▶ Error   ──retry────▶ Loading
//! ```
//!
//! Every fetch is issued a ticket. Only the resolution carrying the latest
//! ticket is applied, so an older response arriving late cannot overwrite a
//! newer one. Timed navigations are values ([`ScheduledRedirect`]) owned by
//! the view and dropped by [`ProductsView::teardown`].

use std::time::Duration;

use serde_json::Value;

use super::filter::filter_products;
use super::product::ProductCard;

/// Delay before a session-expired view navigates back to the install page.
pub const SESSION_EXPIRED_REDIRECT_DELAY: Duration = Duration::from_secs(3);

/// Route of the install page.
pub const INSTALL_ROUTE: &str = "/";

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please reinstall the app.";
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch products. Please try again.";

/// A navigation that fires after a fixed delay unless cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRedirect {
    pub to: String,
    pub after: Duration,
}

impl ScheduledRedirect {
    #[must_use]
    pub fn new(to: impl Into<String>, after: Duration) -> Self {
        Self {
            to: to.into(),
            after,
        }
    }

    /// Delay in whole seconds, rounded up, as `<meta http-equiv="refresh">` wants it.
    #[must_use]
    pub fn refresh_seconds(&self) -> u64 {
        let secs = self.after.as_secs();
        if self.after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// Handle identifying one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// What the products endpoint answered.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// 200 with the upstream `products` array.
    Loaded(Vec<Value>),
    /// 401: no session for the shop.
    Unauthorized,
    /// Anything else.
    Failed,
}

/// Why the view is showing an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewErrorKind {
    SessionExpired,
    FetchFailed,
}

impl ViewErrorKind {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::SessionExpired => SESSION_EXPIRED_MESSAGE,
            Self::FetchFailed => FETCH_FAILED_MESSAGE,
        }
    }
}

/// Current state of the view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle,
    Loading,
    Success(Vec<ProductCard>),
    Error(ViewErrorKind),
}

/// The products page, independent of how it is rendered.
#[derive(Debug, Clone)]
pub struct ProductsView {
    state: ViewState,
    search: String,
    issued: u64,
    pending_redirect: Option<ScheduledRedirect>,
    closed: bool,
}

impl Default for ProductsView {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductsView {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ViewState::Idle,
            search: String::new(),
            issued: 0,
            pending_redirect: None,
            closed: false,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ViewState {
        &self.state
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub const fn pending_redirect(&self) -> Option<&ScheduledRedirect> {
        self.pending_redirect.as_ref()
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Start a fetch from any state. Returns `None` once torn down.
    pub fn fetch(&mut self) -> Option<FetchTicket> {
        if self.closed {
            return None;
        }
        self.issued += 1;
        self.state = ViewState::Loading;
        Some(FetchTicket(self.issued))
    }

    /// Manual retry, only offered from the error state.
    pub fn retry(&mut self) -> Option<FetchTicket> {
        if matches!(self.state, ViewState::Error(_)) {
            self.fetch()
        } else {
            None
        }
    }

    /// Manual refresh, only offered from the success state.
    pub fn refresh(&mut self) -> Option<FetchTicket> {
        if matches!(self.state, ViewState::Success(_)) {
            self.fetch()
        } else {
            None
        }
    }

    /// Apply a fetch result. Returns `false` if it was stale or the view is closed.
    pub fn resolve(&mut self, ticket: FetchTicket, outcome: FetchOutcome) -> bool {
        if self.closed || ticket.0 != self.issued || self.state != ViewState::Loading {
            return false;
        }

        self.state = match outcome {
            FetchOutcome::Loaded(values) => ViewState::Success(ProductCard::from_values(&values)),
            FetchOutcome::Unauthorized => {
                self.pending_redirect = Some(ScheduledRedirect::new(
                    INSTALL_ROUTE,
                    SESSION_EXPIRED_REDIRECT_DELAY,
                ));
                ViewState::Error(ViewErrorKind::SessionExpired)
            }
            FetchOutcome::Failed => ViewState::Error(ViewErrorKind::FetchFailed),
        };
        true
    }

    /// Update the search term. Filtering never triggers a fetch.
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// Products to show for the current search term.
    #[must_use]
    pub fn visible(&self) -> Vec<&ProductCard> {
        match &self.state {
            ViewState::Success(products) => filter_products(products, &self.search),
            _ => Vec::new(),
        }
    }

    /// Total number of fetched products, before filtering.
    #[must_use]
    pub fn total(&self) -> usize {
        match &self.state {
            ViewState::Success(products) => products.len(),
            _ => 0,
        }
    }

    /// Close the view, cancelling any pending redirect.
    ///
    /// Returns the redirect that was cancelled, if one was pending.
    pub fn teardown(&mut self) -> Option<ScheduledRedirect> {
        self.closed = true;
        self.pending_redirect.take()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn products() -> Vec<Value> {
        vec![
            json!({"title": "Red Shirt", "vendor": "Acme"}),
            json!({"title": "Blue Hat", "vendor": "Zenith"}),
        ]
    }

    #[test]
    fn test_idle_to_success() {
        let mut view = ProductsView::new();
        assert_eq!(view.state(), &ViewState::Idle);

        let ticket = view.fetch().unwrap();
        assert_eq!(view.state(), &ViewState::Loading);

        assert!(view.resolve(ticket, FetchOutcome::Loaded(products())));
        assert_eq!(view.total(), 2);
        assert!(view.pending_redirect().is_none());
    }

    #[test]
    fn test_search_filters_without_fetching() {
        let mut view = ProductsView::new();
        let ticket = view.fetch().unwrap();
        view.resolve(ticket, FetchOutcome::Loaded(products()));

        view.set_search("red");
        let visible = view.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible.first().map(|p| p.title()), Some("Red Shirt"));
        assert!(matches!(view.state(), ViewState::Success(_)));
    }

    #[test]
    fn test_unauthorized_schedules_redirect() {
        let mut view = ProductsView::new();
        let ticket = view.fetch().unwrap();
        view.resolve(ticket, FetchOutcome::Unauthorized);

        assert_eq!(
            view.state(),
            &ViewState::Error(ViewErrorKind::SessionExpired)
        );
        let redirect = view.pending_redirect().unwrap();
        assert_eq!(redirect.to, "/");
        assert_eq!(redirect.after, SESSION_EXPIRED_REDIRECT_DELAY);
    }

    #[test]
    fn test_failure_then_retry() {
        let mut view = ProductsView::new();
        let first = view.fetch().unwrap();
        view.resolve(first, FetchOutcome::Failed);
        assert_eq!(view.state(), &ViewState::Error(ViewErrorKind::FetchFailed));
        assert!(view.pending_redirect().is_none());
        assert!(view.refresh().is_none());

        let second = view.retry().unwrap();
        assert_eq!(view.state(), &ViewState::Loading);
        assert!(view.resolve(second, FetchOutcome::Loaded(Vec::new())));
        assert_eq!(view.total(), 0);
    }

    #[test]
    fn test_refresh_only_from_success() {
        let mut view = ProductsView::new();
        assert!(view.refresh().is_none());
        assert!(view.retry().is_none());

        let ticket = view.fetch().unwrap();
        view.resolve(ticket, FetchOutcome::Loaded(products()));
        assert!(view.refresh().is_some());
        assert_eq!(view.state(), &ViewState::Loading);
    }

    #[test]
    fn test_stale_resolution_is_dropped() {
        let mut view = ProductsView::new();
        let old = view.fetch().unwrap();
        let new = view.fetch().unwrap();

        assert!(view.resolve(new, FetchOutcome::Loaded(products())));
        assert!(!view.resolve(old, FetchOutcome::Unauthorized));
        assert_eq!(view.total(), 2);
        assert!(view.pending_redirect().is_none());
    }

    #[test]
    fn test_teardown_cancels_redirect_and_ignores_late_results() {
        let mut view = ProductsView::new();
        let ticket = view.fetch().unwrap();
        view.resolve(ticket, FetchOutcome::Unauthorized);

        let cancelled = view.teardown();
        assert_eq!(cancelled.map(|r| r.to), Some("/".to_string()));
        assert!(view.pending_redirect().is_none());
        assert!(view.is_closed());
        assert!(view.fetch().is_none());
    }

    #[test]
    fn test_teardown_while_loading() {
        let mut view = ProductsView::new();
        let ticket = view.fetch().unwrap();
        assert!(view.teardown().is_none());
        assert!(!view.resolve(ticket, FetchOutcome::Loaded(products())));
        assert_eq!(view.state(), &ViewState::Loading);
    }

    #[test]
    fn test_refresh_seconds_rounds_up() {
        assert_eq!(
            ScheduledRedirect::new("/", Duration::from_millis(1500)).refresh_seconds(),
            2
        );
        assert_eq!(
            ScheduledRedirect::new("/", Duration::from_secs(3)).refresh_seconds(),
            3
        );
    }
}
