//! Filtering, search and windowing over a fetched order list.
//!
//! Everything here works on orders already in memory and never triggers a
//! request.

use maya_core::{OrderStatus, TrackedOrder};

/// Status filter of the warehouse view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    Pending,
    Stored,
    #[default]
    All,
}

impl StatusFilter {
    /// Whether an order in `status` passes the filter.
    #[must_use]
    pub const fn matches(self, status: OrderStatus) -> bool {
        match self {
            Self::Pending => matches!(status, OrderStatus::Pending),
            Self::Stored => matches!(status, OrderStatus::Stored),
            Self::All => true,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pendiente",
            Self::Stored => "almacenado",
            Self::All => "mostrar todos",
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pendiente" | "pending" => Ok(Self::Pending),
            "almacenado" | "stored" => Ok(Self::Stored),
            "mostrar todos" | "todos" | "all" => Ok(Self::All),
            _ => Err(format!("invalid status filter: {s}")),
        }
    }
}

/// One visible window of the filtered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPage<'a> {
    /// Orders in the window, in list order.
    pub items: Vec<&'a TrackedOrder>,
    /// Orders matching the filter and search.
    pub matches: usize,
    /// Whether `load_more` would reveal more.
    pub has_more: bool,
}

/// Filter, search and window state of an order list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBrowser {
    filter: StatusFilter,
    needle: String,
    page_size: usize,
    pages: usize,
}

impl OrderBrowser {
    /// Start on the first page with no filter and no search.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            filter: StatusFilter::All,
            needle: String::new(),
            page_size: page_size.max(1),
            pages: 1,
        }
    }

    #[must_use]
    pub const fn filter(&self) -> StatusFilter {
        self.filter
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.needle
    }

    /// Change the status filter; resets to the first page.
    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
        self.pages = 1;
    }

    /// Change the search text; resets to the first page.
    pub fn set_search(&mut self, text: &str) {
        self.needle = text.trim().to_lowercase();
        self.pages = 1;
    }

    /// Grow the window by one page.
    pub fn load_more(&mut self) {
        self.pages = self.pages.saturating_add(1);
    }

    /// All orders passing the filter and search, in list order.
    #[must_use]
    pub fn filtered<'a>(&self, orders: &'a [TrackedOrder]) -> Vec<&'a TrackedOrder> {
        orders
            .iter()
            .filter(|o| self.filter.matches(o.status()) && o.matches_lowercase(&self.needle))
            .collect()
    }

    /// The current window over the filtered list.
    #[must_use]
    pub fn page<'a>(&self, orders: &'a [TrackedOrder]) -> OrderPage<'a> {
        let mut items = self.filtered(orders);
        let matches = items.len();
        let visible = self.page_size.saturating_mul(self.pages);
        items.truncate(visible);
        OrderPage {
            items,
            matches,
            has_more: matches > visible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{order, product};

    fn orders() -> Vec<TrackedOrder> {
        vec![
            TrackedOrder::new(
                order("a1", "Juan Pérez", "p1", OrderStatus::Pending),
                Some(product("p1", 100, 1)),
            ),
            TrackedOrder::new(order("a2", "María", "p2", OrderStatus::Pending), None),
            TrackedOrder::new(order("a3", "Juan López", "p3", OrderStatus::Stored), None),
            TrackedOrder::new(order("a4", "Juana", "p4", OrderStatus::Completed), None),
            TrackedOrder::new(order("a5", "Pedro", "p5", OrderStatus::Pending), None),
        ]
    }

    fn ids<'a>(page: &[&'a TrackedOrder]) -> Vec<&'a str> {
        page.iter().map(|o| o.id().as_str()).collect()
    }

    #[test]
    fn test_filter_and_search_intersect() {
        let orders = orders();
        let mut browser = OrderBrowser::new(10);
        browser.set_filter(StatusFilter::Pending);
        browser.set_search("Juan");
        assert_eq!(ids(&browser.filtered(&orders)), vec!["a1"]);

        browser.set_filter(StatusFilter::All);
        assert_eq!(ids(&browser.filtered(&orders)), vec!["a1", "a3", "a4"]);
    }

    #[test]
    fn test_search_matches_product_and_id() {
        let orders = orders();
        let mut browser = OrderBrowser::new(10);
        browser.set_search("PRODUCT P1");
        assert_eq!(ids(&browser.filtered(&orders)), vec!["a1"]);
        browser.set_search("a5");
        assert_eq!(ids(&browser.filtered(&orders)), vec!["a5"]);
    }

    #[test]
    fn test_window_grows_and_resets() {
        let orders = orders();
        let mut browser = OrderBrowser::new(2);

        let page = browser.page(&orders);
        assert_eq!(ids(&page.items), vec!["a1", "a2"]);
        assert_eq!(page.matches, 5);
        assert!(page.has_more);

        browser.load_more();
        browser.load_more();
        let page = browser.page(&orders);
        assert_eq!(page.items.len(), 5);
        assert!(!page.has_more);

        browser.set_filter(StatusFilter::Pending);
        let page = browser.page(&orders);
        assert_eq!(ids(&page.items), vec!["a1", "a2"]);
        assert!(page.has_more);

        browser.load_more();
        browser.set_search("");
        assert_eq!(browser.page(&orders).items.len(), 2);
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!("Pendiente".parse::<StatusFilter>(), Ok(StatusFilter::Pending));
        assert_eq!(
            "mostrar todos".parse::<StatusFilter>(),
            Ok(StatusFilter::All)
        );
        assert!("enviado".parse::<StatusFilter>().is_err());
    }
}
