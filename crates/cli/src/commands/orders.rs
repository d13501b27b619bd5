//! Order commands.

use std::io::Write;

use clap::Args;
use maya_client::orders::{
    AdvanceOutcome, OrderBook, OrderBrowser, OrderScope, StatusFilter,
};

use super::{CliError, Context};

/// Filter, search and paging of an order listing.
#[derive(Debug, Args)]
pub struct ViewArgs {
    /// Status filter (`pendiente`, `almacenado`, `all`)
    #[arg(short, long, default_value = "all")]
    pub filter: StatusFilter,

    /// Case-insensitive search over order ID, buyer and product name
    #[arg(short, long)]
    pub search: Option<String>,

    /// Number of pages to show
    #[arg(short, long, default_value_t = 1)]
    pub pages: usize,
}

/// The signed-in user's orders.
pub async fn mine(ctx: &Context, view: &ViewArgs) -> Result<(), CliError> {
    let book = ctx.tracker(OrderScope::User).refresh().await?;
    print_book(ctx, &book, view)
}

/// Every order.
pub async fn all(ctx: &Context, view: &ViewArgs) -> Result<(), CliError> {
    let book = ctx.tracker(OrderScope::Warehouse).refresh().await?;
    print_book(ctx, &book, view)
}

/// Move an order (typed or scanned) to its next status.
pub async fn advance(ctx: &Context, raw: &str) -> Result<(), CliError> {
    let tracker = ctx.tracker(OrderScope::Warehouse);
    let (order_id, outcome) = tracker.advance_scanned(raw).await?;

    let mut out = std::io::stdout().lock();
    match outcome {
        AdvanceOutcome::Advanced { from, to } => {
            writeln!(out, "Order {order_id}: {from} -> {to}")?;
        }
        AdvanceOutcome::AlreadyCompleted => {
            writeln!(out, "Order {order_id} is already completed")?;
        }
    }
    Ok(())
}

fn print_book(ctx: &Context, book: &OrderBook, view: &ViewArgs) -> Result<(), CliError> {
    let mut browser = OrderBrowser::new(ctx.config.order_page_size);
    browser.set_filter(view.filter);
    if let Some(search) = &view.search {
        browser.set_search(search);
    }
    for _ in 1..view.pages {
        browser.load_more();
    }

    let page = browser.page(&book.orders);
    let mut out = std::io::stdout().lock();
    for order in &page.items {
        writeln!(
            out,
            "{:<26} {:<11} {:<24} {:<30} {:>3} {:>10}",
            order.id().as_str(),
            order.status().as_str(),
            order.buyer_name().unwrap_or("-"),
            order.product_name().unwrap_or("-"),
            order.order.quantity.get(),
            order
                .total()
                .map_or_else(|| "-".to_string(), |total| total.to_string()),
        )?;
    }
    writeln!(
        out,
        "{} of {} orders ({}){}",
        page.items.len(),
        page.matches,
        browser.filter().label(),
        if page.has_more { ", more with --pages" } else { "" }
    )?;
    for failure in &book.failures {
        match &failure.product_id {
            Some(product) => writeln!(
                out,
                "Product {product} of order {} unavailable: {}",
                failure.order_id, failure.error
            )?,
            None => writeln!(out, "Order {} has no product: {}", failure.order_id, failure.error)?,
        }
    }
    Ok(())
}
