//! Cart commands.

use std::io::Write;

use maya_client::cart::CartEngine;
use maya_client::gateway::OrderGateway;
use maya_core::{Cart, ProductId};

use super::{CliError, Context};

/// Print the server's cart.
pub async fn show(ctx: &Context) -> Result<(), CliError> {
    let cart = ctx.cart().load().await?;
    print_cart(&cart)
}

/// Add `quantity` units of a product.
pub async fn add(ctx: &Context, product_id: &str, quantity: i64) -> Result<(), CliError> {
    let engine = ctx.cart();
    engine.load().await?;

    let product = ctx.api.fetch_product(&ProductId::new(product_id)).await?;
    let line = engine.add(&product, quantity).await?;
    tracing::info!(product_id, quantity = line.quantity.get(), "Added to cart");

    print_engine(&engine)
}

/// Set a line's quantity.
pub async fn set(ctx: &Context, product_id: &str, quantity: i64) -> Result<(), CliError> {
    let engine = ctx.cart();
    engine.load().await?;

    let change = engine
        .change_quantity(&ProductId::new(product_id), quantity)
        .await?;
    if let Some(notice) = &change.notice {
        writeln!(std::io::stdout(), "Note: {notice}")?;
    }

    print_engine(&engine)
}

/// Remove a line.
pub async fn remove(ctx: &Context, product_id: &str) -> Result<(), CliError> {
    let engine = ctx.cart();
    engine.load().await?;
    engine.remove(&ProductId::new(product_id)).await?;
    print_engine(&engine)
}

/// Remove every line.
pub async fn clear(ctx: &Context) -> Result<(), CliError> {
    let engine = ctx.cart();
    engine.clear().await?;
    writeln!(std::io::stdout(), "Cart cleared")?;
    Ok(())
}

fn print_engine(engine: &CartEngine) -> Result<(), CliError> {
    match engine.snapshot().cart {
        Some(cart) => print_cart(&cart),
        None => Ok(()),
    }
}

fn print_cart(cart: &Cart) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();
    if cart.is_empty() {
        writeln!(out, "Cart is empty")?;
        return Ok(());
    }
    for line in &cart.lines {
        writeln!(
            out,
            "{:<26} {:<30} {:>4} x {:>10} = {:>10}",
            line.product_id.as_str(),
            line.snapshot.name,
            line.quantity.get(),
            line.unit_price.to_string(),
            line.subtotal().to_string()
        )?;
    }
    writeln!(out, "{} items, total {}", cart.item_count(), cart.total())?;
    Ok(())
}
