//! Hosted checkout from the terminal.
//!
//! Prints the approval URL, then reads URLs (one per line) that the browser
//! landed on until the payment is approved or cancelled.

use std::io::Write;
use std::sync::Arc;

use maya_client::checkout::{CheckoutBridge, NavigationOutcome};
use maya_client::orders::OrderScope;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use super::{CliError, Context};

/// Pay for the cart.
pub async fn pay(ctx: &Context) -> Result<(), CliError> {
    let bridge = CheckoutBridge::new(
        Arc::new(ctx.api.clone()),
        ctx.cart(),
        ctx.tracker(OrderScope::User),
        ctx.config.checkout.clone(),
    );

    let approval_url = bridge.begin().await?;
    {
        let mut out = std::io::stdout().lock();
        writeln!(out, "Approve the payment at:\n  {approval_url}")?;
        writeln!(out, "Then paste the URL the browser returned to:")?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(url) = Url::parse(line) else {
            writeln!(std::io::stdout(), "Not a URL: {line}")?;
            continue;
        };
        match bridge.on_navigation(&url).await {
            Ok(NavigationOutcome::Completed | NavigationOutcome::AlreadyHandled) => {
                writeln!(std::io::stdout(), "Payment approved; orders created")?;
                return Ok(());
            }
            Ok(NavigationOutcome::Cancelled) => {
                writeln!(std::io::stdout(), "Payment cancelled; cart kept")?;
                return Ok(());
            }
            Ok(NavigationOutcome::Continue) => {}
            Err(e) if e.is_retryable() => {
                tracing::warn!(error = %e, "Finalizing failed; paste the return URL again");
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!("Input closed before the payment was approved");
    Ok(())
}
