//! QR commands.

use std::io::Write;

use maya_client::qr::{self, DEFAULT_SVG_SIZE};
use maya_client::StoreError;
use maya_core::OrderId;

use super::CliError;

/// Print an order's QR symbol.
pub fn show(order_id: &str, svg: bool) -> Result<(), CliError> {
    let symbol = qr::encode(&OrderId::new(order_id.trim()))?;
    let rendered = if svg {
        symbol.to_svg(DEFAULT_SVG_SIZE)
    } else {
        symbol.to_unicode()
    };
    let mut out = std::io::stdout().lock();
    writeln!(out, "{rendered}")?;
    writeln!(out, "{}", symbol.payload())?;
    Ok(())
}

/// Check a scanned payload.
pub fn verify(payload: &str) -> Result<(), CliError> {
    let order_id = qr::decode(payload).map_err(StoreError::from)?;
    writeln!(std::io::stdout(), "Valid order ID: {order_id}")?;
    Ok(())
}
