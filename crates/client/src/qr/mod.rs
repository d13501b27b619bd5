//! QR codec for order identifiers.
//!
//! The payload is the order ID itself, with no prefix or checksum. Decoding
//! accepts only well-formed 24-digit hexadecimal document IDs, which rejects
//! scans of unrelated QR codes.

mod scan;

pub use scan::{CameraAccess, CameraPermission, ScanError, ScanSession};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use maya_core::{OrderId, is_object_id};
use qrcode::render::{svg, unicode};
use qrcode::{EcLevel, QrCode};
use thiserror::Error;

/// Default edge length of rendered SVGs, in pixels.
pub const DEFAULT_SVG_SIZE: u32 = 200;

/// A scanned payload that is not an order ID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("scan is empty")]
    Empty,
    #[error("'{0}' is not an order identifier")]
    NotAnOrderId(String),
}

/// Failure to build a symbol.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("'{0}' is not an order identifier")]
    NotAnOrderId(String),
    #[error("QR encoding failed: {0}")]
    Symbol(#[from] qrcode::types::QrError),
}

/// A QR symbol carrying an order ID.
pub struct QrSymbol {
    payload: OrderId,
    code: QrCode,
}

impl QrSymbol {
    /// The encoded order ID.
    #[must_use]
    pub const fn payload(&self) -> &OrderId {
        &self.payload
    }

    /// Modules per side.
    #[must_use]
    pub fn width(&self) -> usize {
        self.code.width()
    }

    /// Render with unicode half blocks for terminals.
    #[must_use]
    pub fn to_unicode(&self) -> String {
        self.code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .quiet_zone(true)
            .build()
    }

    /// Render as an SVG document at least `size` pixels wide.
    #[must_use]
    pub fn to_svg(&self, size: u32) -> String {
        self.code
            .render::<svg::Color<'_>>()
            .min_dimensions(size, size)
            .quiet_zone(true)
            .build()
    }

    /// Render as a `data:` URI for image views.
    #[must_use]
    pub fn to_data_uri(&self, size: u32) -> String {
        format!(
            "data:image/svg+xml;base64,{}",
            STANDARD.encode(self.to_svg(size))
        )
    }
}

impl std::fmt::Debug for QrSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrSymbol")
            .field("payload", &self.payload)
            .field("width", &self.width())
            .finish()
    }
}

/// Encode an order ID.
///
/// Deterministic: the same ID always yields the same symbol.
///
/// # Errors
///
/// Returns `EncodeError::NotAnOrderId` for IDs that [`decode`] would reject.
pub fn encode(order_id: &OrderId) -> Result<QrSymbol, EncodeError> {
    if !is_object_id(order_id.as_str()) {
        return Err(EncodeError::NotAnOrderId(order_id.to_string()));
    }
    let code = QrCode::with_error_correction_level(order_id.as_str(), EcLevel::M)?;
    Ok(QrSymbol {
        payload: order_id.clone(),
        code,
    })
}

/// Decode a scanned payload into an order ID. Surrounding whitespace is
/// ignored.
///
/// # Errors
///
/// Returns `DecodeError` if the payload is empty or not an order ID.
pub fn decode(raw: &str) -> Result<OrderId, DecodeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }
    if !is_object_id(trimmed) {
        return Err(DecodeError::NotAnOrderId(trimmed.chars().take(64).collect()));
    }
    Ok(OrderId::new(trimmed))
}
