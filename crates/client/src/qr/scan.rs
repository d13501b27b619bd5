//! Scoped camera acquisition for QR scanning.

use std::sync::Arc;

use async_trait::async_trait;
use maya_core::OrderId;
use thiserror::Error;
use tracing::{debug, info};

use super::{DecodeError, decode};

/// Camera permission as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPermission {
    Granted,
    Denied,
}

/// Device camera used by scanning views.
#[async_trait]
pub trait CameraAccess: Send + Sync {
    /// Ask for (or look up) camera permission.
    async fn request_permission(&self) -> CameraPermission;

    /// Start delivering frames.
    async fn start(&self) -> Result<(), String>;

    /// Stop delivering frames. Called exactly once per started session.
    fn release(&self);
}

/// Errors of a scan attempt.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The user refused camera access. The attempt is over; offer a retry.
    #[error("Camera permission denied")]
    PermissionDenied,
    /// The camera could not be started.
    #[error("Camera unavailable: {0}")]
    Camera(String),
    /// The scanned code is not an order.
    #[error("Invalid QR code: {0}")]
    InvalidSymbol(#[from] DecodeError),
}

/// An open scanning session; the camera is released when it is dropped.
pub struct ScanSession {
    camera: Arc<dyn CameraAccess>,
    scanned: Option<OrderId>,
}

impl ScanSession {
    /// Request permission and start the camera.
    ///
    /// A denial is final for this attempt; calling `open` again is the retry.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` or `Camera`.
    pub async fn open(camera: Arc<dyn CameraAccess>) -> Result<Self, ScanError> {
        if camera.request_permission().await == CameraPermission::Denied {
            info!("Camera permission denied");
            return Err(ScanError::PermissionDenied);
        }
        camera.start().await.map_err(ScanError::Camera)?;
        debug!("Scan session opened");
        Ok(Self {
            camera,
            scanned: None,
        })
    }

    /// Handle a payload read by the camera.
    ///
    /// Returns the order ID for the first valid scan and `None` for any scan
    /// after that until [`Self::scan_again`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidSymbol` for payloads that are not order IDs; the
    /// session stays ready for another scan.
    pub fn accept(&mut self, raw: &str) -> Result<Option<OrderId>, ScanError> {
        if self.scanned.is_some() {
            return Ok(None);
        }
        let order_id = decode(raw)?;
        self.scanned = Some(order_id.clone());
        Ok(Some(order_id))
    }

    /// The last accepted order ID.
    #[must_use]
    pub const fn scanned(&self) -> Option<&OrderId> {
        self.scanned.as_ref()
    }

    /// Forget the last scan and accept a new one.
    pub fn scan_again(&mut self) {
        self.scanned = None;
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        debug!("Scan session closed");
        self.camera.release();
    }
}
