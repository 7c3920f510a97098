#![forbid(unsafe_code)]

//! Errors raised by the overlay stack.

use overtop_core::DocumentError;

use crate::surface::SurfaceId;

/// Errors from [`OverlayManager`](crate::OverlayManager) operations.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    /// The id does not name a surface of this manager.
    #[error("unknown surface {0}")]
    UnknownSurface(SurfaceId),
    /// A document operation failed.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// Configuration could not be loaded.
    #[cfg(feature = "config")]
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

/// Errors from installing a focus trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FocusTrapError {
    /// The trap region has nothing that can take keyboard focus.
    #[error("focus trap region has no focusable elements")]
    NoFocusableElements,
    /// Moving focus into the region failed.
    #[error(transparent)]
    Document(#[from] DocumentError),
}
