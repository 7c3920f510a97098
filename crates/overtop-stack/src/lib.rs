#![forbid(unsafe_code)]

//! Overlay stack management for Overtop.
//!
//! Dialogs, menus, popovers, and other overlays all share one global stack.
//! [`OverlayManager`] keeps that stack coherent:
//!
//! - **Stacking**: each opened surface sits above every surface opened
//!   before it; [`bring_to_front`](OverlayManager::bring_to_front) raises an
//!   open surface explicitly.
//! - **Modality**: while a modal surface is open, the body and every surface
//!   below it ignore pointer input. Closing it hands interactivity back to
//!   the next modal surface down.
//! - **Dismissal**: outside clicks and Escape presses reach only the topmost
//!   surface, through cancelable notifications.
//! - **Focus**: an optional trap cycles Tab inside the surface, and focus
//!   returns to where it came from on close.
//!
//! # Example
//!
//! ```
//! use overtop_core::InputEvent;
//! use overtop_stack::{EventOutcome, OverlayManager, SurfaceOptions};
//!
//! let mut manager = OverlayManager::new();
//! let body = manager.document().body();
//! let dialog = manager.create_surface(body, SurfaceOptions::new()).unwrap();
//! manager.open(dialog).unwrap();
//!
//! let root = manager.document().root();
//! let outcome = manager.handle_event(&InputEvent::click(root)).unwrap();
//! assert_eq!(outcome, EventOutcome::Dismissed(dialog));
//! ```

pub mod config;
mod dismiss;
pub mod error;
pub mod focus;
pub mod manager;
mod modal;
pub mod notification;
pub mod registry;
pub mod surface;

#[cfg(feature = "config")]
pub use config::ConfigError;
pub use config::{AnimationSpec, DEFAULT_BASE_Z_INDEX, FocusRestore, OverlayConfig, SurfaceOptions};
pub use dismiss::EventOutcome;
pub use error::{FocusTrapError, OverlayError};
pub use focus::FocusTrapStack;
pub use manager::OverlayManager;
pub use notification::{Listener, ListenerId, NotificationContext, OverlayNotification, Request};
pub use registry::SurfaceRegistry;
pub use surface::{OverlaySurface, Phase, Surface, SurfaceId, SurfaceMut};
