#![forbid(unsafe_code)]

//! Overlay surfaces and the capability interface host components use.
//!
//! An [`OverlaySurface`] is the manager's record of one overlay: its elements,
//! its options, its lifecycle [`Phase`], and the bookkeeping the stack needs
//! (stacking order, placeholder, captured focus target, gesture flags).
//!
//! Host components do not touch records directly. They hold a [`SurfaceId`]
//! and drive the surface through the [`Surface`] trait, implemented by the
//! borrowed handle [`SurfaceMut`].
//!
//! # Lifecycle
//!
//! ```text
//! Closed -> Opening -> Open -> Closing -> Closed
//! ```
//!
//! `Opening` and `Closing` only last while an animation plays. Reopening a
//! `Closing` surface flushes the exit first.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use overtop_core::{ElementId, InputEvent};

use crate::config::SurfaceOptions;
use crate::error::OverlayError;
use crate::manager::OverlayManager;

/// Identifier of a surface, unique within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub(crate) u64);

impl SurfaceId {
    /// Get the raw id value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Lifecycle phase of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Detached and hidden.
    #[default]
    Closed,
    /// Attached; entrance animation playing.
    Opening,
    /// Attached and settled.
    Open,
    /// Still attached; exit animation playing.
    Closing,
}

impl Phase {
    /// Whether the surface counts as open (`Opening` or `Open`).
    #[inline]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Opening | Self::Open)
    }

    /// Whether an animation is in progress.
    #[inline]
    pub const fn is_animating(self) -> bool {
        matches!(self, Self::Opening | Self::Closing)
    }
}

/// The manager's record of one overlay.
#[derive(Debug, Clone)]
pub struct OverlaySurface {
    pub(crate) id: SurfaceId,
    pub(crate) host: ElementId,
    pub(crate) region: ElementId,
    pub(crate) backdrop: Option<ElementId>,
    pub(crate) options: SurfaceOptions,
    pub(crate) phase: Phase,
    pub(crate) stacking_order: Option<i32>,
    pub(crate) restore_focus_target: Option<ElementId>,
    pub(crate) placeholder: Option<ElementId>,
    pub(crate) pending_restore: Option<Rc<Cell<bool>>>,
    pub(crate) mouse_down_inside: bool,
    pub(crate) mouse_up_inside: bool,
    pub(crate) listening: bool,
    pub(crate) close_source: Option<InputEvent>,
}

impl OverlaySurface {
    pub(crate) fn new(
        id: SurfaceId,
        host: ElementId,
        region: ElementId,
        backdrop: Option<ElementId>,
        options: SurfaceOptions,
    ) -> Self {
        Self {
            id,
            host,
            region,
            backdrop,
            options,
            phase: Phase::Closed,
            stacking_order: None,
            restore_focus_target: None,
            placeholder: None,
            pending_restore: None,
            mouse_down_inside: false,
            mouse_up_inside: false,
            listening: false,
            close_source: None,
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Element attached to the body while the surface is open.
    pub fn host(&self) -> ElementId {
        self.host
    }

    /// The interactive region ("overlay part").
    pub fn region(&self) -> ElementId {
        self.region
    }

    pub fn backdrop(&self) -> Option<ElementId> {
        self.backdrop
    }

    pub fn options(&self) -> &SurfaceOptions {
        &self.options
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// `Opening` or `Open`.
    pub fn is_open(&self) -> bool {
        self.phase.is_open()
    }

    pub fn is_closing(&self) -> bool {
        self.phase == Phase::Closing
    }

    pub fn is_modeless(&self) -> bool {
        self.options.modeless
    }

    /// Last assigned stacking order, if the surface was ever attached.
    pub fn stacking_order(&self) -> Option<i32> {
        self.stacking_order
    }

    /// Element captured at open time for focus restoration.
    pub fn restore_focus_target(&self) -> Option<ElementId> {
        self.restore_focus_target
    }

    /// Whether the surface currently receives global click/keydown routing.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Event that triggered the most recent close, if any.
    pub fn close_source(&self) -> Option<&InputEvent> {
        self.close_source.as_ref()
    }

    pub(crate) fn reset_gesture(&mut self) {
        self.mouse_down_inside = false;
        self.mouse_up_inside = false;
    }
}

/// Capability interface consumed by host components.
pub trait Surface {
    /// The surface's id.
    fn id(&self) -> SurfaceId;

    /// Open the surface. Opening an open surface is a no-op.
    fn open(&mut self) -> Result<(), OverlayError>;

    /// Close the surface, recording the triggering event.
    fn close(&mut self, source: Option<InputEvent>) -> Result<(), OverlayError>;

    /// Whether the surface blocks interaction beneath it.
    fn is_modal(&self) -> bool;

    /// Whether the surface is `Opening` or `Open`.
    fn is_open(&self) -> bool;

    /// Current stacking order.
    fn order(&self) -> Option<i32>;

    /// Drive the `opened` state from a boolean.
    fn set_opened(&mut self, opened: bool) -> Result<(), OverlayError> {
        if opened {
            self.open()
        } else {
            self.close(None)
        }
    }
}

/// Borrowed handle implementing [`Surface`] for one surface of a manager.
pub struct SurfaceMut<'m> {
    pub(crate) manager: &'m mut OverlayManager,
    pub(crate) id: SurfaceId,
}

impl SurfaceMut<'_> {
    /// Raise the surface above every other attached surface.
    pub fn bring_to_front(&mut self) -> Result<(), OverlayError> {
        self.manager.bring_to_front(self.id)
    }

    fn record(&self) -> Option<&OverlaySurface> {
        self.manager.surface(self.id)
    }
}

impl Surface for SurfaceMut<'_> {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn open(&mut self) -> Result<(), OverlayError> {
        self.manager.open(self.id)
    }

    fn close(&mut self, source: Option<InputEvent>) -> Result<(), OverlayError> {
        self.manager.close(self.id, source)
    }

    fn is_modal(&self) -> bool {
        self.record().is_some_and(|s| !s.is_modeless())
    }

    fn is_open(&self) -> bool {
        self.record().is_some_and(OverlaySurface::is_open)
    }

    fn order(&self) -> Option<i32> {
        self.record().and_then(OverlaySurface::stacking_order)
    }
}
