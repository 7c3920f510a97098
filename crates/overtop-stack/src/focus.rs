#![forbid(unsafe_code)]

//! Focus trapping and restoration.
//!
//! # Focus trap
//!
//! A [`FocusTrapStack`] holds one entry per surface whose focus is trapped.
//! Only the most recent entry is active; it intercepts Tab / Shift+Tab and
//! cycles focus through the tabbable elements of its region, wrapping from
//! last to first and back. Releasing a trap (in any order) reactivates the
//! newest remaining one.
//!
//! # Focus restore
//!
//! On close, focus goes back to the captured element only if the user has
//! not moved it elsewhere: the currently focused element must be the body or
//! lie inside the closing surface.

use overtop_core::{Document, ElementId};

use crate::error::FocusTrapError;
use crate::surface::SurfaceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Trap {
    surface: SurfaceId,
    region: ElementId,
}

/// Stack of installed focus traps.
#[derive(Debug, Default, Clone)]
pub struct FocusTrapStack {
    traps: Vec<Trap>,
}

impl FocusTrapStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a trap on `region` for `surface` and make it active.
    ///
    /// Focus moves to the first tabbable element of the region unless it is
    /// already inside.
    pub fn install(
        &mut self,
        doc: &mut Document,
        surface: SurfaceId,
        region: ElementId,
    ) -> Result<(), FocusTrapError> {
        let tabbable = doc.tabbable_elements(region);
        let Some(&first) = tabbable.first() else {
            return Err(FocusTrapError::NoFocusableElements);
        };
        self.release(surface);
        self.traps.push(Trap { surface, region });
        if !doc.contains(region, doc.deep_active_element()) {
            doc.focus(first)?;
        }
        Ok(())
    }

    /// Remove the trap owned by `surface`. Returns whether one was installed.
    pub fn release(&mut self, surface: SurfaceId) -> bool {
        let before = self.traps.len();
        self.traps.retain(|t| t.surface != surface);
        before != self.traps.len()
    }

    /// The surface owning the active trap.
    pub fn active(&self) -> Option<SurfaceId> {
        self.traps.last().map(|t| t.surface)
    }

    /// Whether any trap is installed.
    pub fn is_trapped(&self) -> bool {
        !self.traps.is_empty()
    }

    /// Number of installed traps.
    pub fn depth(&self) -> usize {
        self.traps.len()
    }

    /// Move focus to the next (or previous) tabbable element of the active
    /// region. Returns the newly focused element, or `None` when no trap is
    /// active or the region has nothing tabbable left.
    pub fn cycle(&self, doc: &mut Document, backward: bool) -> Option<ElementId> {
        let trap = self.traps.last()?;
        let tabbable = doc.tabbable_elements(trap.region);
        let len = tabbable.len();
        if len == 0 {
            return None;
        }
        let current = doc.deep_active_element();
        let next = match tabbable.iter().position(|&el| el == current) {
            Some(idx) if backward => (idx + len - 1) % len,
            Some(idx) => (idx + 1) % len,
            None if backward => len - 1,
            None => 0,
        };
        let target = tabbable[next];
        doc.focus(target).ok()?;
        Some(target)
    }
}

/// Element to capture at open time: the deepest focused node, or the body.
pub(crate) fn capture_target(doc: &Document) -> ElementId {
    doc.deep_active_element()
}

/// Whether focus may be moved back when the surface rooted at `host` closes.
pub(crate) fn should_restore(doc: &Document, host: ElementId) -> bool {
    let active = doc.deep_active_element();
    active == doc.body() || doc.contains(host, active)
}
