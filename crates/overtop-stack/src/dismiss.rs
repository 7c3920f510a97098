#![forbid(unsafe_code)]

//! Dismissal routing: which surface, if any, an outside click or an Escape
//! press is meant for.
//!
//! Only the topmost surface of the global stack acts on dismissal input.
//! Every other listening surface ignores it entirely, so stacked overlays
//! never leak dismissal logic downward.
//!
//! Outside clicks are filtered against the preceding pointer gesture: a
//! press that started inside the region and was released outside (or the
//! reverse) is a drag, not an outside click.

use overtop_core::{Document, ElementId};

use crate::registry::SurfaceRegistry;
use crate::surface::SurfaceId;

/// What [`OverlayManager::handle_event`](crate::OverlayManager::handle_event)
/// did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// No surface acted on the event.
    Ignored,
    /// A pointer press/release was recorded for gesture tracking.
    Tracked,
    /// The surface was closed.
    Dismissed(SurfaceId),
    /// A listener canceled the dismissal notification.
    Vetoed(SurfaceId),
    /// The active focus trap moved focus to the element.
    FocusMoved(ElementId),
}

/// How a click relates to one listening surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClickClass {
    /// The click or its gesture touched the region.
    Inside,
    /// Outside, but another surface is on top.
    Shadowed,
    /// Outside the topmost surface.
    Outside,
}

/// Record, for every listening surface, whether a press or release landed in
/// its region.
pub(crate) fn track_gesture(
    doc: &Document,
    registry: &mut SurfaceRegistry,
    target: ElementId,
    pressed: bool,
) {
    for id in registry.listening() {
        let Some(surface) = registry.get_mut(id) else {
            continue;
        };
        let inside = doc.contains(surface.region, target);
        if pressed {
            surface.mouse_down_inside = inside;
        } else {
            surface.mouse_up_inside = inside;
        }
    }
}

/// Classify a click against surface `id`.
pub(crate) fn classify_click(
    doc: &Document,
    registry: &SurfaceRegistry,
    id: SurfaceId,
    target: ElementId,
) -> ClickClass {
    let Some(surface) = registry.get(id) else {
        return ClickClass::Shadowed;
    };
    if doc.contains(surface.region, target) || surface.mouse_down_inside || surface.mouse_up_inside
    {
        return ClickClass::Inside;
    }
    if registry.is_topmost(id) {
        ClickClass::Outside
    } else {
        ClickClass::Shadowed
    }
}

/// Whether an Escape press aimed at `target` applies to surface `id`.
///
/// The surface must be topmost. A modeless surface additionally requires the
/// key event to come from inside its region; a modal one does not, since
/// everything outside it is inert.
pub(crate) fn escape_applies(
    doc: &Document,
    registry: &SurfaceRegistry,
    id: SurfaceId,
    target: ElementId,
) -> bool {
    let Some(surface) = registry.get(id) else {
        return false;
    };
    if !surface.is_listening() || !registry.is_topmost(id) {
        return false;
    }
    !surface.is_modeless() || doc.contains(surface.region, target)
}
