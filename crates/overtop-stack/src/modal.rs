#![forbid(unsafe_code)]

//! Modal state: which regions take pointer input while modal surfaces are
//! open.
//!
//! # Invariants
//!
//! With the global stack ordered bottom to top and `k` the index of the
//! topmost modal surface:
//!
//! - every region below `k` has inline `pointer-events: none`;
//! - the region at `k` and every region above it has no inline value (it
//!   inherits the host's `auto`);
//! - the body is inert while any modal surface is attached.
//!
//! Entering modal state disables every other attached, non-closing region.
//! Exiting walks the remaining stack from the top, re-enabling modeless
//! regions until it re-enables exactly one modal region. The walk starts from
//! the current top, so a surface closed out of order hands interactivity to
//! the real topmost modal rather than to its own neighbor.

use overtop_core::{Document, DocumentError, PointerEvents};

use crate::registry::SurfaceRegistry;
use crate::surface::SurfaceId;

/// Make `id` the interactive modal surface.
pub(crate) fn enter(
    doc: &mut Document,
    registry: &mut SurfaceRegistry,
    id: SurfaceId,
) -> Result<(), DocumentError> {
    registry.take_body_lock(doc)?;
    for other in registry.ordered() {
        if other == id {
            continue;
        }
        if let Some(surface) = registry.get(other) {
            doc.set_pointer_events(surface.region(), Some(PointerEvents::None))?;
        }
    }
    tracing::debug!(surface = %id, "entered modal state");
    Ok(())
}

/// Hand interactivity back to the surfaces left below `id`.
///
/// `id` must already be out of the global stack (closing or detached).
pub(crate) fn exit(
    doc: &mut Document,
    registry: &SurfaceRegistry,
    id: SurfaceId,
) -> Result<(), DocumentError> {
    for other in registry.ordered().into_iter().rev() {
        if other == id {
            continue;
        }
        let Some(surface) = registry.get(other) else {
            continue;
        };
        doc.set_pointer_events(surface.region(), None)?;
        if !surface.is_modeless() {
            tracing::debug!(surface = %id, next = %other, "exited modal state");
            break;
        }
    }
    Ok(())
}
