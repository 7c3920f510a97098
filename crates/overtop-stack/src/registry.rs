#![forbid(unsafe_code)]

//! Registry of surfaces and the derived global stack.
//!
//! The registry owns every [`OverlaySurface`] of a manager plus an explicit
//! list of attached surfaces. The global stack is never stored: [`ordered`]
//! derives it on demand from the attached list.
//!
//! # Invariants
//!
//! - A surface appears at most once in the attached list.
//! - `ordered()` holds exactly the attached surfaces whose phase is not
//!   `Closing`, sorted by stacking order ascending; ties keep attach order.
//! - The last element of `ordered()` is the topmost surface.
//! - The body lock is held while at least one attached surface is modal
//!   (closing ones included), unless the body was already inert before the
//!   first modal surface opened.
//!
//! [`ordered`]: SurfaceRegistry::ordered

use ahash::AHashMap;
use overtop_core::{Document, DocumentError, PointerEvents};

use crate::surface::{OverlaySurface, SurfaceId};

/// Owner of all surfaces of one manager.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    surfaces: AHashMap<SurfaceId, OverlaySurface>,
    /// Attached surfaces in attach order.
    attached: Vec<SurfaceId>,
    /// Body pointer-events value saved when the lock was taken.
    body_lock: Option<Option<PointerEvents>>,
    next_id: u64,
}

impl SurfaceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next surface id.
    pub(crate) fn next_id(&mut self) -> SurfaceId {
        self.next_id += 1;
        SurfaceId(self.next_id)
    }

    pub(crate) fn insert(&mut self, surface: OverlaySurface) {
        self.surfaces.insert(surface.id, surface);
    }

    /// Remove a surface entirely, detaching it first.
    pub(crate) fn remove(&mut self, id: SurfaceId) -> Option<OverlaySurface> {
        self.detach(id);
        self.surfaces.remove(&id)
    }

    pub fn get(&self, id: SurfaceId) -> Option<&OverlaySurface> {
        self.surfaces.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SurfaceId) -> Option<&mut OverlaySurface> {
        self.surfaces.get_mut(&id)
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.surfaces.contains_key(&id)
    }

    /// Number of registered surfaces.
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    // --- Attachment ---

    /// Add a surface to the attached list. Returns `false` if it was already
    /// attached or is unknown.
    pub(crate) fn attach(&mut self, id: SurfaceId) -> bool {
        if !self.contains(id) || self.is_attached(id) {
            return false;
        }
        self.attached.push(id);
        true
    }

    /// Remove a surface from the attached list. Returns `false` if it was not
    /// attached.
    pub(crate) fn detach(&mut self, id: SurfaceId) -> bool {
        let before = self.attached.len();
        self.attached.retain(|&a| a != id);
        before != self.attached.len()
    }

    pub fn is_attached(&self, id: SurfaceId) -> bool {
        self.attached.contains(&id)
    }

    /// Attached surfaces in attach order, closing ones included.
    pub fn attached(&self) -> &[SurfaceId] {
        &self.attached
    }

    /// The global stack: attached, non-closing surfaces by stacking order.
    pub fn ordered(&self) -> Vec<SurfaceId> {
        let mut ids: Vec<SurfaceId> = self
            .attached
            .iter()
            .copied()
            .filter(|id| self.get(*id).is_some_and(|s| !s.is_closing()))
            .collect();
        ids.sort_by_key(|id| self.get(*id).and_then(OverlaySurface::stacking_order));
        ids
    }

    /// The topmost surface of the global stack.
    pub fn topmost(&self) -> Option<SurfaceId> {
        self.ordered().last().copied()
    }

    /// Whether `id` is the topmost surface.
    pub fn is_topmost(&self, id: SurfaceId) -> bool {
        self.topmost() == Some(id)
    }

    /// Highest stacking order among attached surfaces other than `id`.
    pub fn front_order_excluding(&self, id: SurfaceId) -> Option<i32> {
        self.attached
            .iter()
            .filter(|&&a| a != id)
            .filter_map(|a| self.get(*a).and_then(OverlaySurface::stacking_order))
            .max()
    }

    /// Renumber every attached surface other than `id` with consecutive
    /// stacking orders, keeping their relative order, and return the order
    /// just above them.
    ///
    /// Orders start at the lowest current order, shifted down only as far as
    /// needed to fit below `i32::MAX`.
    pub(crate) fn compact_orders_excluding(&mut self, id: SurfaceId) -> i32 {
        let mut others: Vec<SurfaceId> = self.attached.iter().copied().filter(|&a| a != id).collect();
        others.sort_by_key(|a| self.get(*a).and_then(OverlaySurface::stacking_order));
        let count = i32::try_from(others.len()).unwrap_or(i32::MAX);
        let lowest = others
            .first()
            .and_then(|a| self.get(*a))
            .and_then(OverlaySurface::stacking_order)
            .unwrap_or(0);
        let start = lowest.min(i32::MAX - count);
        let mut next = start;
        for other in others {
            if let Some(surface) = self.surfaces.get_mut(&other) {
                surface.stacking_order = Some(next);
            }
            next = next.saturating_add(1);
        }
        tracing::debug!(start, count, "stacking orders compacted");
        next
    }

    /// Whether any attached surface (closing ones included) is modal.
    pub fn has_attached_modal(&self) -> bool {
        self.attached
            .iter()
            .any(|id| self.get(*id).is_some_and(|s| !s.is_modeless()))
    }

    /// Surfaces with an active listening window, topmost first.
    pub fn listening(&self) -> Vec<SurfaceId> {
        self.ordered()
            .into_iter()
            .rev()
            .filter(|id| self.get(*id).is_some_and(OverlaySurface::is_listening))
            .collect()
    }

    // --- Body lock ---

    /// Whether this registry disabled the body's pointer events.
    pub fn body_locked(&self) -> bool {
        self.body_lock.is_some()
    }

    /// Disable pointer events on the body, remembering the prior inline value.
    ///
    /// No-op if the lock is already held or the body is already inert.
    pub(crate) fn take_body_lock(&mut self, doc: &mut Document) -> Result<(), DocumentError> {
        if self.body_lock.is_some() {
            return Ok(());
        }
        let body = doc.body();
        let prior = doc.pointer_events(body);
        if prior == Some(PointerEvents::None) {
            return Ok(());
        }
        doc.set_pointer_events(body, Some(PointerEvents::None))?;
        self.body_lock = Some(prior);
        tracing::debug!(?prior, "body pointer events disabled");
        Ok(())
    }

    /// Restore the body's prior pointer-events value once no attached modal
    /// surface remains. Returns whether the body was restored.
    pub(crate) fn release_body_lock_if_idle(
        &mut self,
        doc: &mut Document,
    ) -> Result<bool, DocumentError> {
        if self.has_attached_modal() {
            return Ok(false);
        }
        let Some(prior) = self.body_lock.take() else {
            return Ok(false);
        };
        doc.set_pointer_events(doc.body(), prior)?;
        tracing::debug!(?prior, "body pointer events restored");
        Ok(true)
    }
}
