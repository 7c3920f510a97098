#![forbid(unsafe_code)]

//! The overlay stack manager.
//!
//! [`OverlayManager`] owns the [`Document`], the [`SurfaceRegistry`], the
//! focus trap stack, and the deferred task queue. Every transition happens
//! synchronously inside the call that triggers it:
//!
//! - [`open`](OverlayManager::open): attach, assign stacking order, capture
//!   focus, enter modal state, install the focus trap, start listening.
//! - [`close`](OverlayManager::close): stop listening, release the trap,
//!   hand interactivity down the stack, restore focus, then finish (or wait
//!   for [`animation_finished`](OverlayManager::animation_finished)).
//! - [`handle_event`](OverlayManager::handle_event): the single capture-phase
//!   entry point for pointer and key input.
//!
//! # Re-entrancy
//!
//! Listeners cannot call back into the manager while it is mid-transition.
//! They queue [`Request`]s, which the manager applies in FIFO order after the
//! transition completes and before the public call returns. A later-opened
//! surface is therefore never below an earlier one, and the registry is
//! never observed half-updated.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unknown surface | Id from another manager, or removed | `OverlayError::UnknownSurface` |
//! | Empty focus trap | Region has nothing tabbable | Logged at `warn`, surface opens untrapped |
//! | Stale restore target | Element removed while the surface was open | Logged at `debug`, focus left alone |
//! | Reopen before a deferred restore runs | Surface reopened within one turn of closing | Pending restore cancelled |
//! | Stacking order at `i32::MAX` | Long run of `bring_to_front` | Attached orders compacted, relative order kept |
//! | Failed queued request | Listener queued a bad id | Logged at `warn`, remaining requests still run |

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use overtop_core::{Document, ElementId, InputEvent, Key, Modifiers, PointerEvents, TaskQueue};

use crate::config::{FocusRestore, OverlayConfig, SurfaceOptions};
use crate::dismiss::{self, ClickClass, EventOutcome};
use crate::error::OverlayError;
use crate::focus::{self, FocusTrapStack};
use crate::modal;
use crate::notification::{
    Listener, ListenerId, NotificationContext, OverlayNotification, Request,
};
use crate::registry::SurfaceRegistry;
use crate::surface::{OverlaySurface, Phase, SurfaceId, SurfaceMut};

/// Tag of the element created for each surface host.
pub const HOST_TAG: &str = "overtop-overlay";
/// Tag of the interactive region element.
pub const REGION_TAG: &str = "overtop-region";
/// Tag of the backdrop element.
pub const BACKDROP_TAG: &str = "overtop-backdrop";

/// Coordinator for all overlay surfaces of one document.
pub struct OverlayManager {
    doc: Document,
    registry: SurfaceRegistry,
    traps: FocusTrapStack,
    config: OverlayConfig,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    tasks: TaskQueue<Document>,
    pending: VecDeque<Request>,
}

impl Default for OverlayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OverlayManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayManager")
            .field("surfaces", &self.registry.len())
            .field("ordered", &self.registry.ordered())
            .field("listeners", &self.listeners.len())
            .field("pending_tasks", &self.tasks.len())
            .finish()
    }
}

impl OverlayManager {
    /// Manager over an empty document with default configuration.
    pub fn new() -> Self {
        Self::with_config(OverlayConfig::default())
    }

    /// Manager over an empty document.
    pub fn with_config(config: OverlayConfig) -> Self {
        Self::with_document(Document::new(), config)
    }

    /// Manager over an existing document.
    pub fn with_document(doc: Document, config: OverlayConfig) -> Self {
        Self {
            doc,
            registry: SurfaceRegistry::new(),
            traps: FocusTrapStack::new(),
            config,
            listeners: Vec::new(),
            next_listener: 0,
            tasks: TaskQueue::new(),
            pending: VecDeque::new(),
        }
    }

    // --- Accessors ---

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Mutable access to the document for building content and moving focus.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    pub fn focus_traps(&self) -> &FocusTrapStack {
        &self.traps
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&OverlaySurface> {
        self.registry.get(id)
    }

    /// Borrow a surface through the [`Surface`](crate::Surface) capability
    /// interface.
    pub fn surface_mut(&mut self, id: SurfaceId) -> Result<SurfaceMut<'_>, OverlayError> {
        if !self.registry.contains(id) {
            return Err(OverlayError::UnknownSurface(id));
        }
        Ok(SurfaceMut { manager: self, id })
    }

    /// The global stack, bottom to top.
    pub fn ordered(&self) -> Vec<SurfaceId> {
        self.registry.ordered()
    }

    /// The topmost surface.
    pub fn topmost(&self) -> Option<SurfaceId> {
        self.registry.topmost()
    }

    pub fn is_open(&self, id: SurfaceId) -> bool {
        self.registry.get(id).is_some_and(OverlaySurface::is_open)
    }

    fn get(&self, id: SurfaceId) -> Result<&OverlaySurface, OverlayError> {
        self.registry.get(id).ok_or(OverlayError::UnknownSurface(id))
    }

    fn get_mut(&mut self, id: SurfaceId) -> Result<&mut OverlaySurface, OverlayError> {
        self.registry
            .get_mut(id)
            .ok_or(OverlayError::UnknownSurface(id))
    }

    // --- Surfaces ---

    /// Create a closed surface whose host lives under `parent`.
    ///
    /// The host holds an optional backdrop followed by the interactive region;
    /// populate the region through [`document_mut`](Self::document_mut).
    pub fn create_surface(
        &mut self,
        parent: ElementId,
        options: SurfaceOptions,
    ) -> Result<SurfaceId, OverlayError> {
        let host = self.doc.create_child(parent, HOST_TAG)?;
        self.doc.set_pointer_events(host, Some(PointerEvents::Auto))?;
        self.doc.set_hidden(host, true)?;
        let backdrop = if options.with_backdrop {
            Some(self.doc.create_child(host, BACKDROP_TAG)?)
        } else {
            None
        };
        let region = self.doc.create_child(host, REGION_TAG)?;

        let id = self.registry.next_id();
        self.registry
            .insert(OverlaySurface::new(id, host, region, backdrop, options));
        tracing::debug!(surface = %id, host = host.id(), modeless = options.modeless, "surface created");
        Ok(id)
    }

    /// Close (without animation) and unregister a surface, removing its host
    /// from the document.
    pub fn remove_surface(&mut self, id: SurfaceId) -> Result<(), OverlayError> {
        let result = self.remove_inner(id);
        self.drain_requests();
        result
    }

    fn remove_inner(&mut self, id: SurfaceId) -> Result<(), OverlayError> {
        if self.get(id)?.is_open() {
            self.close_inner(id, None)?;
        }
        if self.get(id)?.is_closing() {
            self.finish_closing(id)?;
        }
        self.traps.release(id);
        if let Some(surface) = self.registry.remove(id) {
            self.doc.remove(surface.host)?;
        }
        tracing::debug!(surface = %id, "surface removed");
        Ok(())
    }

    // --- Listeners ---

    /// Register a listener for every notification.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&mut NotificationContext<'_>) + 'static,
    ) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        before != self.listeners.len()
    }

    /// Dispatch a notification. Returns `false` if a listener vetoed it.
    fn emit(&mut self, notification: OverlayNotification) -> bool {
        tracing::trace!(surface = %notification.surface(), kind = notification.name(), "notify");
        let mut envelope = notification.into_envelope();
        let mut requests = Vec::new();
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in listeners.iter_mut() {
            let mut ctx = NotificationContext {
                envelope: &mut envelope,
                document: &self.doc,
                registry: &self.registry,
                requests: &mut requests,
            };
            listener(&mut ctx);
        }
        self.listeners = listeners;
        self.pending.extend(requests);
        !envelope.is_default_prevented()
    }

    fn drain_requests(&mut self) {
        while let Some(request) = self.pending.pop_front() {
            let result = match request.clone() {
                Request::Open(id) => self.open_inner(id),
                Request::Close(id, source) => self.close_inner(id, source),
                Request::BringToFront(id) => self.bring_to_front_inner(id),
                Request::Focus(el) => self.doc.focus(el).map_err(OverlayError::from),
            };
            if let Err(err) = result {
                tracing::warn!(?request, %err, "queued request failed");
            }
        }
    }

    // --- Stacking order ---

    /// Raise an attached surface above every other attached surface.
    ///
    /// No-op for a surface that is not attached.
    pub fn bring_to_front(&mut self, id: SurfaceId) -> Result<(), OverlayError> {
        let result = self.bring_to_front_inner(id);
        self.drain_requests();
        result
    }

    fn bring_to_front_inner(&mut self, id: SurfaceId) -> Result<(), OverlayError> {
        let host = self.get(id)?.host;
        if !self.registry.is_attached(id) {
            return Ok(());
        }
        let order = match self.registry.front_order_excluding(id) {
            Some(front) => match front.checked_add(1) {
                Some(next) => next,
                None => {
                    tracing::debug!(surface = %id, "stacking orders exhausted; compacting");
                    self.registry.compact_orders_excluding(id)
                }
            },
            None => self
                .doc
                .computed_z_index(host)
                .unwrap_or(self.config.base_z_index),
        };
        self.get_mut(id)?.stacking_order = Some(order);
        tracing::trace!(surface = %id, order, "brought to front");
        Ok(())
    }

    // --- Lifecycle ---

    /// Open a surface. Opening an open surface is a no-op; opening a closing
    /// one flushes its exit first.
    pub fn open(&mut self, id: SurfaceId) -> Result<(), OverlayError> {
        let result = self.open_inner(id);
        self.drain_requests();
        result
    }

    fn open_inner(&mut self, id: SurfaceId) -> Result<(), OverlayError> {
        match self.get(id)?.phase {
            Phase::Opening | Phase::Open => return Ok(()),
            Phase::Closing => {
                tracing::debug!(surface = %id, "flushing exit before reopen");
                self.finish_closing(id)?;
            }
            Phase::Closed => {}
        }
        // The queued task holds the other reference until it runs.
        if let Some(cancelled) = self.get_mut(id)?.pending_restore.take()
            && Rc::strong_count(&cancelled) > 1
        {
            cancelled.set(true);
            tracing::debug!(surface = %id, "pending focus restore cancelled by reopen");
        }

        let options = self.get(id)?.options;
        let region = self.get(id)?.region;
        let restore_target = options
            .restore_focus_on_close
            .then(|| focus::capture_target(&self.doc));

        self.attach(id)?;
        if !options.modeless {
            modal::enter(&mut self.doc, &mut self.registry, id)?;
        }

        let phase = if options.animation.opening {
            Phase::Opening
        } else {
            Phase::Open
        };
        let surface = self.get_mut(id)?;
        surface.restore_focus_target = restore_target;
        surface.phase = phase;
        surface.listening = true;
        surface.close_source = None;
        surface.reset_gesture();
        let order = surface.stacking_order;

        if options.focus_trap
            && let Err(err) = self.traps.install(&mut self.doc, id, region)
        {
            tracing::warn!(surface = %id, %err, "focus trap not installed");
        }

        tracing::debug!(surface = %id, order = ?order, ?phase, "surface opened");
        self.emit(OverlayNotification::OpenedChanged {
            surface: id,
            opened: true,
        });
        if phase == Phase::Open {
            self.emit(OverlayNotification::Opened { surface: id });
        }
        Ok(())
    }

    fn attach(&mut self, id: SurfaceId) -> Result<(), OverlayError> {
        let surface = self.get(id)?;
        let (host, existing) = (surface.host, surface.placeholder);
        // One placeholder per surface, created on first attach and reused.
        let placeholder = match existing {
            Some(placeholder) => placeholder,
            None => {
                let placeholder = self.doc.create_placeholder();
                self.get_mut(id)?.placeholder = Some(placeholder);
                placeholder
            }
        };
        self.doc.detach_with_placeholder(host, placeholder)?;
        self.doc.set_hidden(host, false)?;
        self.registry.attach(id);
        self.bring_to_front_inner(id)
    }

    /// Close a surface, recording the event that caused it. Closing a surface
    /// that is not open is a no-op.
    pub fn close(&mut self, id: SurfaceId, source: Option<InputEvent>) -> Result<(), OverlayError> {
        let result = self.close_inner(id, source);
        self.drain_requests();
        result
    }

    fn close_inner(&mut self, id: SurfaceId, source: Option<InputEvent>) -> Result<(), OverlayError> {
        let surface = self.get_mut(id)?;
        if !surface.is_open() {
            return Ok(());
        }
        surface.listening = false;
        surface.reset_gesture();
        surface.phase = Phase::Closing;
        surface.close_source = source.clone();
        let options = surface.options;

        self.traps.release(id);
        if !options.modeless {
            modal::exit(&mut self.doc, &self.registry, id)?;
        }
        self.restore_focus(id)?;

        tracing::debug!(surface = %id, source = source.as_ref().map(InputEvent::kind), "surface closing");
        self.emit(OverlayNotification::OpenedChanged {
            surface: id,
            opened: false,
        });
        self.emit(OverlayNotification::Closing { surface: id, source });
        if !options.animation.closing {
            self.finish_closing(id)?;
        }
        Ok(())
    }

    fn restore_focus(&mut self, id: SurfaceId) -> Result<(), OverlayError> {
        let surface = self.get_mut(id)?;
        let captured = surface.restore_focus_target.take();
        if !surface.options.restore_focus_on_close {
            return Ok(());
        }
        let Some(target) = surface.options.restore_focus_node.or(captured) else {
            return Ok(());
        };
        let host = surface.host;
        if !focus::should_restore(&self.doc, host) {
            tracing::debug!(surface = %id, "focus moved elsewhere; not restoring");
            return Ok(());
        }
        match self.config.focus_restore {
            FocusRestore::Immediate => restore_to(&mut self.doc, target),
            FocusRestore::Deferred => {
                let cancelled = Rc::new(Cell::new(false));
                self.get_mut(id)?.pending_restore = Some(Rc::clone(&cancelled));
                self.tasks.push(move |doc| {
                    if !cancelled.get() {
                        restore_to(doc, target);
                    }
                });
            }
        }
        Ok(())
    }

    fn finish_closing(&mut self, id: SurfaceId) -> Result<(), OverlayError> {
        let surface = self.get_mut(id)?;
        surface.phase = Phase::Closed;
        let host = surface.host;
        let region = surface.region;
        let placeholder = surface.placeholder;

        if let Some(placeholder) = placeholder {
            self.doc.restore_from_placeholder(host, placeholder)?;
        }
        self.doc.set_hidden(host, true)?;
        self.doc.set_pointer_events(region, None)?;
        self.registry.detach(id);
        self.registry.release_body_lock_if_idle(&mut self.doc)?;

        tracing::debug!(surface = %id, "surface closed");
        self.emit(OverlayNotification::Closed { surface: id });
        Ok(())
    }

    /// Signal that the running entrance or exit animation of `id` ended.
    pub fn animation_finished(&mut self, id: SurfaceId) -> Result<(), OverlayError> {
        let result = match self.get(id)?.phase {
            Phase::Opening => {
                self.get_mut(id)?.phase = Phase::Open;
                tracing::debug!(surface = %id, "entrance finished");
                self.emit(OverlayNotification::Opened { surface: id });
                Ok(())
            }
            Phase::Closing => self.finish_closing(id),
            Phase::Open | Phase::Closed => Ok(()),
        };
        self.drain_requests();
        result
    }

    // --- Input routing ---

    /// Route an input event through the stack.
    ///
    /// Pointer events are hit-tested first: a target that does not take
    /// pointer input is replaced by its nearest ancestor that does.
    pub fn handle_event(&mut self, event: &InputEvent) -> Result<EventOutcome, OverlayError> {
        let result = self.route(event);
        self.drain_requests();
        result
    }

    /// Deliver a key press to the focused element.
    pub fn press_key(&mut self, key: Key, modifiers: Modifiers) -> Result<EventOutcome, OverlayError> {
        let target = self.doc.deep_active_element();
        self.handle_event(&InputEvent::key_with(key, modifiers, target))
    }

    fn route(&mut self, event: &InputEvent) -> Result<EventOutcome, OverlayError> {
        let event = if event.is_pointer() {
            event.retargeted(self.doc.hit_test(event.target()))
        } else {
            event.clone()
        };
        match &event {
            InputEvent::PointerDown { target } => Ok(self.track(*target, true)),
            InputEvent::PointerUp { target } => Ok(self.track(*target, false)),
            InputEvent::Click { target } => self.route_click(&event, *target),
            InputEvent::KeyDown {
                key: Key::Escape,
                target,
                ..
            } => self.route_escape(&event, *target),
            InputEvent::KeyDown {
                key: Key::Tab,
                modifiers,
                ..
            } => {
                let backward = modifiers.contains(Modifiers::SHIFT);
                Ok(match self.traps.cycle(&mut self.doc, backward) {
                    Some(el) => EventOutcome::FocusMoved(el),
                    None => EventOutcome::Ignored,
                })
            }
            InputEvent::KeyDown { .. } => Ok(EventOutcome::Ignored),
        }
    }

    fn track(&mut self, target: ElementId, pressed: bool) -> EventOutcome {
        if self.registry.listening().is_empty() {
            return EventOutcome::Ignored;
        }
        dismiss::track_gesture(&self.doc, &mut self.registry, target, pressed);
        EventOutcome::Tracked
    }

    fn route_click(&mut self, event: &InputEvent, target: ElementId) -> Result<EventOutcome, OverlayError> {
        let listening = self.registry.listening();
        // Non-topmost surfaces classify as shadowed and ignore the click.
        let outside = listening.iter().copied().find(|&id| {
            dismiss::classify_click(&self.doc, &self.registry, id, target) == ClickClass::Outside
        });
        for id in &listening {
            if let Some(surface) = self.registry.get_mut(*id) {
                surface.reset_gesture();
            }
        }
        let Some(id) = outside else {
            return Ok(EventOutcome::Ignored);
        };
        self.dismiss(
            id,
            event,
            OverlayNotification::OutsideClick {
                surface: id,
                source: event.clone(),
            },
        )
    }

    fn route_escape(&mut self, event: &InputEvent, target: ElementId) -> Result<EventOutcome, OverlayError> {
        let Some(id) = self.registry.topmost() else {
            return Ok(EventOutcome::Ignored);
        };
        if !dismiss::escape_applies(&self.doc, &self.registry, id, target) {
            return Ok(EventOutcome::Ignored);
        }
        self.dismiss(
            id,
            event,
            OverlayNotification::EscapePress {
                surface: id,
                source: event.clone(),
            },
        )
    }

    fn dismiss(
        &mut self,
        id: SurfaceId,
        event: &InputEvent,
        notification: OverlayNotification,
    ) -> Result<EventOutcome, OverlayError> {
        let kind = notification.name();
        if !self.emit(notification) || !self.is_open(id) {
            tracing::trace!(surface = %id, kind, "dismissal vetoed");
            return Ok(EventOutcome::Vetoed(id));
        }
        self.close_inner(id, Some(event.clone()))?;
        Ok(EventOutcome::Dismissed(id))
    }

    // --- Deferred work ---

    /// Run the deferred tasks queued before this call (one task-queue turn).
    /// Returns how many ran.
    pub fn run_pending_tasks(&mut self) -> usize {
        self.tasks.run_pending(&mut self.doc)
    }

    /// Number of deferred tasks waiting for the next turn.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }
}

/// Move focus back to `target`; a body target means "nothing focused".
fn restore_to(doc: &mut Document, target: ElementId) {
    if target == doc.body() {
        doc.blur();
        return;
    }
    if let Err(err) = doc.focus(target) {
        tracing::debug!(target = target.id(), %err, "focus restore target unavailable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnimationSpec;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tracing_test::traced_test;

    struct Bed {
        m: OverlayManager,
        trigger: ElementId,
        log: Rc<RefCell<Vec<OverlayNotification>>>,
    }

    impl Bed {
        fn new() -> Self {
            Self::with_config(OverlayConfig::default())
        }

        fn with_config(config: OverlayConfig) -> Self {
            let mut m = OverlayManager::with_config(config);
            let doc = m.document_mut();
            let trigger = doc.create_child(doc.body(), "button").unwrap();
            doc.set_tab_index(trigger, Some(0)).unwrap();
            let log = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&log);
            m.subscribe(move |ctx| sink.borrow_mut().push(ctx.notification().clone()));
            Self { m, trigger, log }
        }

        fn surface(&mut self, options: SurfaceOptions) -> (SurfaceId, ElementId) {
            let body = self.m.document().body();
            let id = self.m.create_surface(body, options).unwrap();
            let region = self.m.surface(id).unwrap().region();
            let doc = self.m.document_mut();
            let button = doc.create_child(region, "button").unwrap();
            doc.set_tab_index(button, Some(0)).unwrap();
            (id, button)
        }

        fn order(&self, id: SurfaceId) -> i32 {
            self.m.surface(id).unwrap().stacking_order().unwrap()
        }

        fn region_inert(&self, id: SurfaceId) -> bool {
            let region = self.m.surface(id).unwrap().region();
            self.m.document().pointer_events(region) == Some(PointerEvents::None)
        }

        fn body_inert(&self) -> bool {
            let doc = self.m.document();
            doc.pointer_events(doc.body()) == Some(PointerEvents::None)
        }

        fn names(&self) -> Vec<&'static str> {
            self.log.borrow().iter().map(OverlayNotification::name).collect()
        }
    }

    #[test]
    fn first_surface_uses_base_z_index() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new());
        bed.m.open(a).unwrap();
        assert_eq!(bed.order(a), 200);
    }

    #[test]
    fn first_surface_prefers_computed_z_index() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new());
        let host = bed.m.surface(a).unwrap().host();
        bed.m.document_mut().set_computed_z_index(host, Some(50)).unwrap();
        bed.m.open(a).unwrap();
        assert_eq!(bed.order(a), 50);
    }

    #[test]
    fn later_surfaces_stack_above() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new());
        let (b, _) = bed.surface(SurfaceOptions::new());
        bed.m.open(a).unwrap();
        bed.m.open(b).unwrap();
        assert_eq!(bed.order(b), bed.order(a) + 1);
        assert_eq!(bed.m.topmost(), Some(b));
        assert_eq!(bed.m.ordered(), vec![a, b]);
    }

    #[test]
    fn bring_to_front_is_idempotent() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new().modeless(true));
        let (b, _) = bed.surface(SurfaceOptions::new().modeless(true));
        bed.m.open(a).unwrap();
        bed.m.open(b).unwrap();

        bed.m.bring_to_front(a).unwrap();
        let raised = bed.order(a);
        assert!(raised > bed.order(b));
        bed.m.bring_to_front(a).unwrap();
        assert_eq!(bed.order(a), raised);
        assert_eq!(bed.m.topmost(), Some(a));
    }

    #[test]
    fn bring_to_front_on_closed_surface_is_noop() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new());
        bed.m.bring_to_front(a).unwrap();
        assert_eq!(bed.m.surface(a).unwrap().stacking_order(), None);
    }

    #[test]
    fn reopen_goes_above_surfaces_opened_meanwhile() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new().modeless(true));
        let (b, _) = bed.surface(SurfaceOptions::new().modeless(true));
        let (c, _) = bed.surface(SurfaceOptions::new().modeless(true));
        bed.m.open(a).unwrap();
        bed.m.open(b).unwrap();
        bed.m.close(a, None).unwrap();
        bed.m.open(c).unwrap();
        bed.m.open(a).unwrap();
        assert!(bed.order(a) > bed.order(b));
        assert!(bed.order(a) > bed.order(c));
        assert_eq!(bed.m.topmost(), Some(a));
    }

    #[test]
    fn host_moves_to_body_and_back() {
        let mut bed = Bed::new();
        let doc = bed.m.document_mut();
        let section = doc.create_child(doc.body(), "section").unwrap();
        let id = bed.m.create_surface(section, SurfaceOptions::new()).unwrap();
        let host = bed.m.surface(id).unwrap().host();

        bed.m.open(id).unwrap();
        let doc = bed.m.document();
        assert_eq!(doc.parent(host), Some(doc.body()));
        assert!(!doc.is_hidden(host));
        assert_eq!(doc.children(section).len(), 1);

        bed.m.close(id, None).unwrap();
        let doc = bed.m.document();
        assert_eq!(doc.children(section), &[host]);
        assert!(doc.is_hidden(host));
    }

    #[test]
    fn lifecycle_notifications_in_order() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new());
        bed.m.open(a).unwrap();
        bed.m.close(a, None).unwrap();
        assert_eq!(
            bed.names(),
            vec!["opened-changed", "opened", "opened-changed", "closing", "closed"]
        );
    }

    #[test]
    fn animated_transitions_wait_for_finish() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new().animation(AnimationSpec::BOTH));
        bed.m.open(a).unwrap();
        assert_eq!(bed.m.surface(a).unwrap().phase(), Phase::Opening);
        assert_eq!(bed.names(), vec!["opened-changed"]);
        bed.m.animation_finished(a).unwrap();
        assert_eq!(bed.m.surface(a).unwrap().phase(), Phase::Open);

        bed.m.close(a, None).unwrap();
        assert!(bed.m.surface(a).unwrap().is_closing());
        assert!(bed.m.registry().is_attached(a));
        assert!(bed.m.ordered().is_empty());
        assert!(bed.body_inert());

        bed.m.animation_finished(a).unwrap();
        assert_eq!(bed.m.surface(a).unwrap().phase(), Phase::Closed);
        assert!(!bed.m.registry().is_attached(a));
        assert!(!bed.body_inert());
    }

    #[test]
    fn reopen_during_exit_flushes_first() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new().animation(AnimationSpec {
            opening: false,
            closing: true,
        }));
        bed.m.open(a).unwrap();
        bed.m.close(a, None).unwrap();
        assert!(bed.m.surface(a).unwrap().is_closing());

        bed.m.open(a).unwrap();
        assert_eq!(bed.m.surface(a).unwrap().phase(), Phase::Open);
        assert_eq!(bed.m.registry().attached(), &[a]);
        assert!(bed.body_inert());
        let names = bed.names();
        assert_eq!(&names[names.len() - 3..], &["closed", "opened-changed", "opened"]);
    }

    #[test]
    fn nested_modal_gates_pointer_events() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new());
        let (b, _) = bed.surface(SurfaceOptions::new());
        bed.m.open(a).unwrap();
        bed.m.open(b).unwrap();
        assert!(bed.region_inert(a));
        assert!(!bed.region_inert(b));

        bed.m.close(b, None).unwrap();
        assert!(!bed.region_inert(a));
        assert!(bed.m.is_open(a));
        assert!(bed.body_inert());

        bed.m.close(a, None).unwrap();
        assert!(!bed.body_inert());
    }

    #[test]
    fn outside_click_closes_topmost() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new());
        bed.m.open(a).unwrap();
        let outcome = bed.m.handle_event(&InputEvent::click(bed.trigger)).unwrap();
        assert_eq!(outcome, EventOutcome::Dismissed(a));
        assert!(!bed.m.is_open(a));
        // The trigger is inert while the modal is open; the click lands on the root.
        let source = bed.m.surface(a).unwrap().close_source().cloned();
        assert_eq!(source, Some(InputEvent::click(bed.m.document().root())));
    }

    #[test]
    fn click_inside_region_is_ignored() {
        let mut bed = Bed::new();
        let (a, inner) = bed.surface(SurfaceOptions::new());
        bed.m.open(a).unwrap();
        assert_eq!(
            bed.m.handle_event(&InputEvent::click(inner)).unwrap(),
            EventOutcome::Ignored
        );
        assert!(bed.m.is_open(a));
    }

    #[test]
    fn outside_click_on_lower_surface_is_ignored_by_it() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new().modeless(true));
        let (b, b_inner) = bed.surface(SurfaceOptions::new().modeless(true));
        bed.m.open(a).unwrap();
        bed.m.open(b).unwrap();
        // Click lands inside B, which is outside A; A is not topmost.
        let outcome = bed.m.handle_event(&InputEvent::click(b_inner)).unwrap();
        assert_eq!(outcome, EventOutcome::Ignored);
        assert!(bed.m.is_open(a));
        assert!(bed.m.is_open(b));
    }

    #[test]
    fn vetoed_outside_click_keeps_surface_open() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new());
        bed.m.subscribe(|ctx| {
            if matches!(ctx.notification(), OverlayNotification::OutsideClick { .. }) {
                ctx.prevent_default();
            }
        });
        bed.m.open(a).unwrap();
        let outcome = bed.m.handle_event(&InputEvent::click(bed.trigger)).unwrap();
        assert_eq!(outcome, EventOutcome::Vetoed(a));
        assert!(bed.m.is_open(a));
        assert!(bed.body_inert());
    }

    #[test]
    fn drag_out_of_region_does_not_dismiss() {
        let mut bed = Bed::new();
        let (a, inner) = bed.surface(SurfaceOptions::new());
        bed.m.open(a).unwrap();
        let root = bed.m.document().root();
        bed.m.handle_event(&InputEvent::PointerDown { target: inner }).unwrap();
        bed.m.handle_event(&InputEvent::PointerUp { target: root }).unwrap();
        assert_eq!(
            bed.m.handle_event(&InputEvent::click(root)).unwrap(),
            EventOutcome::Ignored
        );
        assert!(bed.m.is_open(a));

        // Gesture flags reset after the click.
        assert_eq!(
            bed.m.handle_event(&InputEvent::click(root)).unwrap(),
            EventOutcome::Dismissed(a)
        );
    }

    #[test]
    fn escape_closes_topmost_modal() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new());
        let (b, _) = bed.surface(SurfaceOptions::new());
        bed.m.open(a).unwrap();
        bed.m.open(b).unwrap();
        let outcome = bed.m.press_key(Key::Escape, Modifiers::empty()).unwrap();
        assert_eq!(outcome, EventOutcome::Dismissed(b));
        assert!(bed.m.is_open(a));
        assert_eq!(
            bed.m.press_key(Key::Escape, Modifiers::empty()).unwrap(),
            EventOutcome::Dismissed(a)
        );
    }

    #[test]
    fn vetoed_escape_keeps_surface_open() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new());
        bed.m.subscribe(|ctx| {
            if matches!(ctx.notification(), OverlayNotification::EscapePress { .. }) {
                ctx.prevent_default();
            }
        });
        bed.m.open(a).unwrap();
        assert_eq!(
            bed.m.press_key(Key::Escape, Modifiers::empty()).unwrap(),
            EventOutcome::Vetoed(a)
        );
        assert!(bed.m.is_open(a));
    }

    #[test]
    fn escape_on_modeless_needs_focus_inside() {
        let mut bed = Bed::new();
        let (m, inner) = bed.surface(SurfaceOptions::new().modeless(true));
        bed.m.open(m).unwrap();
        bed.m.document_mut().focus(bed.trigger).unwrap();
        assert_eq!(
            bed.m.press_key(Key::Escape, Modifiers::empty()).unwrap(),
            EventOutcome::Ignored
        );
        bed.m.document_mut().focus(inner).unwrap();
        assert_eq!(
            bed.m.press_key(Key::Escape, Modifiers::empty()).unwrap(),
            EventOutcome::Dismissed(m)
        );
    }

    #[test]
    fn focus_trap_cycles_and_releases() {
        let mut bed = Bed::new();
        let (a, first) = bed.surface(SurfaceOptions::new().focus_trap(true));
        let region = bed.m.surface(a).unwrap().region();
        let doc = bed.m.document_mut();
        let second = doc.create_child(region, "button").unwrap();
        doc.set_tab_index(second, Some(0)).unwrap();
        doc.focus(bed.trigger).unwrap();

        bed.m.open(a).unwrap();
        assert_eq!(bed.m.document().focused(), Some(first));
        assert_eq!(
            bed.m.press_key(Key::Tab, Modifiers::empty()).unwrap(),
            EventOutcome::FocusMoved(second)
        );
        assert_eq!(
            bed.m.press_key(Key::Tab, Modifiers::empty()).unwrap(),
            EventOutcome::FocusMoved(first)
        );
        assert_eq!(
            bed.m.press_key(Key::Tab, Modifiers::SHIFT).unwrap(),
            EventOutcome::FocusMoved(second)
        );

        bed.m.close(a, None).unwrap();
        assert!(!bed.m.focus_traps().is_trapped());
        assert_eq!(
            bed.m.press_key(Key::Tab, Modifiers::empty()).unwrap(),
            EventOutcome::Ignored
        );
    }

    #[traced_test]
    #[test]
    fn empty_trap_region_logs_warning() {
        let mut bed = Bed::new();
        let body = bed.m.document().body();
        let id = bed
            .m
            .create_surface(body, SurfaceOptions::new().focus_trap(true))
            .unwrap();
        bed.m.open(id).unwrap();
        assert!(bed.m.is_open(id));
        assert!(!bed.m.focus_traps().is_trapped());
        assert!(logs_contain("focus trap not installed"));
    }

    #[test]
    fn focus_restored_to_trigger() {
        let mut bed = Bed::new();
        let (a, inner) = bed.surface(SurfaceOptions::new().restore_focus_on_close(true));
        bed.m.document_mut().focus(bed.trigger).unwrap();
        bed.m.open(a).unwrap();
        bed.m.document_mut().focus(inner).unwrap();
        bed.m.close(a, None).unwrap();
        assert_eq!(bed.m.document().focused(), Some(bed.trigger));
    }

    #[test]
    fn focus_not_restored_after_user_moved_it() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new().modeless(true).restore_focus_on_close(true));
        let other = {
            let doc = bed.m.document_mut();
            let other = doc.create_child(doc.body(), "input").unwrap();
            doc.set_tab_index(other, Some(0)).unwrap();
            other
        };
        bed.m.document_mut().focus(bed.trigger).unwrap();
        bed.m.open(a).unwrap();
        bed.m.document_mut().focus(other).unwrap();
        bed.m.close(a, None).unwrap();
        assert_eq!(bed.m.document().focused(), Some(other));
    }

    #[test]
    fn explicit_restore_node_wins() {
        let mut bed = Bed::new();
        let other = {
            let doc = bed.m.document_mut();
            let other = doc.create_child(doc.body(), "input").unwrap();
            doc.set_tab_index(other, Some(0)).unwrap();
            other
        };
        let (a, inner) = bed.surface(
            SurfaceOptions::new()
                .restore_focus_on_close(true)
                .restore_focus_node(Some(other)),
        );
        bed.m.document_mut().focus(bed.trigger).unwrap();
        bed.m.open(a).unwrap();
        bed.m.document_mut().focus(inner).unwrap();
        bed.m.close(a, None).unwrap();
        assert_eq!(bed.m.document().focused(), Some(other));
    }

    #[test]
    fn explicit_restore_node_skipped_after_user_moved_focus() {
        let mut bed = Bed::new();
        let (other, elsewhere) = {
            let doc = bed.m.document_mut();
            let other = doc.create_child(doc.body(), "input").unwrap();
            doc.set_tab_index(other, Some(0)).unwrap();
            let elsewhere = doc.create_child(doc.body(), "input").unwrap();
            doc.set_tab_index(elsewhere, Some(0)).unwrap();
            (other, elsewhere)
        };
        let (a, inner) = bed.surface(
            SurfaceOptions::new()
                .restore_focus_on_close(true)
                .restore_focus_node(Some(other)),
        );
        bed.m.document_mut().focus(bed.trigger).unwrap();
        bed.m.open(a).unwrap();
        bed.m.document_mut().focus(inner).unwrap();
        bed.m.document_mut().focus(elsewhere).unwrap();
        bed.m.close(a, None).unwrap();
        assert_eq!(bed.m.document().focused(), Some(elsewhere));
    }

    #[test]
    fn deferred_restore_waits_one_turn() {
        let mut bed =
            Bed::with_config(OverlayConfig::new().focus_restore(FocusRestore::Deferred));
        let (a, inner) = bed.surface(SurfaceOptions::new().restore_focus_on_close(true));
        bed.m.document_mut().focus(bed.trigger).unwrap();
        bed.m.open(a).unwrap();
        bed.m.document_mut().focus(inner).unwrap();
        bed.m.close(a, None).unwrap();

        assert_eq!(bed.m.pending_tasks(), 1);
        assert_ne!(bed.m.document().focused(), Some(bed.trigger));
        assert_eq!(bed.m.run_pending_tasks(), 1);
        assert_eq!(bed.m.document().focused(), Some(bed.trigger));
    }

    #[traced_test]
    #[test]
    fn reopen_cancels_deferred_restore() {
        let mut bed =
            Bed::with_config(OverlayConfig::new().focus_restore(FocusRestore::Deferred));
        let (a, inner) = bed.surface(
            SurfaceOptions::new()
                .focus_trap(true)
                .restore_focus_on_close(true)
                .animation(AnimationSpec {
                    opening: false,
                    closing: true,
                }),
        );
        bed.m.document_mut().focus(bed.trigger).unwrap();
        bed.m.open(a).unwrap();
        assert_eq!(bed.m.document().focused(), Some(inner));

        bed.m.close(a, None).unwrap();
        assert_eq!(bed.m.pending_tasks(), 1);
        bed.m.open(a).unwrap();
        assert_eq!(bed.m.document().focused(), Some(inner));

        bed.m.run_pending_tasks();
        assert_eq!(bed.m.document().focused(), Some(inner));
        assert_eq!(bed.m.focus_traps().active(), Some(a));
        assert!(logs_contain("pending focus restore cancelled by reopen"));
    }

    #[test]
    fn deferred_restore_that_already_ran_is_not_cancelled_again() {
        let mut bed =
            Bed::with_config(OverlayConfig::new().focus_restore(FocusRestore::Deferred));
        let (a, inner) = bed.surface(SurfaceOptions::new().restore_focus_on_close(true));
        bed.m.document_mut().focus(bed.trigger).unwrap();
        bed.m.open(a).unwrap();
        bed.m.document_mut().focus(inner).unwrap();
        bed.m.close(a, None).unwrap();
        assert_eq!(bed.m.run_pending_tasks(), 1);
        assert_eq!(bed.m.document().focused(), Some(bed.trigger));

        bed.m.open(a).unwrap();
        assert!(bed.m.surface(a).unwrap().pending_restore.is_none());
        assert_eq!(bed.m.pending_tasks(), 0);
    }

    #[test]
    fn open_close_cycles_do_not_grow_document() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new().animation(AnimationSpec::BOTH));
        bed.m.open(a).unwrap();
        bed.m.close(a, None).unwrap();
        bed.m.animation_finished(a).unwrap();
        let nodes = bed.m.document().len();

        for _ in 0..100 {
            bed.m.open(a).unwrap();
            bed.m.close(a, None).unwrap();
            // Reopen during exit flushes through the same placeholder.
            bed.m.open(a).unwrap();
            bed.m.close(a, None).unwrap();
            bed.m.animation_finished(a).unwrap();
        }
        assert_eq!(bed.m.document().len(), nodes);
        let host = bed.m.surface(a).unwrap().host();
        assert_eq!(bed.m.document().parent(host), Some(bed.m.document().body()));
    }

    #[test]
    fn stacking_order_overflow_compacts_instead_of_tying() {
        let mut bed = Bed::with_config(OverlayConfig::new().base_z_index(i32::MAX - 1));
        let (a, _) = bed.surface(SurfaceOptions::new().modeless(true));
        let (b, _) = bed.surface(SurfaceOptions::new().modeless(true));
        let (c, _) = bed.surface(SurfaceOptions::new().modeless(true));
        bed.m.open(a).unwrap();
        bed.m.open(b).unwrap();
        assert_eq!(bed.order(b), i32::MAX);

        bed.m.bring_to_front(a).unwrap();
        assert!(bed.order(a) > bed.order(b));
        assert_eq!(bed.m.ordered(), vec![b, a]);

        bed.m.open(c).unwrap();
        assert!(bed.order(c) > bed.order(a));
        assert!(bed.order(a) > bed.order(b));
        assert_eq!(bed.m.topmost(), Some(c));
    }

    #[test]
    fn listener_requests_apply_after_transition() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new());
        let (b, _) = bed.surface(SurfaceOptions::new());
        // Opening A opens B from inside the notification.
        bed.m.subscribe(move |ctx| {
            if *ctx.notification() == (OverlayNotification::Opened { surface: a }) {
                assert!(!ctx.is_open(b));
                ctx.open(b);
            }
        });
        bed.m.open(a).unwrap();
        assert!(bed.m.is_open(b));
        assert_eq!(bed.m.ordered(), vec![a, b]);
        assert!(bed.region_inert(a));
    }

    #[test]
    fn failed_request_does_not_stop_queue() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new());
        let (b, _) = bed.surface(SurfaceOptions::new());
        let bogus = SurfaceId(999);
        bed.m.subscribe(move |ctx| {
            if *ctx.notification() == (OverlayNotification::Opened { surface: a }) {
                ctx.open(bogus);
                ctx.open(b);
            }
        });
        bed.m.open(a).unwrap();
        assert!(bed.m.is_open(b));
    }

    #[test]
    fn unknown_surface_is_an_error() {
        let mut bed = Bed::new();
        assert!(matches!(
            bed.m.open(SurfaceId(77)),
            Err(OverlayError::UnknownSurface(_))
        ));
        assert!(bed.m.surface_mut(SurfaceId(77)).is_err());
    }

    #[test]
    fn remove_surface_closes_and_drops_host() {
        let mut bed = Bed::new();
        let (a, _) = bed.surface(SurfaceOptions::new().animation(AnimationSpec::BOTH));
        let host = bed.m.surface(a).unwrap().host();
        bed.m.open(a).unwrap();
        bed.m.remove_surface(a).unwrap();
        assert!(bed.m.surface(a).is_none());
        assert!(!bed.m.document().is_connected(host));
        assert!(!bed.body_inert());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bed = Bed::new();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = bed.m.subscribe(move |_| *c.borrow_mut() += 1);
        assert!(bed.m.unsubscribe(id));
        assert!(!bed.m.unsubscribe(id));
        let (a, _) = bed.surface(SurfaceOptions::new());
        bed.m.open(a).unwrap();
        assert_eq!(*count.borrow(), 0);
    }
}
