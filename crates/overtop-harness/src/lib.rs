#![forbid(unsafe_code)]

//! Test harness and reference host components for Overtop.
//!
//! - [`Fixture`]: a scripted page (main area, trigger button, background
//!   button) around an [`OverlayManager`], with gesture helpers and a
//!   notification log.
//! - [`Dialog`] and [`Menu`]: minimal host components written against the
//!   [`Surface`] capability interface only.
//! - [`stack_snapshot`]: a textual dump of the stack and pointer gating for
//!   readable assertions.
//! - [`StackOp`] and [`stack_ops`]: proptest strategies over random
//!   open/close/dismiss sequences.

use std::cell::{Cell, RefCell};
use std::fmt::Write as _;
use std::rc::Rc;

use overtop_core::{ElementId, InputEvent, Key, Modifiers, PointerEvents};
use overtop_stack::{
    AnimationSpec, EventOutcome, ListenerId, OverlayConfig, OverlayError, OverlayManager, OverlayNotification,
    Surface, SurfaceId, SurfaceOptions,
};
use proptest::prelude::*;

// ============================================================================
// Notification log
// ============================================================================

/// Shared record of every notification the manager emitted.
#[derive(Debug, Clone, Default)]
pub struct NotificationLog(Rc<RefCell<Vec<OverlayNotification>>>);

impl NotificationLog {
    /// All notifications so far.
    pub fn entries(&self) -> Vec<OverlayNotification> {
        self.0.borrow().clone()
    }

    /// Notification names, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.0.borrow().iter().map(OverlayNotification::name).collect()
    }

    /// Names of notifications about `surface`, in order.
    pub fn names_for(&self, surface: SurfaceId) -> Vec<&'static str> {
        self.0
            .borrow()
            .iter()
            .filter(|n| n.surface() == surface)
            .map(OverlayNotification::name)
            .collect()
    }

    /// How many notifications named `name` were emitted.
    pub fn count(&self, name: &str) -> usize {
        self.0.borrow().iter().filter(|n| n.name() == name).count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

// ============================================================================
// Fixture
// ============================================================================

/// A page with a trigger button, a background button, and a manager.
///
/// ```text
/// html
/// └── body
///     └── main
///         ├── button (trigger)
///         └── button (background)
/// ```
#[derive(Debug)]
pub struct Fixture {
    pub manager: OverlayManager,
    pub main: ElementId,
    pub trigger: ElementId,
    pub background: ElementId,
    log: NotificationLog,
}

impl Fixture {
    pub fn new() -> Result<Self, OverlayError> {
        Self::with_config(OverlayConfig::default())
    }

    pub fn with_config(config: OverlayConfig) -> Result<Self, OverlayError> {
        let mut manager = OverlayManager::with_config(config);
        let doc = manager.document_mut();
        let main = doc.create_child(doc.body(), "main")?;
        let trigger = doc.create_child(main, "button")?;
        doc.set_tab_index(trigger, Some(0))?;
        let background = doc.create_child(main, "button")?;
        doc.set_tab_index(background, Some(0))?;

        let log = NotificationLog::default();
        let sink = log.clone();
        manager.subscribe(move |ctx| sink.0.borrow_mut().push(ctx.notification().clone()));
        Ok(Self {
            manager,
            main,
            trigger,
            background,
            log,
        })
    }

    pub fn log(&self) -> &NotificationLog {
        &self.log
    }

    /// Create a surface under the main area whose region holds `buttons`
    /// tabbable buttons.
    pub fn add_surface(
        &mut self,
        options: SurfaceOptions,
        buttons: usize,
    ) -> Result<(SurfaceId, Vec<ElementId>), OverlayError> {
        let id = self.manager.create_surface(self.main, options)?;
        let content = self.fill_region(id, buttons)?;
        Ok((id, content))
    }

    /// Append `buttons` tabbable buttons to the region of `id`.
    pub fn fill_region(
        &mut self,
        id: SurfaceId,
        buttons: usize,
    ) -> Result<Vec<ElementId>, OverlayError> {
        let region = self.region(id)?;
        let doc = self.manager.document_mut();
        (0..buttons)
            .map(|_| -> Result<ElementId, OverlayError> {
                let button = doc.create_child(region, "button")?;
                doc.set_tab_index(button, Some(0))?;
                Ok(button)
            })
            .collect()
    }

    pub fn region(&self, id: SurfaceId) -> Result<ElementId, OverlayError> {
        self.manager
            .surface(id)
            .map(|s| s.region())
            .ok_or(OverlayError::UnknownSurface(id))
    }

    pub fn backdrop(&self, id: SurfaceId) -> Option<ElementId> {
        self.manager.surface(id).and_then(|s| s.backdrop())
    }

    /// Full press / release / click gesture on `target`. Returns the outcome
    /// of the click.
    pub fn click(&mut self, target: ElementId) -> Result<EventOutcome, OverlayError> {
        self.drag(target, target)
    }

    /// Press on `from`, release on `to`, then click on the element the click
    /// would land on: `to` if both ends agree, otherwise the root.
    pub fn drag(&mut self, from: ElementId, to: ElementId) -> Result<EventOutcome, OverlayError> {
        tracing::trace!(from = from.id(), to = to.id(), "pointer gesture");
        self.manager
            .handle_event(&InputEvent::PointerDown { target: from })?;
        self.manager
            .handle_event(&InputEvent::PointerUp { target: to })?;
        let target = if from == to {
            to
        } else {
            self.manager.document().root()
        };
        self.manager.handle_event(&InputEvent::click(target))
    }

    /// Press a key on the focused element.
    pub fn press(&mut self, key: Key) -> Result<EventOutcome, OverlayError> {
        self.manager.press_key(key, Modifiers::empty())
    }

    pub fn press_with(&mut self, key: Key, modifiers: Modifiers) -> Result<EventOutcome, OverlayError> {
        self.manager.press_key(key, modifiers)
    }

    pub fn focus(&mut self, element: ElementId) -> Result<(), OverlayError> {
        self.manager.document_mut().focus(element)?;
        Ok(())
    }

    pub fn focused(&self) -> Option<ElementId> {
        self.manager.document().focused()
    }

    /// Inline pointer-events of the body.
    pub fn body_pointer_events(&self) -> Option<PointerEvents> {
        let doc = self.manager.document();
        doc.pointer_events(doc.body())
    }

    /// Whether the region of `id` has inline `pointer-events: none`.
    pub fn region_inert(&self, id: SurfaceId) -> bool {
        self.manager
            .surface(id)
            .is_some_and(|s| self.manager.document().pointer_events(s.region()) == Some(PointerEvents::None))
    }
}

// ============================================================================
// Host components
// ============================================================================

/// Drive any surface from a boolean toggle.
pub fn toggle(surface: &mut impl Surface) -> Result<bool, OverlayError> {
    let opened = !surface.is_open();
    surface.set_opened(opened)?;
    Ok(opened)
}

/// Modal dialog with optional vetoes on outside-click and Escape dismissal.
#[derive(Debug)]
pub struct Dialog {
    id: SurfaceId,
    listener: ListenerId,
    keep_on_outside_click: Rc<Cell<bool>>,
    keep_on_escape: Rc<Cell<bool>>,
}

impl Dialog {
    /// Create a modal dialog with a backdrop, a focus trap, and focus
    /// restoration, holding `buttons` buttons.
    pub fn new(fixture: &mut Fixture, buttons: usize) -> Result<Self, OverlayError> {
        let options = SurfaceOptions::new()
            .with_backdrop(true)
            .focus_trap(true)
            .restore_focus_on_close(true);
        let (id, _) = fixture.add_surface(options, buttons)?;

        let keep_on_outside_click = Rc::new(Cell::new(false));
        let keep_on_escape = Rc::new(Cell::new(false));
        let (outside, escape) = (Rc::clone(&keep_on_outside_click), Rc::clone(&keep_on_escape));
        let listener = fixture.manager.subscribe(move |ctx| {
            let veto = match ctx.notification() {
                OverlayNotification::OutsideClick { surface, .. } if *surface == id => outside.get(),
                OverlayNotification::EscapePress { surface, .. } if *surface == id => escape.get(),
                _ => false,
            };
            if veto {
                ctx.prevent_default();
            }
        });
        Ok(Self {
            id,
            listener,
            keep_on_outside_click,
            keep_on_escape,
        })
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Keep the dialog open when the user clicks outside it.
    pub fn set_keep_on_outside_click(&self, keep: bool) {
        self.keep_on_outside_click.set(keep);
    }

    /// Keep the dialog open when the user presses Escape.
    pub fn set_keep_on_escape(&self, keep: bool) {
        self.keep_on_escape.set(keep);
    }

    pub fn open(&self, manager: &mut OverlayManager) -> Result<(), OverlayError> {
        manager.surface_mut(self.id)?.open()
    }

    pub fn close(&self, manager: &mut OverlayManager) -> Result<(), OverlayError> {
        manager.surface_mut(self.id)?.close(None)
    }

    pub fn is_open(&self, manager: &mut OverlayManager) -> Result<bool, OverlayError> {
        Ok(manager.surface_mut(self.id)?.is_open())
    }

    /// Remove the dialog and its listener.
    pub fn dispose(self, manager: &mut OverlayManager) -> Result<(), OverlayError> {
        manager.unsubscribe(self.listener);
        manager.remove_surface(self.id)
    }
}

/// Modeless menu toggled from a trigger.
#[derive(Debug, Clone, Copy)]
pub struct Menu {
    id: SurfaceId,
}

impl Menu {
    pub fn new(fixture: &mut Fixture, items: usize) -> Result<Self, OverlayError> {
        let options = SurfaceOptions::new()
            .modeless(true)
            .restore_focus_on_close(true);
        let (id, _) = fixture.add_surface(options, items)?;
        Ok(Self { id })
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Open the menu if closed, close it if open. Returns the new state.
    pub fn toggle(&self, manager: &mut OverlayManager) -> Result<bool, OverlayError> {
        toggle(&mut manager.surface_mut(self.id)?)
    }
}

// ============================================================================
// Snapshot
// ============================================================================

fn pointer_label(value: Option<PointerEvents>) -> &'static str {
    match value {
        None => "-",
        Some(PointerEvents::Auto) => "auto",
        Some(PointerEvents::None) => "none",
    }
}

/// Render the stack bottom to top, with each region's inline pointer-events.
///
/// ```text
/// body pe=none
/// surface-1 z=200 modal Open pe=none
/// surface-2 z=201 modal Open pe=-
/// ```
pub fn stack_snapshot(manager: &OverlayManager) -> String {
    let doc = manager.document();
    let mut out = format!("body pe={}\n", pointer_label(doc.pointer_events(doc.body())));
    for id in manager.ordered() {
        let Some(surface) = manager.surface(id) else {
            continue;
        };
        let order = surface
            .stacking_order()
            .map_or_else(|| "?".to_string(), |z| z.to_string());
        let kind = if surface.is_modeless() { "modeless" } else { "modal" };
        let _ = writeln!(
            out,
            "{id} z={order} {kind} {:?} pe={}",
            surface.phase(),
            pointer_label(doc.pointer_events(surface.region()))
        );
    }
    out
}

// ============================================================================
// Property-test operations
// ============================================================================

/// One step of a random stack scenario. Indices pick a surface modulo the
/// number of surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackOp {
    Open(usize),
    Close(usize),
    FinishAnimation(usize),
    ClickOutside,
    ClickInside(usize),
    Escape,
}

/// Strategy over single operations.
pub fn stack_op() -> impl Strategy<Value = StackOp> {
    prop_oneof![
        3 => (0..8usize).prop_map(StackOp::Open),
        2 => (0..8usize).prop_map(StackOp::Close),
        2 => (0..8usize).prop_map(StackOp::FinishAnimation),
        1 => Just(StackOp::ClickOutside),
        1 => (0..8usize).prop_map(StackOp::ClickInside),
        1 => Just(StackOp::Escape),
    ]
}

/// Strategy over operation sequences.
pub fn stack_ops(max_len: usize) -> impl Strategy<Value = Vec<StackOp>> {
    proptest::collection::vec(stack_op(), 0..max_len)
}

/// Strategy over surface options: modal or modeless, trapped or not,
/// animated or not.
pub fn surface_options() -> impl Strategy<Value = SurfaceOptions> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(modeless, trap, opening, closing)| {
            SurfaceOptions::new()
                .modeless(modeless)
                .focus_trap(trap)
                .restore_focus_on_close(true)
                .animation(AnimationSpec { opening, closing })
        },
    )
}

/// Apply `op` to the fixture's surfaces.
pub fn apply_op(
    fixture: &mut Fixture,
    surfaces: &[(SurfaceId, ElementId)],
    op: &StackOp,
) -> Result<(), OverlayError> {
    if surfaces.is_empty() {
        return Ok(());
    }
    let pick = |i: usize| surfaces[i % surfaces.len()];
    match *op {
        StackOp::Open(i) => fixture.manager.open(pick(i).0),
        StackOp::Close(i) => fixture.manager.close(pick(i).0, None),
        StackOp::FinishAnimation(i) => fixture.manager.animation_finished(pick(i).0),
        StackOp::ClickOutside => fixture.click(fixture.background).map(drop),
        StackOp::ClickInside(i) => fixture.click(pick(i).1).map(drop),
        StackOp::Escape => fixture.press(Key::Escape).map(drop),
    }
}
