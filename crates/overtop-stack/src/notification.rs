#![forbid(unsafe_code)]

//! Notifications emitted by the manager and the listener context.
//!
//! Listeners are called synchronously, in subscription order, while the
//! manager is in the middle of a transition. They see the document and the
//! registry read-only and cannot call back into the manager. Instead they
//! queue [`Request`]s through the [`NotificationContext`]; the manager
//! applies queued requests in FIFO order once the current transition is
//! complete and before the public call that triggered it returns.

use overtop_core::{Cancelable, Document, ElementId, InputEvent};

use crate::registry::SurfaceRegistry;
use crate::surface::SurfaceId;

/// A lifecycle or dismissal notification about one surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayNotification {
    /// The surface finished opening (after the entrance animation, if any).
    Opened { surface: SurfaceId },
    /// The surface began closing.
    Closing {
        surface: SurfaceId,
        source: Option<InputEvent>,
    },
    /// The surface finished closing and was detached.
    Closed { surface: SurfaceId },
    /// A click landed outside the topmost surface. Cancelable.
    OutsideClick {
        surface: SurfaceId,
        source: InputEvent,
    },
    /// Escape was pressed for the topmost surface. Cancelable.
    EscapePress {
        surface: SurfaceId,
        source: InputEvent,
    },
    /// The opened state flipped.
    OpenedChanged { surface: SurfaceId, opened: bool },
}

impl OverlayNotification {
    /// The surface the notification is about.
    pub fn surface(&self) -> SurfaceId {
        match self {
            Self::Opened { surface }
            | Self::Closing { surface, .. }
            | Self::Closed { surface }
            | Self::OutsideClick { surface, .. }
            | Self::EscapePress { surface, .. }
            | Self::OpenedChanged { surface, .. } => *surface,
        }
    }

    /// The input event that caused the notification, if any.
    pub fn source_event(&self) -> Option<&InputEvent> {
        match self {
            Self::Closing { source, .. } => source.as_ref(),
            Self::OutsideClick { source, .. } | Self::EscapePress { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether listeners may veto the default action.
    pub const fn is_cancelable(&self) -> bool {
        matches!(self, Self::OutsideClick { .. } | Self::EscapePress { .. })
    }

    /// Short name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Opened { .. } => "opened",
            Self::Closing { .. } => "closing",
            Self::Closed { .. } => "closed",
            Self::OutsideClick { .. } => "outside-click",
            Self::EscapePress { .. } => "escape-press",
            Self::OpenedChanged { .. } => "opened-changed",
        }
    }

    pub(crate) fn into_envelope(self) -> Cancelable<Self> {
        if self.is_cancelable() {
            Cancelable::new(self)
        } else {
            Cancelable::fixed(self)
        }
    }
}

/// Follow-up operation queued by a listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Open(SurfaceId),
    Close(SurfaceId, Option<InputEvent>),
    BringToFront(SurfaceId),
    Focus(ElementId),
}

/// Handle to a subscribed listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Boxed listener callback.
pub type Listener = Box<dyn FnMut(&mut NotificationContext<'_>)>;

/// What a listener sees while handling one notification.
pub struct NotificationContext<'a> {
    pub(crate) envelope: &'a mut Cancelable<OverlayNotification>,
    pub(crate) document: &'a Document,
    pub(crate) registry: &'a SurfaceRegistry,
    pub(crate) requests: &'a mut Vec<Request>,
}

impl NotificationContext<'_> {
    /// The notification being dispatched.
    pub fn notification(&self) -> &OverlayNotification {
        self.envelope.payload()
    }

    /// The surface the notification is about.
    pub fn surface(&self) -> SurfaceId {
        self.envelope.payload().surface()
    }

    /// Read-only view of the document.
    pub fn document(&self) -> &Document {
        self.document
    }

    /// Whether `surface` is currently open.
    pub fn is_open(&self, surface: SurfaceId) -> bool {
        self.registry.get(surface).is_some_and(|s| s.is_open())
    }

    /// The topmost surface of the global stack.
    pub fn topmost(&self) -> Option<SurfaceId> {
        self.registry.topmost()
    }

    /// Veto the default action (close). Ignored for non-cancelable
    /// notifications.
    pub fn prevent_default(&mut self) {
        self.envelope.prevent_default();
    }

    /// Whether a listener already vetoed the default action.
    pub fn is_default_prevented(&self) -> bool {
        self.envelope.is_default_prevented()
    }

    /// Queue opening `surface`.
    pub fn open(&mut self, surface: SurfaceId) {
        self.requests.push(Request::Open(surface));
    }

    /// Queue closing `surface`.
    pub fn close(&mut self, surface: SurfaceId, source: Option<InputEvent>) {
        self.requests.push(Request::Close(surface, source));
    }

    /// Queue raising `surface` to the front.
    pub fn bring_to_front(&mut self, surface: SurfaceId) {
        self.requests.push(Request::BringToFront(surface));
    }

    /// Queue moving focus to `element`.
    pub fn focus(&mut self, element: ElementId) {
        self.requests.push(Request::Focus(element));
    }
}
