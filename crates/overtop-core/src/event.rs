#![forbid(unsafe_code)]

//! Input events delivered to the overlay stack.
//!
//! Events are already targeted: the caller (or the document's hit-testing)
//! decides which element an event lands on. Key events target the element
//! holding focus.

use bitflags::bitflags;

use crate::document::ElementId;

bitflags! {
    /// Modifier keys held during a key press.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
        const META  = 0b1000;
    }
}

/// A logical key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Tab,
    Enter,
    Char(char),
    /// Any other named key.
    Other(String),
}

/// An input event aimed at an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Primary button pressed.
    PointerDown { target: ElementId },
    /// Primary button released.
    PointerUp { target: ElementId },
    /// Click (press and release, or keyboard activation).
    Click { target: ElementId },
    /// Key pressed.
    KeyDown {
        key: Key,
        modifiers: Modifiers,
        target: ElementId,
    },
}

impl InputEvent {
    /// A click on `target`.
    pub const fn click(target: ElementId) -> Self {
        Self::Click { target }
    }

    /// A key press without modifiers.
    pub const fn key(key: Key, target: ElementId) -> Self {
        Self::KeyDown {
            key,
            modifiers: Modifiers::empty(),
            target,
        }
    }

    /// A key press with modifiers.
    pub const fn key_with(key: Key, modifiers: Modifiers, target: ElementId) -> Self {
        Self::KeyDown {
            key,
            modifiers,
            target,
        }
    }

    /// The element the event is aimed at.
    pub fn target(&self) -> ElementId {
        match self {
            Self::PointerDown { target }
            | Self::PointerUp { target }
            | Self::Click { target }
            | Self::KeyDown { target, .. } => *target,
        }
    }

    /// The same event aimed at another element.
    #[must_use]
    pub fn retargeted(&self, target: ElementId) -> Self {
        let mut event = self.clone();
        match &mut event {
            Self::PointerDown { target: t }
            | Self::PointerUp { target: t }
            | Self::Click { target: t }
            | Self::KeyDown { target: t, .. } => *t = target,
        }
        event
    }

    /// Whether this is a pointer event (subject to hit-testing).
    pub const fn is_pointer(&self) -> bool {
        matches!(
            self,
            Self::PointerDown { .. } | Self::PointerUp { .. } | Self::Click { .. }
        )
    }

    /// Short name for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PointerDown { .. } => "pointerdown",
            Self::PointerUp { .. } => "pointerup",
            Self::Click { .. } => "click",
            Self::KeyDown { .. } => "keydown",
        }
    }
}
