#![forbid(unsafe_code)]

//! Manager and per-surface configuration.
//!
//! [`OverlayConfig`] holds manager-wide settings; [`SurfaceOptions`] holds the
//! inputs a host component supplies for one surface. Both follow the builder
//! style: start from `default()` and chain setters.
//!
//! With the `config` feature, [`OverlayConfig`] can be loaded from TOML or
//! JSON:
//!
//! ```ignore
//! let config = OverlayConfig::from_toml_str(r#"
//!     base_z_index = 1000
//!     focus_restore = "deferred"
//! "#)?;
//! ```

use overtop_core::ElementId;

/// Default stacking order for the first surface when its host has no
/// computed z-index.
pub const DEFAULT_BASE_Z_INDEX: i32 = 200;

/// When focus returns to the element that held it before a surface opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum FocusRestore {
    /// Focus moves synchronously during close.
    #[default]
    Immediate,
    /// Focus moves on the next task-queue turn
    /// ([`OverlayManager::run_pending_tasks`](crate::OverlayManager::run_pending_tasks)).
    Deferred,
}

/// Manager-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct OverlayConfig {
    /// Stacking order of a surface opened while no other surface is attached,
    /// used when the host element has no computed z-index.
    pub base_z_index: i32,
    /// Focus restoration timing.
    pub focus_restore: FocusRestore,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            base_z_index: DEFAULT_BASE_Z_INDEX,
            focus_restore: FocusRestore::Immediate,
        }
    }
}

impl OverlayConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base z-index.
    #[must_use]
    pub fn base_z_index(mut self, z: i32) -> Self {
        self.base_z_index = z;
        self
    }

    /// Set the focus restoration timing.
    #[must_use]
    pub fn focus_restore(mut self, timing: FocusRestore) -> Self {
        self.focus_restore = timing;
        self
    }
}

/// Errors from loading [`OverlayConfig`].
#[cfg(feature = "config")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "config")]
impl OverlayConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Parse a JSON document. Missing keys take their defaults.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }
}

/// Which transitions of a surface play an animation.
///
/// An animated transition leaves the surface in `Opening`/`Closing` until
/// [`OverlayManager::animation_finished`](crate::OverlayManager::animation_finished)
/// is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimationSpec {
    pub opening: bool,
    pub closing: bool,
}

impl AnimationSpec {
    /// No animation in either direction.
    pub const NONE: Self = Self {
        opening: false,
        closing: false,
    };

    /// Animate both opening and closing.
    pub const BOTH: Self = Self {
        opening: true,
        closing: true,
    };
}

/// Inputs a host component supplies for one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceOptions {
    /// Never blocks interaction with content beneath it.
    pub modeless: bool,
    /// Render a backdrop behind the interactive region.
    pub with_backdrop: bool,
    /// Constrain Tab navigation to the region while open.
    pub focus_trap: bool,
    /// Return focus to the previously focused element on close.
    pub restore_focus_on_close: bool,
    /// Explicit element to restore focus to, instead of the one captured at
    /// open time.
    pub restore_focus_node: Option<ElementId>,
    /// Animated transitions.
    pub animation: AnimationSpec,
}

impl SurfaceOptions {
    /// Modal, no backdrop, no trap, no restoration, no animation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set modeless.
    #[must_use]
    pub fn modeless(mut self, modeless: bool) -> Self {
        self.modeless = modeless;
        self
    }

    /// Set whether a backdrop is rendered.
    #[must_use]
    pub fn with_backdrop(mut self, backdrop: bool) -> Self {
        self.with_backdrop = backdrop;
        self
    }

    /// Set whether focus is trapped.
    #[must_use]
    pub fn focus_trap(mut self, trap: bool) -> Self {
        self.focus_trap = trap;
        self
    }

    /// Set whether focus is restored on close.
    #[must_use]
    pub fn restore_focus_on_close(mut self, restore: bool) -> Self {
        self.restore_focus_on_close = restore;
        self
    }

    /// Set an explicit focus restoration target.
    #[must_use]
    pub fn restore_focus_node(mut self, node: Option<ElementId>) -> Self {
        self.restore_focus_node = node;
        self
    }

    /// Set animated transitions.
    #[must_use]
    pub fn animation(mut self, animation: AnimationSpec) -> Self {
        self.animation = animation;
        self
    }
}
