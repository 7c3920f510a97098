#![forbid(unsafe_code)]

//! Core primitives for Overtop.
//!
//! This crate provides the pieces the overlay stack manager runs on:
//!
//! - [`document`]: an element tree with inline pointer-events, focus, shadow
//!   boundaries, and placeholder-based detach/reinsert.
//! - [`event`]: input events (pointer gestures, clicks, key presses).
//! - [`notify`]: the cancelable notification envelope.
//! - [`task`]: a FIFO of deferred work drained one turn at a time.

pub mod document;
pub mod error;
pub mod event;
pub mod notify;
pub mod task;

pub use document::{Document, ElementId, PointerEvents};
pub use error::DocumentError;
pub use event::{InputEvent, Key, Modifiers};
pub use notify::Cancelable;
pub use task::TaskQueue;
