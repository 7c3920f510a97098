#![forbid(unsafe_code)]

//! Errors raised by document mutations.

use crate::document::ElementId;

/// Errors from [`Document`](crate::Document) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// The id does not name an element of this document.
    #[error("unknown element {0}")]
    UnknownElement(ElementId),
    /// The element cannot receive focus (no tab index, disabled, or hidden).
    #[error("element {0} is not focusable")]
    NotFocusable(ElementId),
    /// The element is not connected to the document root.
    #[error("element {0} is not connected to the document")]
    Disconnected(ElementId),
    /// Inserting `child` under `parent` would make a node its own ancestor.
    #[error("cannot insert {child} under {parent}: would create a cycle")]
    HierarchyRequest { parent: ElementId, child: ElementId },
    /// `reference` is not a child of `parent`.
    #[error("element {reference} is not a child of {parent}")]
    NotAChild {
        parent: ElementId,
        reference: ElementId,
    },
}
