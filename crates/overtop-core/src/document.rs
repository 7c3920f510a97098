#![forbid(unsafe_code)]

//! Element tree that overlays attach to.
//!
//! The [`Document`] is an arena of elements rooted at a `html` element with a
//! single `body` child. It carries the subset of browser semantics the
//! overlay stack depends on:
//!
//! - **Tree structure**: parent/children links, containment, composed paths.
//! - **Inline pointer-events**: set per element, inherited by descendants
//!   unless overridden.
//! - **Focus**: a single actually-focused element, with document-scope
//!   retargeting across shadow hosts.
//! - **Placeholders**: an element can be moved to the body while a marker
//!   holds its original position.
//!
//! # Invariants
//!
//! 1. Ids are never reused; removed elements stay in the arena, disconnected.
//! 2. The root and body are always connected and cannot be removed.
//! 3. A node is never its own ancestor.
//! 4. The focused element, when set, is connected. Removing a subtree that
//!    holds focus clears it (the body becomes the active element).
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unknown id | Id from another document | `DocumentError::UnknownElement` on mutation; `None`/`false` on query |
//! | Cycle | Appending an ancestor under its descendant | `DocumentError::HierarchyRequest` |
//! | Bad focus | Element not focusable or disconnected | `DocumentError::NotFocusable` / `Disconnected` |

use std::fmt;

use crate::error::DocumentError;

/// Handle to an element of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    /// Get the raw id value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inline `pointer-events` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerEvents {
    /// The element takes part in hit-testing.
    #[default]
    Auto,
    /// The element and (unless overridden) its descendants are skipped by
    /// hit-testing.
    None,
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    tab_index: Option<i32>,
    disabled: bool,
    hidden: bool,
    pointer_events: Option<PointerEvents>,
    computed_z_index: Option<i32>,
    shadow_host: bool,
}

impl Node {
    fn new(tag: String) -> Self {
        Self {
            tag,
            parent: None,
            children: Vec::new(),
            tab_index: None,
            disabled: false,
            hidden: false,
            pointer_events: None,
            computed_z_index: None,
            shadow_host: false,
        }
    }
}

/// Tag given to placeholder markers created by [`Document::create_placeholder`].
pub const PLACEHOLDER_TAG: &str = "#placeholder";

/// An element tree with focus and pointer-events state.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: ElementId,
    body: ElementId,
    focused: Option<ElementId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document containing only `html` and `body`.
    pub fn new() -> Self {
        let mut root = Node::new("html".to_owned());
        let root_id = ElementId(0);
        let body_id = ElementId(1);
        root.children.push(body_id);
        let mut body = Node::new("body".to_owned());
        body.parent = Some(root_id);
        Self {
            nodes: vec![root, body],
            root: root_id,
            body: body_id,
            focused: None,
        }
    }

    /// The document element.
    #[inline]
    pub const fn root(&self) -> ElementId {
        self.root
    }

    /// The body element.
    #[inline]
    pub const fn body(&self) -> ElementId {
        self.body
    }

    /// Number of elements ever created, including disconnected ones.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a document has at least `html` and `body`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, el: ElementId) -> Option<&Node> {
        self.nodes.get(el.index())
    }

    fn node_mut(&mut self, el: ElementId) -> Result<&mut Node, DocumentError> {
        self.nodes
            .get_mut(el.index())
            .ok_or(DocumentError::UnknownElement(el))
    }

    fn check(&self, el: ElementId) -> Result<(), DocumentError> {
        if self.exists(el) {
            Ok(())
        } else {
            Err(DocumentError::UnknownElement(el))
        }
    }

    /// Whether `el` names an element of this document.
    #[inline]
    pub fn exists(&self, el: ElementId) -> bool {
        el.index() < self.nodes.len()
    }

    // --- Construction ---

    /// Create a disconnected element.
    pub fn create_element(&mut self, tag: impl Into<String>) -> ElementId {
        let id = ElementId(self.nodes.len() as u64);
        self.nodes.push(Node::new(tag.into()));
        id
    }

    /// Create an element and append it to `parent`.
    pub fn create_child(
        &mut self,
        parent: ElementId,
        tag: impl Into<String>,
    ) -> Result<ElementId, DocumentError> {
        self.check(parent)?;
        let child = self.create_element(tag);
        self.append_child(parent, child)?;
        Ok(child)
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    /// elsewhere.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), DocumentError> {
        self.check_insertion(parent, child)?;
        self.unlink(child);
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Insert `child` into `parent` immediately before `reference`.
    pub fn insert_before(
        &mut self,
        parent: ElementId,
        child: ElementId,
        reference: ElementId,
    ) -> Result<(), DocumentError> {
        self.check_insertion(parent, child)?;
        self.check(reference)?;
        if self.parent(reference) != Some(parent) {
            return Err(DocumentError::NotAChild { parent, reference });
        }
        if child == reference {
            return Ok(());
        }
        self.unlink(child);
        let node = self.node_mut(parent)?;
        let idx = node
            .children
            .iter()
            .position(|&c| c == reference)
            .ok_or(DocumentError::NotAChild { parent, reference })?;
        node.children.insert(idx, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detach `child` from its parent. Detaching a disconnected element is a
    /// no-op.
    pub fn remove(&mut self, child: ElementId) -> Result<(), DocumentError> {
        self.check(child)?;
        if child == self.root || child == self.body {
            return Err(DocumentError::HierarchyRequest {
                parent: self.root,
                child,
            });
        }
        self.unlink(child);
        Ok(())
    }

    fn check_insertion(&self, parent: ElementId, child: ElementId) -> Result<(), DocumentError> {
        self.check(parent)?;
        self.check(child)?;
        if child == self.root || child == self.body || self.contains(child, parent) {
            return Err(DocumentError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    fn unlink(&mut self, child: ElementId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(parent.index()) {
            node.children.retain(|&c| c != child);
        }
        if let Some(node) = self.nodes.get_mut(child.index()) {
            node.parent = None;
        }
        if let Some(focused) = self.focused
            && self.contains(child, focused)
        {
            #[cfg(feature = "tracing")]
            tracing::trace!(focused = focused.id(), "focused subtree removed, focus cleared");
            self.focused = None;
        }
    }

    // --- Attributes ---

    /// The element's tag name.
    pub fn tag(&self, el: ElementId) -> Option<&str> {
        self.node(el).map(|n| n.tag.as_str())
    }

    /// Set the tab index. `Some(n)` makes the element focusable; `n >= 0`
    /// also puts it in sequential (Tab) navigation.
    pub fn set_tab_index(&mut self, el: ElementId, tab_index: Option<i32>) -> Result<(), DocumentError> {
        self.node_mut(el)?.tab_index = tab_index;
        Ok(())
    }

    /// The element's tab index.
    pub fn tab_index(&self, el: ElementId) -> Option<i32> {
        self.node(el).and_then(|n| n.tab_index)
    }

    /// Mark the element disabled. A disabled element cannot take focus.
    pub fn set_disabled(&mut self, el: ElementId, disabled: bool) -> Result<(), DocumentError> {
        self.node_mut(el)?.disabled = disabled;
        Ok(())
    }

    /// Hide or show the element. Hidden subtrees take neither focus nor
    /// pointer input.
    pub fn set_hidden(&mut self, el: ElementId, hidden: bool) -> Result<(), DocumentError> {
        self.node_mut(el)?.hidden = hidden;
        Ok(())
    }

    /// Whether the element itself carries the hidden flag.
    pub fn is_hidden(&self, el: ElementId) -> bool {
        self.node(el).is_some_and(|n| n.hidden)
    }

    /// Whether the element or one of its ancestors is hidden.
    pub fn is_rendered(&self, el: ElementId) -> bool {
        self.exists(el) && self.ancestors_inclusive(el).all(|a| !self.is_hidden(a))
    }

    /// Set the element's default (computed style) z-index.
    pub fn set_computed_z_index(&mut self, el: ElementId, z: Option<i32>) -> Result<(), DocumentError> {
        self.node_mut(el)?.computed_z_index = z;
        Ok(())
    }

    /// The element's default (computed style) z-index.
    pub fn computed_z_index(&self, el: ElementId) -> Option<i32> {
        self.node(el).and_then(|n| n.computed_z_index)
    }

    /// Mark the element as a shadow host: its descendants live in its shadow
    /// tree and are retargeted to it by [`Document::active_element`].
    pub fn set_shadow_host(&mut self, el: ElementId, host: bool) -> Result<(), DocumentError> {
        self.node_mut(el)?.shadow_host = host;
        Ok(())
    }

    /// Whether the element is a shadow host.
    pub fn is_shadow_host(&self, el: ElementId) -> bool {
        self.node(el).is_some_and(|n| n.shadow_host)
    }

    // --- Tree queries ---

    /// The element's parent, if attached.
    pub fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.node(el).and_then(|n| n.parent)
    }

    /// The element's children in order.
    pub fn children(&self, el: ElementId) -> &[ElementId] {
        self.node(el).map_or(&[], |n| n.children.as_slice())
    }

    /// `el` followed by each ancestor up to the topmost one.
    pub fn ancestors_inclusive(&self, el: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.exists(el).then_some(el), move |&e| self.parent(e))
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        self.ancestors_inclusive(node).any(|a| a == ancestor)
    }

    /// Whether `el` is reachable from the document root.
    pub fn is_connected(&self, el: ElementId) -> bool {
        self.contains(self.root, el)
    }

    /// Event path for `target`: the target followed by all its ancestors.
    ///
    /// Shadow boundaries do not stop the walk (the path is composed).
    pub fn composed_path(&self, target: ElementId) -> Vec<ElementId> {
        self.ancestors_inclusive(target).collect()
    }

    /// Descendants of `root` (including `root`) in tree order.
    pub fn subtree(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        if !self.exists(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(self.children(el).iter().rev().copied());
        }
        out
    }

    // --- Pointer events ---

    /// Set or clear the inline pointer-events value.
    pub fn set_pointer_events(
        &mut self,
        el: ElementId,
        value: Option<PointerEvents>,
    ) -> Result<(), DocumentError> {
        self.node_mut(el)?.pointer_events = value;
        Ok(())
    }

    /// The inline pointer-events value (`None` when unset).
    pub fn pointer_events(&self, el: ElementId) -> Option<PointerEvents> {
        self.node(el).and_then(|n| n.pointer_events)
    }

    /// The pointer-events value in effect: the nearest inline value on the
    /// element or an ancestor, `Auto` if none.
    pub fn effective_pointer_events(&self, el: ElementId) -> PointerEvents {
        self.ancestors_inclusive(el)
            .find_map(|a| self.pointer_events(a))
            .unwrap_or_default()
    }

    /// Whether a pointer event aimed at `el` would land on it.
    pub fn is_hit_testable(&self, el: ElementId) -> bool {
        self.is_connected(el)
            && self.is_rendered(el)
            && self.effective_pointer_events(el) == PointerEvents::Auto
    }

    /// Where a pointer event aimed at `el` actually lands: `el` itself if it
    /// is hit-testable, else its nearest hit-testable ancestor, else the
    /// root.
    pub fn hit_test(&self, el: ElementId) -> ElementId {
        self.ancestors_inclusive(el)
            .find(|&a| self.is_hit_testable(a))
            .unwrap_or(self.root)
    }

    // --- Focus ---

    /// Whether `el` can currently receive focus.
    pub fn is_focusable(&self, el: ElementId) -> bool {
        self.node(el)
            .is_some_and(|n| n.tab_index.is_some() && !n.disabled)
            && self.is_connected(el)
            && self.is_rendered(el)
    }

    /// Whether `el` is focusable and takes part in Tab navigation.
    pub fn is_tabbable(&self, el: ElementId) -> bool {
        self.is_focusable(el) && self.tab_index(el).is_some_and(|t| t >= 0)
    }

    /// Move focus to `el`.
    pub fn focus(&mut self, el: ElementId) -> Result<(), DocumentError> {
        self.check(el)?;
        if !self.is_connected(el) {
            return Err(DocumentError::Disconnected(el));
        }
        if !self.is_focusable(el) {
            return Err(DocumentError::NotFocusable(el));
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(element = el.id(), "focus");
        self.focused = Some(el);
        Ok(())
    }

    /// Drop focus; the body becomes the active element.
    pub fn blur(&mut self) {
        self.focused = None;
    }

    /// The actually focused element, if any.
    #[inline]
    pub fn focused(&self) -> Option<ElementId> {
        self.focused
    }

    /// The deepest focused node, resolved through shadow boundaries.
    ///
    /// Falls back to the body when nothing holds focus.
    pub fn deep_active_element(&self) -> ElementId {
        self.focused
            .filter(|&f| self.is_connected(f))
            .unwrap_or(self.body)
    }

    /// The focused element as seen from document scope: the outermost shadow
    /// host enclosing the focused node, or the node itself.
    pub fn active_element(&self) -> ElementId {
        let deep = self.deep_active_element();
        self.ancestors_inclusive(deep)
            .skip(1)
            .filter(|&a| self.is_shadow_host(a))
            .last()
            .unwrap_or(deep)
    }

    /// Tabbable elements of `root`'s subtree (including `root`) in sequential
    /// navigation order: positive tab indexes ascending, then tab index zero,
    /// each group in tree order.
    pub fn tabbable_elements(&self, root: ElementId) -> Vec<ElementId> {
        let mut positive = Vec::new();
        let mut zero = Vec::new();
        for el in self.subtree(root) {
            if !self.is_tabbable(el) {
                continue;
            }
            match self.tab_index(el) {
                Some(0) => zero.push(el),
                Some(n) => positive.push((n, el)),
                None => {}
            }
        }
        positive.sort_by_key(|&(n, _)| n);
        positive.into_iter().map(|(_, el)| el).chain(zero).collect()
    }

    // --- Placeholders ---

    /// Create a disconnected placeholder marker for [`detach_with_placeholder`].
    ///
    /// One marker can be reused for any number of detach / restore rounds.
    ///
    /// [`detach_with_placeholder`]: Document::detach_with_placeholder
    pub fn create_placeholder(&mut self) -> ElementId {
        self.create_element(PLACEHOLDER_TAG)
    }

    /// Move `el` to the end of the body, leaving `placeholder` where it was.
    ///
    /// If `el` was disconnected the placeholder is left disconnected too.
    pub fn detach_with_placeholder(
        &mut self,
        el: ElementId,
        placeholder: ElementId,
    ) -> Result<(), DocumentError> {
        self.check(el)?;
        self.check(placeholder)?;
        if placeholder == el || self.contains(placeholder, el) {
            return Err(DocumentError::HierarchyRequest {
                parent: placeholder,
                child: el,
            });
        }
        match self.parent(el) {
            Some(parent) => self.insert_before(parent, placeholder, el)?,
            None => self.unlink(placeholder),
        }
        self.append_child(self.body, el)
    }

    /// Put `el` back where `placeholder` sits and disconnect the placeholder.
    ///
    /// A disconnected placeholder means `el` had no original position; it is
    /// simply removed from the body.
    pub fn restore_from_placeholder(
        &mut self,
        el: ElementId,
        placeholder: ElementId,
    ) -> Result<(), DocumentError> {
        self.check(el)?;
        self.check(placeholder)?;
        match self.parent(placeholder) {
            Some(parent) => {
                self.insert_before(parent, el, placeholder)?;
                self.remove(placeholder)
            }
            None => self.remove(el),
        }
    }
}
