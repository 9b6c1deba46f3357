//! Document - High-level page API
//!
//! Owns the tree, the `<body>` element and the viewport. Layout is
//! recomputed lazily: mutations mark the document dirty and the next
//! measurement pays for one layout pass.

use crate::{layout_tree, BoxStyle, DOMRect, DomError, DomResult, DomTree, NodeId, SelectorList};

/// The visible window onto the document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Document y offset of the top of the viewport
    pub scroll_y: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, scroll_y: 0.0 }
    }

    /// Visible area in document coordinates
    pub fn rect(&self) -> DOMRect {
        DOMRect::from_xywh(0.0, self.scroll_y, self.width, self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1300.0, 800.0)
    }
}

/// HTML Document
#[derive(Debug, Clone)]
pub struct Document {
    tree: DomTree,
    html_element: NodeId,
    body_element: NodeId,
    viewport: Viewport,
    layout_dirty: bool,
    height: f64,
}

impl Document {
    /// Create a document with `<html><body>` for the given viewport
    pub fn new(viewport: Viewport) -> Self {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let body = tree.create_element("body");
        let root = tree.root();
        // Freshly created nodes in a fresh tree cannot fail to link
        let _ = tree.append_child(root, html);
        let _ = tree.append_child(html, body);

        Self {
            tree,
            html_element: html,
            body_element: body,
            viewport,
            layout_dirty: true,
            height: 0.0,
        }
    }

    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    pub fn body(&self) -> NodeId {
        self.body_element
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Mutable tree access; invalidates layout
    pub fn tree_mut(&mut self) -> &mut DomTree {
        self.layout_dirty = true;
        &mut self.tree
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Resize the window; a width change invalidates layout
    pub fn resize(&mut self, width: f64, height: f64) {
        if width != self.viewport.width {
            self.layout_dirty = true;
        }
        self.viewport.width = width;
        self.viewport.height = height;
    }

    /// Scroll so the viewport top sits at `y`, clamped to the document
    pub fn scroll_to(&mut self, y: f64) {
        self.ensure_layout();
        let max = (self.height - self.viewport.height).max(0.0);
        self.viewport.scroll_y = y.clamp(0.0, max);
    }

    /// Create an element with classes and a layout height, not yet attached
    pub fn create_block(&mut self, tag: &str, classes: &[&str], height: f64) -> NodeId {
        let id = self.tree_mut().create_element(tag);
        if let Some(el) = self.tree.element_mut(id) {
            for class in classes {
                el.classes.add(class);
            }
            el.style = BoxStyle::with_height(height);
        }
        id
    }

    pub fn set_style(&mut self, id: NodeId, style: BoxStyle) -> DomResult<()> {
        let el = self.tree_mut().element_mut(id).ok_or(DomError::NotAnElement(id))?;
        el.style = style;
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.tree_mut().append_child(parent, child)
    }

    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<NodeId> {
        self.tree_mut().insert_before(parent, child, reference)
    }

    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.tree_mut().insert_after(reference, child)
    }

    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        self.tree_mut().remove(id)
    }

    /// Get element by ID, connected elements only
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .descendants(self.tree.root())
            .find(|&node| self.tree.element(node).and_then(|e| e.id.as_deref()) == Some(id))
    }

    /// All connected elements matching `selector`, in document order
    pub fn query_selector_all(&self, selector: &str) -> DomResult<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(list.query_all(&self.tree, self.tree.root()))
    }

    pub fn query_selector(&self, selector: &str) -> DomResult<Option<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(list.query(&self.tree, self.tree.root()))
    }

    /// Elements under `scope` matching a scope-relative selector
    pub fn query_within(&self, scope: NodeId, selector: &str) -> DomResult<Vec<NodeId>> {
        crate::query_scoped(&self.tree, scope, selector)
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.tree.is_connected(id)
    }

    /// Recompute layout if anything changed since the last pass
    pub fn ensure_layout(&mut self) {
        if self.layout_dirty {
            self.height = layout_tree(&mut self.tree, self.viewport.width);
            self.layout_dirty = false;
        }
    }

    pub fn needs_layout(&self) -> bool {
        self.layout_dirty
    }

    /// Border box in document coordinates (forces layout)
    pub fn bounding_rect(&mut self, id: NodeId) -> DomResult<DOMRect> {
        self.ensure_layout();
        self.tree.get(id).map(|n| n.rect).ok_or(DomError::NotFound(id))
    }

    /// Rect from the last layout pass without forcing a new one
    pub fn last_rect(&self, id: NodeId) -> Option<DOMRect> {
        self.tree.get(id).map(|n| n.rect)
    }

    /// Total document height (forces layout)
    pub fn scroll_height(&mut self) -> f64 {
        self.ensure_layout();
        self.height
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_lazy() {
        let mut doc = Document::new(Viewport::new(400.0, 800.0));
        let body = doc.body();
        let p = doc.create_block("p", &[], 120.0);
        doc.append_child(body, p).unwrap();
        assert!(doc.needs_layout());

        assert_eq!(doc.bounding_rect(p).unwrap().height, 120.0);
        assert!(!doc.needs_layout());

        let ad = doc.create_block("div", &["ad-slot"], 250.0);
        doc.insert_before(body, ad, Some(p)).unwrap();
        assert_eq!(doc.bounding_rect(p).unwrap().top(), 250.0);
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut doc = Document::new(Viewport::new(400.0, 800.0));
        let body = doc.body();
        let p = doc.create_block("p", &[], 1000.0);
        doc.append_child(body, p).unwrap();

        doc.scroll_to(5000.0);
        assert_eq!(doc.viewport().scroll_y, 200.0);
        doc.scroll_to(-10.0);
        assert_eq!(doc.viewport().scroll_y, 0.0);
    }

    #[test]
    fn test_get_element_by_id_ignores_detached() {
        let mut doc = Document::default();
        let body = doc.body();
        let el = doc.create_block("div", &[], 0.0);
        doc.tree_mut().set_attribute(el, "id", "dfp-ad--top-above-nav").unwrap();
        assert_eq!(doc.get_element_by_id("dfp-ad--top-above-nav"), None);

        doc.append_child(body, el).unwrap();
        assert_eq!(doc.get_element_by_id("dfp-ad--top-above-nav"), Some(el));
    }
}
