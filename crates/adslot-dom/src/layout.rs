//! Block Layout
//!
//! Every element is a block: it takes the full width of its container,
//! its own content height comes first and its children stack below it.
//! Adjacent sibling margins collapse to the larger of the two.

use crate::{DOMRect, DomTree, NodeId};

/// Block formatting context
struct BlockFormattingContext {
    /// Current Y position (where next block will be placed)
    cursor_y: f64,
    /// Previous bottom margin (for margin collapsing)
    prev_margin_bottom: f64,
}

impl BlockFormattingContext {
    fn new(start_y: f64) -> Self {
        Self { cursor_y: start_y, prev_margin_bottom: 0.0 }
    }

    fn layout_children(&mut self, tree: &mut DomTree, parent: NodeId, x: f64, width: f64) {
        let children: Vec<NodeId> = tree.children(parent).collect();
        for child in children {
            self.layout_block(tree, child, x, width);
        }
    }

    fn layout_block(&mut self, tree: &mut DomTree, id: NodeId, x: f64, width: f64) {
        let Some(style) = tree.element(id).map(|e| e.style) else {
            // Text nodes take no block space
            if let Some(node) = tree.get_mut(id) {
                node.rect = DOMRect::from_xywh(x, self.cursor_y, width, 0.0);
            }
            return;
        };

        if style.hidden {
            hide_subtree(tree, id, x, self.cursor_y);
            return;
        }

        let top = self.cursor_y + self.collapse_margins(style.margin_top);

        let mut inner = BlockFormattingContext::new(top + style.height);
        inner.layout_children(tree, id, x, width);
        let bottom = inner.cursor_y + inner.prev_margin_bottom;

        if let Some(node) = tree.get_mut(id) {
            node.rect = DOMRect::from_xywh(x, top, width, bottom - top);
        }

        self.cursor_y = bottom;
        self.prev_margin_bottom = style.margin_bottom;
    }

    /// Collapse adjacent vertical margins
    fn collapse_margins(&mut self, margin_top: f64) -> f64 {
        let collapsed = margin_top.max(self.prev_margin_bottom);
        self.prev_margin_bottom = 0.0;
        collapsed
    }
}

/// `display: none` boxes and everything under them measure as empty
fn hide_subtree(tree: &mut DomTree, id: NodeId, x: f64, y: f64) {
    let below: Vec<NodeId> = std::iter::once(id).chain(tree.descendants(id)).collect();
    for node in below {
        if let Some(n) = tree.get_mut(node) {
            n.rect = DOMRect::from_xywh(x, y, 0.0, 0.0);
        }
    }
}

/// Lay out the whole document for a viewport `width` wide.
/// Returns the document height.
pub fn layout_tree(tree: &mut DomTree, width: f64) -> f64 {
    let root = tree.root();
    let mut bfc = BlockFormattingContext::new(0.0);
    bfc.layout_children(tree, root, 0.0, width);
    let height = bfc.cursor_y + bfc.prev_margin_bottom;

    if let Some(node) = tree.get_mut(root) {
        node.rect = DOMRect::from_xywh(0.0, 0.0, width, height);
    }
    tracing::trace!(nodes = tree.len(), height, "layout complete");
    height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxStyle;

    fn block(tree: &mut DomTree, parent: NodeId, style: BoxStyle) -> NodeId {
        let id = tree.create_element("div");
        tree.element_mut(id).unwrap().style = style;
        tree.append_child(parent, id).unwrap();
        id
    }

    #[test]
    fn test_block_stacking() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let body = block(&mut tree, root, BoxStyle::default());
        let a = block(&mut tree, body, BoxStyle::with_height(100.0));
        let b = block(&mut tree, body, BoxStyle::with_height(50.0));

        let height = layout_tree(&mut tree, 800.0);

        assert_eq!(tree.get(a).unwrap().rect, DOMRect::from_xywh(0.0, 0.0, 800.0, 100.0));
        assert_eq!(tree.get(b).unwrap().rect.top(), 100.0);
        assert_eq!(tree.get(body).unwrap().rect.height, 150.0);
        assert_eq!(height, 150.0);
    }

    #[test]
    fn test_margin_collapsing() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let a = block(&mut tree, root, BoxStyle { height: 100.0, margin_bottom: 30.0, ..Default::default() });
        let b = block(&mut tree, root, BoxStyle { height: 50.0, margin_top: 20.0, ..Default::default() });

        layout_tree(&mut tree, 800.0);

        assert_eq!(tree.get(a).unwrap().rect.bottom(), 100.0);
        assert_eq!(tree.get(b).unwrap().rect.top(), 130.0);
    }

    #[test]
    fn test_hidden_blocks_take_no_space() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let hidden = block(&mut tree, root, BoxStyle { height: 250.0, hidden: true, ..Default::default() });
        let inner = block(&mut tree, hidden, BoxStyle::with_height(40.0));
        let after = block(&mut tree, root, BoxStyle::with_height(10.0));

        layout_tree(&mut tree, 400.0);

        assert_eq!(tree.get(hidden).unwrap().rect.height, 0.0);
        assert_eq!(tree.get(inner).unwrap().rect.height, 0.0);
        assert_eq!(tree.get(after).unwrap().rect.top(), 0.0);
    }
}
