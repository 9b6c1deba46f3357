//! DOM Tree (arena-based allocation)
//!
//! Core node manipulation: appendChild, insertBefore, remove, plus
//! document-order traversal.

use std::cmp::Ordering;

use crate::{DomError, DomResult, ElementData, Node, NodeId};

/// Arena-based DOM tree. Node 0 is always the document node.
///
/// Removed nodes stay in the arena, detached; ids are never reused.
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self { nodes: vec![Node::document()] }
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the arena, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::text(text))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    fn require_element_mut(&mut self, id: NodeId) -> DomResult<&mut ElementData> {
        match self.get_mut(id) {
            Some(node) => node.as_element_mut().ok_or(DomError::NotAnElement(id)),
            None => Err(DomError::NotFound(id)),
        }
    }

    fn require(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.require_element_mut(id)?.set_attr(name, value);
        Ok(())
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get_attr(name))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> DomResult<()> {
        self.require_element_mut(id)?.classes.add(class);
        Ok(())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.classes.contains(class))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// Unlink a node from its parent, keeping its subtree intact
    pub fn detach(&mut self, id: NodeId) -> DomResult<()> {
        let (parent, prev, next) = {
            let node = self.require(id)?;
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        let Some(parent) = parent else {
            return Ok(());
        };

        match prev {
            Some(prev) => self.nodes[prev.index()].next_sibling = next,
            None => self.nodes[parent.index()].first_child = next,
        }
        match next {
            Some(next) => self.nodes[next.index()].prev_sibling = prev,
            None => self.nodes[parent.index()].last_child = prev,
        }

        let node = &mut self.nodes[id.index()];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        Ok(())
    }

    /// Remove a node (and its subtree) from the document
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        if self.require(id)?.parent.is_none() {
            return Err(DomError::Detached(id));
        }
        self.detach(id)
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.require(parent)?;
        self.require(child)?;
        if child == NodeId::ROOT || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if self.nodes[parent.index()].as_text().is_some() {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    /// Append a child, moving it from its old position if attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference` (or last if `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.check_insertion(parent, child)?;
        if let Some(reference) = reference {
            if reference == child {
                return Ok(child);
            }
            if self.require(reference)?.parent != Some(parent) {
                return Err(DomError::NotAChild { parent, child: reference });
            }
        }
        self.detach(child)?;

        let prev = match reference {
            Some(reference) => self.nodes[reference.index()].prev_sibling,
            None => self.nodes[parent.index()].last_child,
        };

        {
            let node = &mut self.nodes[child.index()];
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = reference;
        }
        match prev {
            Some(prev) => self.nodes[prev.index()].next_sibling = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        match reference {
            Some(reference) => self.nodes[reference.index()].prev_sibling = Some(child),
            None => self.nodes[parent.index()].last_child = Some(child),
        }
        Ok(child)
    }

    /// Insert `child` right after `reference`, which must be attached
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> DomResult<NodeId> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        let next = self.next_sibling(reference);
        self.insert_before(parent, child, next)
    }

    /// Iterate over the direct children of a node
    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.get(parent).and_then(|n| n.first_child);
        std::iter::from_fn(move || {
            let id = current?;
            current = self.nodes[id.index()].next_sibling;
            Some(id)
        })
    }

    /// Element children only
    pub fn element_children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(parent).filter(|&id| self.nodes[id.index()].is_element())
    }

    /// Pre-order (document order) traversal of the subtree below `root`,
    /// `root` itself excluded
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root,
            next: self.get(root).and_then(|n| n.first_child),
        }
    }

    /// Ancestors from the parent up to the document node
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.parent(id);
        std::iter::from_fn(move || {
            let id = current?;
            current = self.parent(id);
            Some(id)
        })
    }

    /// Whether `node` is `ancestor` or lies below it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node is reachable from the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(NodeId::ROOT, id)
    }

    /// Path of child indices from the document node, `None` if detached
    fn path(&self, id: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let index = self.children(parent).position(|c| c == current)?;
            path.push(index);
            current = parent;
        }
        if current != NodeId::ROOT {
            return None;
        }
        path.reverse();
        Some(path)
    }

    /// Compare two connected nodes in document order. Ancestors sort
    /// before their descendants. Detached nodes compare as `None`.
    pub fn compare_document_position(&self, a: NodeId, b: NodeId) -> Option<Ordering> {
        let pa = self.path(a)?;
        let pb = self.path(b)?;
        Some(pa.cmp(&pb))
    }
}

/// Pre-order subtree iterator
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        let node = &self.tree.nodes[current.index()];

        self.next = if let Some(child) = node.first_child {
            Some(child)
        } else {
            // Climb until a next sibling exists, never leaving the root
            let mut cursor = current;
            loop {
                if cursor == self.root {
                    break None;
                }
                let n = &self.tree.nodes[cursor.index()];
                if let Some(sibling) = n.next_sibling {
                    break Some(sibling);
                }
                match n.parent {
                    Some(parent) if parent != self.root => cursor = parent,
                    _ => break None,
                }
            }
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, [NodeId; 3]) {
        let mut tree = DomTree::new();
        let body = tree.create_element("body");
        tree.append_child(tree.root(), body).unwrap();
        let a = tree.create_element("p");
        let b = tree.create_element("p");
        let c = tree.create_element("p");
        for id in [a, b, c] {
            tree.append_child(body, id).unwrap();
        }
        (tree, body, [a, b, c])
    }

    #[test]
    fn test_insert_before_and_after() {
        let (mut tree, body, [a, b, c]) = sample();
        let ad = tree.create_element("div");
        tree.insert_before(body, ad, Some(b)).unwrap();
        assert_eq!(tree.children(body).collect::<Vec<_>>(), vec![a, ad, b, c]);

        tree.insert_after(c, ad).unwrap();
        assert_eq!(tree.children(body).collect::<Vec<_>>(), vec![a, b, c, ad]);
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let (mut tree, body, [a, b, c]) = sample();
        let inner = tree.create_element("span");
        tree.append_child(b, inner).unwrap();

        tree.remove(b).unwrap();
        assert_eq!(tree.children(body).collect::<Vec<_>>(), vec![a, c]);
        assert!(!tree.is_connected(inner));
        assert_eq!(tree.remove(b), Err(DomError::Detached(b)));
    }

    #[test]
    fn test_hierarchy_request() {
        let (mut tree, body, [a, _, _]) = sample();
        let err = tree.append_child(a, body).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest { .. }));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let (mut tree, body, [a, b, c]) = sample();
        let inner = tree.create_element("span");
        tree.append_child(a, inner).unwrap();

        let order: Vec<_> = tree.descendants(body).collect();
        assert_eq!(order, vec![a, inner, b, c]);

        let below_a: Vec<_> = tree.descendants(a).collect();
        assert_eq!(below_a, vec![inner]);
    }

    #[test]
    fn test_compare_document_position() {
        let (tree, body, [a, _, c]) = sample();
        assert_eq!(tree.compare_document_position(a, c), Some(Ordering::Less));
        assert_eq!(tree.compare_document_position(c, a), Some(Ordering::Greater));
        assert_eq!(tree.compare_document_position(body, a), Some(Ordering::Less));
    }
}
