//! DOM Node
//!
//! Nodes live in the arena owned by [`crate::DomTree`] and link to each
//! other by [`NodeId`], never by pointer.

use crate::{ClassList, DOMRect, NodeId};

/// DOM Node - Core structure
#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    /// Last child (for O(1) append)
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Node-specific data
    pub data: NodeData,
    /// Border box computed by the last layout pass
    pub rect: DOMRect,
}

impl Node {
    fn with_data(data: NodeData) -> Self {
        Self {
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            data,
            rect: DOMRect::default(),
        }
    }

    /// Create a new element node
    pub fn element(tag: &str) -> Self {
        Self::with_data(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a new text node
    pub fn text(content: &str) -> Self {
        Self::with_data(NodeData::Text(content.to_string()))
    }

    /// Create a document node
    pub fn document() -> Self {
        Self::with_data(NodeData::Document)
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root
    Document,
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Layout inputs of an element.
///
/// There is no style engine: callers state how tall an element's own
/// content is and the layout pass stacks blocks from that.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxStyle {
    /// Height of the element's own content, children stack below it
    pub height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    /// `display: none`
    pub hidden: bool,
}

impl BoxStyle {
    pub fn with_height(height: f64) -> Self {
        Self { height, ..Self::default() }
    }
}

/// Element-specific data
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag: String,
    /// Cached id attribute
    pub id: Option<String>,
    /// Cached class list
    pub classes: ClassList,
    /// Every other attribute
    pub attrs: Vec<Attribute>,
    pub style: BoxStyle,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: ClassList::new(),
            attrs: Vec::new(),
            style: BoxStyle::default(),
        }
    }

    /// Get an attribute value. `id` is served from the cache; `class`
    /// is not stored as a string, use [`ElementData::classes`].
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        if name == "id" {
            return self.id.as_deref();
        }
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        match name {
            "id" => self.id.is_some(),
            "class" => !self.classes.is_empty(),
            _ => self.attrs.iter().any(|a| a.name == name),
        }
    }

    /// Set an attribute, keeping the id and class caches in sync
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match name {
            "id" => self.id = Some(value.to_string()),
            "class" => self.classes = ClassList::from_string(value),
            _ => {
                if let Some(attr) = self.attrs.iter_mut().find(|a| a.name == name) {
                    attr.value = value.to_string();
                } else {
                    self.attrs.push(Attribute {
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> bool {
        match name {
            "id" => self.id.take().is_some(),
            "class" => {
                let had = !self.classes.is_empty();
                self.classes = ClassList::new();
                had
            }
            _ => {
                let before = self.attrs.len();
                self.attrs.retain(|a| a.name != name);
                before != self.attrs.len()
            }
        }
    }

    /// Read a `data-*` attribute by its dataset key (`linkName`)
    pub fn dataset(&self, key: &str) -> Option<&str> {
        self.get_attr(&data_attribute(key))
    }

    /// Write a `data-*` attribute by its dataset key
    pub fn set_dataset(&mut self, key: &str, value: &str) {
        self.set_attr(&data_attribute(key), value);
    }
}

/// `linkName` -> `data-link-name`
fn data_attribute(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 8);
    name.push_str("data-");
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            name.push('-');
        }
        name.push(c.to_ascii_lowercase());
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_and_class_are_cached() {
        let mut el = ElementData::new("DIV");
        el.set_attr("id", "dfp-ad--inline1");
        el.set_attr("class", "js-ad-slot ad-slot");

        assert_eq!(el.tag, "div");
        assert_eq!(el.get_attr("id"), Some("dfp-ad--inline1"));
        assert!(el.classes.contains("ad-slot"));
        assert!(el.attrs.is_empty());
    }

    #[test]
    fn test_dataset_access() {
        let mut el = ElementData::new("div");
        el.set_dataset("linkName", "ad slot inline1");
        el.set_attr("data-refresh", "false");

        assert_eq!(el.get_attr("data-link-name"), Some("ad slot inline1"));
        assert_eq!(el.dataset("refresh"), Some("false"));
        assert!(el.remove_attr("data-refresh"));
        assert_eq!(el.dataset("refresh"), None);
    }
}
