//! adslot DOM - Page model
//!
//! Arena-based DOM tree with just enough of the platform for ad placement:
//! selectors, block layout, a viewport, custom events and an
//! intersection observer.

mod classlist;
mod document;
mod error;
mod events;
mod geometry;
mod layout;
mod node;
mod observer;
mod selector;
mod tree;

pub use classlist::ClassList;
pub use document::{Document, Viewport};
pub use error::{DomError, DomResult};
pub use events::{CustomEvent, EventBus, Listener, ListenerId, ListenerOptions};
pub use geometry::DOMRect;
pub use layout::layout_tree;
pub use node::{Attribute, BoxStyle, ElementData, Node, NodeData};
pub use observer::{IntersectionObserver, IntersectionObserverEntry, Length, RootMargin};
pub use selector::{query_scoped, AttrSelector, Combinator, Compound, Selector, SelectorList};
pub use tree::{Descendants, DomTree};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Raw arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
