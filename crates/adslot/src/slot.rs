//! Slot Factory
//!
//! Builds ad slot elements. Nodes are created detached; inserting them is
//! the caller's job and always happens inside a frame mutation.

use std::fmt;
use std::str::FromStr;

use adslot_dom::{Document, NodeId};

use crate::{AdError, Result};

/// Selector for every ad slot on the page
pub const AD_SLOT_SELECTOR: &str = ".js-ad-slot";

/// Logical slot kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    TopAboveNav,
    Right,
    Inline,
    LiveblogInline,
    MostPop,
    Comments,
    MobileSticky,
    Merchandising,
    MerchandisingHigh,
    FrontsBanner,
    ArticleEnd,
    Survey,
}

/// Per-kind defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindOptions {
    /// Show the "Advertisement" label above the creative
    pub label: bool,
    /// Creatives in this kind may be refreshed
    pub refresh: bool,
    pub out_of_page: bool,
    /// Wait for the slot to near the viewport before loading
    pub lazy: bool,
    /// Slot name used when the caller gives none
    pub name: Option<&'static str>,
}

impl SlotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotKind::TopAboveNav => "top-above-nav",
            SlotKind::Right => "right",
            SlotKind::Inline => "inline",
            SlotKind::LiveblogInline => "liveblog-inline",
            SlotKind::MostPop => "mostpop",
            SlotKind::Comments => "comments",
            SlotKind::MobileSticky => "mobile-sticky",
            SlotKind::Merchandising => "merchandising",
            SlotKind::MerchandisingHigh => "merchandising-high",
            SlotKind::FrontsBanner => "fronts-banner",
            SlotKind::ArticleEnd => "article-end",
            SlotKind::Survey => "survey",
        }
    }

    pub fn options(self) -> KindOptions {
        let base = KindOptions { label: true, refresh: true, out_of_page: false, lazy: true, name: None };
        match self {
            SlotKind::Merchandising | SlotKind::MerchandisingHigh => {
                KindOptions { label: false, refresh: false, ..base }
            }
            SlotKind::TopAboveNav => KindOptions { lazy: false, ..base },
            SlotKind::MobileSticky => KindOptions { name: Some("mobile-sticky"), lazy: false, ..base },
            SlotKind::Survey => KindOptions { label: false, refresh: false, out_of_page: true, lazy: false, ..base },
            _ => base,
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotKind {
    type Err = AdError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "top-above-nav" => SlotKind::TopAboveNav,
            "right" => SlotKind::Right,
            "inline" => SlotKind::Inline,
            "liveblog-inline" => SlotKind::LiveblogInline,
            "mostpop" => SlotKind::MostPop,
            "comments" => SlotKind::Comments,
            "mobile-sticky" => SlotKind::MobileSticky,
            "merchandising" => SlotKind::Merchandising,
            "merchandising-high" => SlotKind::MerchandisingHigh,
            "fronts-banner" => SlotKind::FrontsBanner,
            "article-end" => SlotKind::ArticleEnd,
            "survey" => SlotKind::Survey,
            other => return Err(AdError::UnknownSlotKind(other.to_string())),
        })
    }
}

/// Caller options for [`create_ad_slot`]
#[derive(Debug, Clone, Default)]
pub struct CreateSlotOptions {
    pub name: Option<String>,
    /// Extra modifiers, each rendered as `ad-slot--{class}`
    pub classes: Vec<String>,
}

impl CreateSlotOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), classes: Vec::new() }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }
}

/// DOM id for a slot name
pub fn slot_id(name: &str) -> String {
    format!("dfp-ad--{name}")
}

/// Build a detached ad slot element.
///
/// The same `(kind, name)` always yields the same id, so the registry is
/// what decides whether a second element for that id may live.
pub fn create_ad_slot(document: &mut Document, kind: SlotKind, options: &CreateSlotOptions) -> Result<NodeId> {
    let defaults = kind.options();
    let name = options
        .name
        .clone()
        .or_else(|| defaults.name.map(str::to_string))
        .unwrap_or_else(|| kind.as_str().to_string());

    let node = document.create_block("div", &["js-ad-slot", "ad-slot"], 0.0);
    let tree = document.tree_mut();
    tree.set_attribute(node, "id", &slot_id(&name))?;
    tree.add_class(node, &format!("ad-slot--{kind}"))?;
    for class in &options.classes {
        tree.add_class(node, &format!("ad-slot--{class}"))?;
    }
    tree.set_attribute(node, "data-link-name", &format!("ad slot {name}"))?;
    tree.set_attribute(node, "data-name", &name)?;
    tree.set_attribute(node, "aria-hidden", "true")?;
    if !defaults.label {
        tree.set_attribute(node, "data-label", "false")?;
    }
    if !defaults.refresh {
        tree.set_attribute(node, "data-refresh", "false")?;
    }
    if defaults.out_of_page {
        tree.set_attribute(node, "data-out-of-page", "true")?;
    }
    if !defaults.lazy {
        tree.set_attribute(node, "data-lazy-load", "false")?;
    }

    tracing::debug!(%kind, %name, %node, "created ad slot");
    Ok(node)
}

/// Wrap a detached slot in `div.ad-slot-container`, returns the container
pub fn wrap_slot_in_container(document: &mut Document, slot: NodeId, extra_classes: &[&str]) -> Result<NodeId> {
    let container = document.create_block("div", &["ad-slot-container"], 0.0);
    for class in extra_classes {
        document.tree_mut().add_class(container, class)?;
    }
    document.append_child(container, slot)?;
    Ok(container)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_slot_markup() {
        let mut doc = Document::default();
        let slot = create_ad_slot(&mut doc, SlotKind::Inline, &CreateSlotOptions::named("inline1")).unwrap();

        let tree = doc.tree();
        assert_eq!(tree.get_attribute(slot, "id"), Some("dfp-ad--inline1"));
        assert!(tree.has_class(slot, "js-ad-slot"));
        assert!(tree.has_class(slot, "ad-slot--inline"));
        assert_eq!(tree.get_attribute(slot, "data-name"), Some("inline1"));
        assert_eq!(tree.get_attribute(slot, "data-link-name"), Some("ad slot inline1"));
        assert_eq!(tree.get_attribute(slot, "data-refresh"), None);
        assert!(!doc.is_connected(slot));
    }

    #[test]
    fn test_name_defaults_to_kind() {
        let mut doc = Document::default();
        let slot = create_ad_slot(&mut doc, SlotKind::Right, &CreateSlotOptions::default()).unwrap();
        assert_eq!(doc.tree().get_attribute(slot, "id"), Some("dfp-ad--right"));
    }

    #[test]
    fn test_same_kind_and_name_same_id() {
        let mut doc = Document::default();
        let opts = CreateSlotOptions::named("inline2").with_class("offset-right");
        let a = create_ad_slot(&mut doc, SlotKind::Inline, &opts).unwrap();
        let b = create_ad_slot(&mut doc, SlotKind::Inline, &opts).unwrap();
        assert_ne!(a, b);
        assert_eq!(doc.tree().get_attribute(a, "id"), doc.tree().get_attribute(b, "id"));
        assert!(doc.tree().has_class(b, "ad-slot--offset-right"));
    }

    #[test]
    fn test_merchandising_opts_out_of_refresh() {
        let mut doc = Document::default();
        let slot = create_ad_slot(&mut doc, SlotKind::MerchandisingHigh, &CreateSlotOptions::default()).unwrap();
        assert_eq!(doc.tree().get_attribute(slot, "data-refresh"), Some("false"));
        assert_eq!(doc.tree().get_attribute(slot, "data-label"), Some("false"));
    }

    #[test]
    fn test_top_above_nav_skips_lazy_load() {
        let mut doc = Document::default();
        let top = create_ad_slot(&mut doc, SlotKind::TopAboveNav, &CreateSlotOptions::default()).unwrap();
        let inline = create_ad_slot(&mut doc, SlotKind::Inline, &CreateSlotOptions::named("inline1")).unwrap();
        assert_eq!(doc.tree().get_attribute(top, "data-lazy-load"), Some("false"));
        assert_eq!(doc.tree().get_attribute(inline, "data-lazy-load"), None);
    }

    #[test]
    fn test_wrap_in_container() {
        let mut doc = Document::default();
        let slot = create_ad_slot(&mut doc, SlotKind::Inline, &CreateSlotOptions::named("inline1")).unwrap();
        let container = wrap_slot_in_container(&mut doc, slot, &["offset-right"]).unwrap();
        assert_eq!(doc.tree().parent(slot), Some(container));
        assert!(doc.tree().has_class(container, "ad-slot-container"));
        assert!(doc.tree().has_class(container, "offset-right"));
    }

    #[test]
    fn test_kind_round_trip_and_unknown() {
        assert_eq!("liveblog-inline".parse::<SlotKind>().unwrap(), SlotKind::LiveblogInline);
        assert!(matches!("skyscraper".parse::<SlotKind>(), Err(AdError::UnknownSlotKind(_))));
    }
}
