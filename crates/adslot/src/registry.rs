//! Advert Registry
//!
//! The single source of truth for which adverts exist. All mutation
//! happens synchronously, callers never hold a borrow across an await.

use adslot_dom::NodeId;

use crate::advert::Advert;
use crate::{AdError, Result};

#[derive(Debug, Default)]
pub struct AdvertRegistry {
    /// Registration order
    adverts: Vec<Advert>,
    /// Observed by the lazy loader, not loaded yet
    to_load: Vec<String>,
    /// Tracked by the refresh coordinator
    to_refresh: Vec<String>,
}

impl AdvertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new advert. An id that is already registered is rejected.
    pub fn register(&mut self, advert: Advert) -> Result<()> {
        if self.contains(&advert.id) {
            tracing::warn!(id = %advert.id, "rejected duplicate advert");
            return Err(AdError::DuplicateAdvert { id: advert.id });
        }
        tracing::debug!(id = %advert.id, "registered advert");
        self.adverts.push(advert);
        Ok(())
    }

    /// Replace an advert on purpose, returns the previous entry
    pub fn replace(&mut self, advert: Advert) -> Option<Advert> {
        match self.adverts.iter_mut().find(|a| a.id == advert.id) {
            Some(existing) => Some(std::mem::replace(existing, advert)),
            None => {
                self.adverts.push(advert);
                None
            }
        }
    }

    pub fn unregister(&mut self, id: &str) -> Option<Advert> {
        let index = self.adverts.iter().position(|a| a.id == id)?;
        self.to_load.retain(|i| i != id);
        self.to_refresh.retain(|i| i != id);
        Some(self.adverts.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&Advert> {
        self.adverts.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Advert> {
        self.adverts.iter_mut().find(|a| a.id == id)
    }

    /// Advert anchored at this node
    pub fn find_by_node(&self, node: NodeId) -> Option<&Advert> {
        self.adverts.iter().find(|a| a.node == node)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Advert> {
        self.adverts.iter()
    }

    pub fn len(&self) -> usize {
        self.adverts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adverts.is_empty()
    }

    pub fn mark_to_load(&mut self, id: &str) {
        if !self.to_load.iter().any(|i| i == id) {
            self.to_load.push(id.to_string());
        }
    }

    /// Remove from the to-load set, returns whether it was there
    pub fn take_to_load(&mut self, id: &str) -> bool {
        let before = self.to_load.len();
        self.to_load.retain(|i| i != id);
        before != self.to_load.len()
    }

    pub fn adverts_to_load(&self) -> &[String] {
        &self.to_load
    }

    pub fn track_refresh(&mut self, id: &str) {
        if !self.to_refresh.iter().any(|i| i == id) {
            self.to_refresh.push(id.to_string());
        }
    }

    pub fn untrack_refresh(&mut self, id: &str) {
        self.to_refresh.retain(|i| i != id);
    }

    pub fn adverts_to_refresh(&self) -> &[String] {
        &self.to_refresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Completion;
    use crate::gpt::SlotHandle;
    use crate::sizes::SizeMapping;
    use adslot_dom::Document;

    fn advert(doc: &mut Document, id: &str, slot: u64) -> Advert {
        let node = doc.create_block("div", &["js-ad-slot"], 0.0);
        Advert::new(id.into(), id.into(), node, SizeMapping::new(), SlotHandle(slot), Completion::done())
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let mut doc = Document::default();
        let mut registry = AdvertRegistry::new();
        registry.register(advert(&mut doc, "dfp-ad--inline1", 1)).unwrap();

        let err = registry.register(advert(&mut doc, "dfp-ad--inline1", 2)).unwrap_err();
        assert!(matches!(err, AdError::DuplicateAdvert { .. }));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("dfp-ad--inline1").unwrap().slot, SlotHandle(1));
    }

    #[test]
    fn test_explicit_replace() {
        let mut doc = Document::default();
        let mut registry = AdvertRegistry::new();
        registry.register(advert(&mut doc, "dfp-ad--right", 1)).unwrap();

        let old = registry.replace(advert(&mut doc, "dfp-ad--right", 2)).unwrap();
        assert_eq!(old.slot, SlotHandle(1));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("dfp-ad--right").unwrap().slot, SlotHandle(2));
    }

    #[test]
    fn test_unregister_clears_derived_sets() {
        let mut doc = Document::default();
        let mut registry = AdvertRegistry::new();
        registry.register(advert(&mut doc, "dfp-ad--inline1", 1)).unwrap();
        registry.mark_to_load("dfp-ad--inline1");
        registry.track_refresh("dfp-ad--inline1");

        assert!(registry.unregister("dfp-ad--inline1").is_some());
        assert!(registry.adverts_to_load().is_empty());
        assert!(registry.adverts_to_refresh().is_empty());
        assert!(registry.unregister("dfp-ad--inline1").is_none());
    }

    #[test]
    fn test_to_load_set() {
        let mut registry = AdvertRegistry::new();
        registry.mark_to_load("a");
        registry.mark_to_load("a");
        assert_eq!(registry.adverts_to_load().len(), 1);
        assert!(registry.take_to_load("a"));
        assert!(!registry.take_to_load("a"));
    }
}
