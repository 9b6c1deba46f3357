//! Intersection Observer
//!
//! Observe element intersection with the (margin-expanded) viewport.
//! Entries are produced when the host asks for a check, which it does
//! after scrolling, resizing or mutating the page.

use crate::{DOMRect, Document, DomError, DomResult, NodeId};

/// One root margin component
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f64),
    /// Percentage of the root's size along that axis
    Percent(f64),
}

impl Length {
    fn parse(s: &str) -> Option<Self> {
        if let Some(n) = s.strip_suffix("px") {
            n.parse().ok().map(Length::Px)
        } else if let Some(n) = s.strip_suffix('%') {
            n.parse().ok().map(Length::Percent)
        } else if s == "0" {
            Some(Length::Px(0.0))
        } else {
            None
        }
    }

    fn resolve(self, basis: f64) -> f64 {
        match self {
            Length::Px(px) => px,
            Length::Percent(p) => basis * p / 100.0,
        }
    }
}

/// CSS-margin style root margin (`"20% 0px"`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl RootMargin {
    /// Parse the 1 to 4 value shorthand
    pub fn parse(s: &str) -> DomResult<Self> {
        let parts: Option<Vec<Length>> = s.split_whitespace().map(Length::parse).collect();
        let parts = parts.ok_or_else(|| DomError::InvalidRootMargin(s.to_string()))?;
        let [top, right, bottom, left] = match parts.as_slice() {
            [all] => [*all; 4],
            [v, h] => [*v, *h, *v, *h],
            [t, h, b] => [*t, *h, *b, *h],
            [t, r, b, l] => [*t, *r, *b, *l],
            _ => return Err(DomError::InvalidRootMargin(s.to_string())),
        };
        Ok(Self { top, right, bottom, left })
    }

    /// Expand a root rect by this margin
    pub fn apply(&self, root: DOMRect) -> DOMRect {
        root.expand(
            self.top.resolve(root.height),
            self.right.resolve(root.width),
            self.bottom.resolve(root.height),
            self.left.resolve(root.width),
        )
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self {
            top: Length::Px(0.0),
            right: Length::Px(0.0),
            bottom: Length::Px(0.0),
            left: Length::Px(0.0),
        }
    }
}

/// Intersection observer entry
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionObserverEntry {
    pub target: NodeId,
    pub bounding_client_rect: DOMRect,
    pub intersection_rect: DOMRect,
    pub root_bounds: DOMRect,
    pub intersection_ratio: f64,
    pub is_intersecting: bool,
}

/// Intersection observer rooted at the viewport
#[derive(Debug)]
pub struct IntersectionObserver {
    root_margin: RootMargin,
    thresholds: Vec<f64>,
    /// Targets in observation order with their last reported state
    observed: Vec<(NodeId, Option<(bool, f64)>)>,
}

impl IntersectionObserver {
    pub fn new(root_margin: RootMargin, thresholds: Vec<f64>) -> Self {
        Self {
            root_margin,
            thresholds: if thresholds.is_empty() { vec![0.0] } else { thresholds },
            observed: Vec::new(),
        }
    }

    pub fn root_margin(&self) -> RootMargin {
        self.root_margin
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Observe an element; observing twice is a no-op
    pub fn observe(&mut self, target: NodeId) {
        if !self.is_observing(target) {
            self.observed.push((target, None));
        }
    }

    pub fn unobserve(&mut self, target: NodeId) {
        self.observed.retain(|(id, _)| *id != target);
    }

    pub fn disconnect(&mut self) {
        self.observed.clear();
    }

    pub fn is_observing(&self, target: NodeId) -> bool {
        self.observed.iter().any(|(id, _)| *id == target)
    }

    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    /// Compute entries for every observed target whose state changed since
    /// the last check. The first check always reports. Detached targets
    /// are skipped.
    pub fn check(&mut self, document: &mut Document) -> Vec<IntersectionObserverEntry> {
        document.ensure_layout();
        let root = self.root_margin.apply(document.viewport().rect());
        let mut entries = Vec::new();

        for (target, last) in &mut self.observed {
            if !document.is_connected(*target) {
                continue;
            }
            let Some(rect) = document.last_rect(*target) else {
                continue;
            };
            let intersection = rect.intersection(&root);
            let is_intersecting = intersection.is_some();
            let ratio = match intersection {
                Some(i) if rect.area() > 0.0 => i.area() / rect.area(),
                Some(_) => 1.0,
                None => 0.0,
            };

            let changed = match *last {
                None => true,
                Some((was, last_ratio)) => {
                    was != is_intersecting
                        || self
                            .thresholds
                            .iter()
                            .any(|&t| (last_ratio < t) != (ratio < t))
                }
            };
            if !changed {
                continue;
            }
            *last = Some((is_intersecting, ratio));

            entries.push(IntersectionObserverEntry {
                target: *target,
                bounding_client_rect: rect,
                intersection_rect: intersection.unwrap_or_default(),
                root_bounds: root,
                intersection_ratio: ratio,
                is_intersecting,
            });
        }

        if !entries.is_empty() {
            tracing::debug!(entries = entries.len(), "intersection entries");
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Viewport;

    #[test]
    fn test_root_margin_parse() {
        let m = RootMargin::parse("20% 0px").unwrap();
        assert_eq!(m.top, Length::Percent(20.0));
        assert_eq!(m.left, Length::Px(0.0));
        assert!(RootMargin::parse("20em").is_err());
        assert!(RootMargin::parse("1px 2px 3px 4px 5px").is_err());
    }

    #[test]
    fn test_margin_brings_slot_into_view() {
        let mut doc = Document::new(Viewport::new(400.0, 1000.0));
        let body = doc.body();
        let filler = doc.create_block("p", &[], 1100.0);
        let slot = doc.create_block("div", &["ad-slot"], 0.0);
        doc.append_child(body, filler).unwrap();
        doc.append_child(body, slot).unwrap();

        let mut plain = IntersectionObserver::new(RootMargin::default(), vec![]);
        plain.observe(slot);
        let entries = plain.check(&mut doc);
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_intersecting);

        // 20% of a 1000px viewport reaches down to 1200px
        let mut wide = IntersectionObserver::new(RootMargin::parse("20% 0px").unwrap(), vec![]);
        wide.observe(slot);
        assert!(wide.check(&mut doc)[0].is_intersecting);
    }

    #[test]
    fn test_only_changes_are_reported() {
        let mut doc = Document::new(Viewport::new(400.0, 500.0));
        let body = doc.body();
        let filler = doc.create_block("p", &[], 900.0);
        let slot = doc.create_block("div", &[], 250.0);
        let tail = doc.create_block("p", &[], 900.0);
        for id in [filler, slot, tail] {
            doc.append_child(body, id).unwrap();
        }

        let mut observer = IntersectionObserver::new(RootMargin::default(), vec![]);
        observer.observe(slot);
        assert_eq!(observer.check(&mut doc).len(), 1);
        assert!(observer.check(&mut doc).is_empty());

        doc.scroll_to(600.0);
        let entries = observer.check(&mut doc);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_intersecting);
    }
}
