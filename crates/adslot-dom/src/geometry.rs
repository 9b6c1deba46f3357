//! Rectangles
//!
//! Border boxes in document coordinates: y grows downwards from the top of
//! the document, not the viewport.

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DOMRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DOMRect {
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Overlap test with inclusive edges, so a zero-height slot sitting on
    /// or inside `other` counts, as it does for IntersectionObserver
    pub fn intersects(&self, other: &DOMRect) -> bool {
        self.left() <= other.right()
            && other.left() <= self.right()
            && self.top() <= other.bottom()
            && other.top() <= self.bottom()
    }

    pub fn intersection(&self, other: &DOMRect) -> Option<DOMRect> {
        if !self.intersects(other) {
            return None;
        }
        let (left, top) = (self.left().max(other.left()), self.top().max(other.top()));
        let (right, bottom) = (self.right().min(other.right()), self.bottom().min(other.bottom()));
        Some(DOMRect::from_xywh(left, top, right - left, bottom - top))
    }

    /// Grow outwards by per-side amounts; negative amounts shrink, never
    /// below zero size
    pub fn expand(&self, top: f64, right: f64, bottom: f64, left: f64) -> DOMRect {
        DOMRect::from_xywh(
            self.x - left,
            self.y - top,
            (self.width + left + right).max(0.0),
            (self.height + top + bottom).max(0.0),
        )
    }
}
