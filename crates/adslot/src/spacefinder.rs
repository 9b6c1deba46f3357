//! Spacefinder - Layout scanner
//!
//! Finds places in a content body where an ad fits without crowding the
//! content around it. One pass measures every candidate and opponent
//! element up front (reads only), then yields winners lazily in scan order:
//!
//! 1. a candidate must sit at least `min_above` below the body top and at
//!    least `min_below` above the body bottom;
//! 2. against every opponent element within its rule's radius, the
//!    candidate must be clear above (`min_above` from the opponent's
//!    bottom) or clear below (`min_below` to the opponent's top);
//! 3. the caller's filter sees the candidate and the previous winner (or
//!    the `start_at` element before the first winner) and has the last
//!    word.
//!
//! A candidate only wins if all three hold. Mutating the page with the
//! winners is the caller's business, always in a later frame write.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use adslot_dom::{DOMRect, Document, NodeId};

use crate::context::AdContext;
use crate::Result;

/// Spacing around elements of one opponent selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpponentRule {
    /// Required gap between the opponent's bottom and the candidate
    pub min_above: f64,
    /// Required gap between the candidate and the opponent's top
    pub min_below: f64,
    /// Opponents further away than this never block a candidate
    pub radius: Option<f64>,
}

impl OpponentRule {
    pub fn new(min_above: f64, min_below: f64) -> Self {
        Self { min_above, min_below, radius: None }
    }

    pub fn within(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }
}

/// Decides between a candidate and the previous winner
pub type WinnerFilter = Rc<dyn Fn(&SpacefinderItem, Option<&SpacefinderItem>) -> bool>;

/// Rules for one scan
#[derive(Clone)]
pub struct SpacefinderRules {
    pub body_selector: String,
    /// Relative to the body; a leading `>` means direct children
    pub candidate_selector: String,
    pub min_above: f64,
    pub min_below: f64,
    /// Opponent selectors, relative to the body
    pub opponents: Vec<(String, OpponentRule)>,
    /// Scan bottom to top
    pub from_bottom: bool,
    /// Only consider candidates after this element in scan order
    pub start_at: Option<NodeId>,
    pub filter: Option<WinnerFilter>,
}

impl fmt::Debug for SpacefinderRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpacefinderRules")
            .field("body_selector", &self.body_selector)
            .field("candidate_selector", &self.candidate_selector)
            .field("min_above", &self.min_above)
            .field("min_below", &self.min_below)
            .field("opponents", &self.opponents)
            .field("from_bottom", &self.from_bottom)
            .field("start_at", &self.start_at)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl SpacefinderRules {
    pub fn new(body_selector: &str, candidate_selector: &str) -> Self {
        Self {
            body_selector: body_selector.to_string(),
            candidate_selector: candidate_selector.to_string(),
            min_above: 0.0,
            min_below: 0.0,
            opponents: Vec::new(),
            from_bottom: false,
            start_at: None,
            filter: None,
        }
    }

    pub fn min_above(mut self, px: f64) -> Self {
        self.min_above = px;
        self
    }

    pub fn min_below(mut self, px: f64) -> Self {
        self.min_below = px;
        self
    }

    pub fn opponent(mut self, selector: &str, rule: OpponentRule) -> Self {
        self.opponents.push((selector.to_string(), rule));
        self
    }

    pub fn from_bottom(mut self, from_bottom: bool) -> Self {
        self.from_bottom = from_bottom;
        self
    }

    pub fn start_at(mut self, start_at: Option<NodeId>) -> Self {
        self.start_at = start_at;
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&SpacefinderItem, Option<&SpacefinderItem>) -> bool + 'static,
    {
        self.filter = Some(Rc::new(filter));
        self
    }
}

/// Keep winners at least `ad_height + margin` apart, measured top to top
pub fn filter_nearby_candidates(ad_height: f64, margin: f64) -> impl Fn(&SpacefinderItem, Option<&SpacefinderItem>) -> bool {
    move |candidate, last| match last {
        None => true,
        Some(last) => (candidate.top - last.top).abs() - ad_height >= margin,
    }
}

/// A measured element
#[derive(Debug, Clone, PartialEq)]
pub struct SpacefinderItem {
    pub element: NodeId,
    pub top: f64,
    pub bottom: f64,
    pub meta: ItemMeta,
}

/// Which opponent rules had an element within range of a candidate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemMeta {
    pub considered: Vec<String>,
}

impl SpacefinderItem {
    fn from_rect(element: NodeId, rect: DOMRect) -> Self {
        Self { element, top: rect.top(), bottom: rect.bottom(), meta: ItemMeta::default() }
    }
}

/// Why a candidate did not win
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// Closer than `min_above` to the body top
    AboveBody,
    /// Closer than `min_below` to the body bottom
    BelowBody,
    /// Too close to an element matching this opponent selector
    Opponent(String),
    /// Rejected by the winner filter
    Filter,
}

/// Everything one scan needs, measured in a single read pass
#[derive(Debug, Clone, Default)]
pub struct Measurements {
    pub body: Option<DOMRect>,
    /// In scan order, already trimmed to after `start_at`
    pub candidates: Vec<SpacefinderItem>,
    /// `(rule index, element)`
    pub opponents: Vec<(usize, SpacefinderItem)>,
    pub start: Option<SpacefinderItem>,
}

/// Measure candidates and opponents. A missing body measures as empty.
pub fn measure(document: &mut Document, rules: &SpacefinderRules) -> Result<Measurements> {
    let Some(body) = document.query_selector(&rules.body_selector)? else {
        tracing::debug!(body = %rules.body_selector, "spacefinder body not found");
        return Ok(Measurements::default());
    };
    document.ensure_layout();
    let body_rect = document.bounding_rect(body)?;

    let mut candidates = Vec::new();
    for element in document.query_within(body, &rules.candidate_selector)? {
        candidates.push(SpacefinderItem::from_rect(element, document.bounding_rect(element)?));
    }
    if rules.from_bottom {
        candidates.reverse();
    }

    let start = match rules.start_at {
        Some(start) if document.is_connected(start) => {
            let tree = document.tree();
            let wanted = if rules.from_bottom { Ordering::Greater } else { Ordering::Less };
            candidates.retain(|c| {
                c.element != start
                    && !tree.contains(c.element, start)
                    && tree.compare_document_position(start, c.element) == Some(wanted)
            });
            Some(SpacefinderItem::from_rect(start, document.bounding_rect(start)?))
        }
        _ => None,
    };

    let mut opponents = Vec::new();
    for (index, (selector, _)) in rules.opponents.iter().enumerate() {
        for element in document.query_within(body, selector)? {
            opponents.push((index, SpacefinderItem::from_rect(element, document.bounding_rect(element)?)));
        }
    }

    for candidate in &mut candidates {
        for (index, (selector, rule)) in rules.opponents.iter().enumerate() {
            let in_range = opponents
                .iter()
                .any(|(i, o)| *i == index && o.element != candidate.element && within_radius(rule, candidate, o));
            if in_range {
                candidate.meta.considered.push(selector.clone());
            }
        }
    }

    Ok(Measurements { body: Some(body_rect), candidates, opponents, start })
}

fn within_radius(rule: &OpponentRule, candidate: &SpacefinderItem, opponent: &SpacefinderItem) -> bool {
    let Some(radius) = rule.radius else {
        return true;
    };
    let distance = if opponent.bottom <= candidate.top {
        candidate.top - opponent.bottom
    } else if opponent.top >= candidate.top {
        opponent.top - candidate.top
    } else {
        0.0
    };
    distance <= radius
}

impl Measurements {
    /// Lazily evaluate winners in scan order
    pub fn winners<'a>(&'a self, rules: &'a SpacefinderRules) -> Winners<'a> {
        Winners { measurements: self, rules, next: 0, prev: None, exclusions: Vec::new() }
    }
}

/// Lazy winner sequence
pub struct Winners<'a> {
    measurements: &'a Measurements,
    rules: &'a SpacefinderRules,
    next: usize,
    prev: Option<&'a SpacefinderItem>,
    exclusions: Vec<(NodeId, Exclusion)>,
}

impl<'a> Winners<'a> {
    /// Candidates rejected so far and why
    pub fn exclusions(&self) -> &[(NodeId, Exclusion)] {
        &self.exclusions
    }

    fn check(&self, candidate: &SpacefinderItem) -> std::result::Result<(), Exclusion> {
        let Some(body) = self.measurements.body else {
            return Err(Exclusion::AboveBody);
        };
        if candidate.top - body.top() < self.rules.min_above {
            return Err(Exclusion::AboveBody);
        }
        if body.bottom() - candidate.top < self.rules.min_below {
            return Err(Exclusion::BelowBody);
        }

        for (index, opponent) in &self.measurements.opponents {
            if opponent.element == candidate.element {
                continue;
            }
            let (selector, rule) = &self.rules.opponents[*index];
            if !within_radius(rule, candidate, opponent) {
                continue;
            }
            let clear_above = candidate.top - opponent.bottom >= rule.min_above;
            let clear_below = opponent.top - candidate.top >= rule.min_below;
            if !(clear_above || clear_below) {
                return Err(Exclusion::Opponent(selector.clone()));
            }
        }

        if let Some(filter) = &self.rules.filter {
            let prev = self.prev.or(self.measurements.start.as_ref());
            if !filter(candidate, prev) {
                return Err(Exclusion::Filter);
            }
        }
        Ok(())
    }
}

impl Iterator for Winners<'_> {
    type Item = SpacefinderItem;

    fn next(&mut self) -> Option<SpacefinderItem> {
        let measurements = self.measurements;
        while let Some(candidate) = measurements.candidates.get(self.next) {
            self.next += 1;
            match self.check(candidate) {
                Ok(()) => {
                    self.prev = Some(candidate);
                    return Some(candidate.clone());
                }
                Err(exclusion) => self.exclusions.push((candidate.element, exclusion)),
            }
        }
        None
    }
}

/// Result of a full scan
#[derive(Debug, Clone, Default)]
pub struct SpacefinderResult {
    pub winners: Vec<SpacefinderItem>,
    pub exclusions: Vec<(NodeId, Exclusion)>,
}

/// Measure and collect up to `max` winners
pub fn find_space(document: &mut Document, rules: &SpacefinderRules, max: Option<usize>) -> Result<SpacefinderResult> {
    let measurements = measure(document, rules)?;
    let mut winners = measurements.winners(rules);
    let found: Vec<_> = winners.by_ref().take(max.unwrap_or(usize::MAX)).collect();

    tracing::debug!(
        body = %rules.body_selector,
        candidates = measurements.candidates.len(),
        winners = found.len(),
        excluded = winners.exclusions().len(),
        "spacefinder pass"
    );
    Ok(SpacefinderResult { exclusions: winners.exclusions().to_vec(), winners: found })
}

/// Run a scan as a frame read
pub async fn find_space_in_frame(ctx: &AdContext, rules: SpacefinderRules, max: Option<usize>) -> Result<SpacefinderResult> {
    let document = ctx.document().clone();
    ctx.frame()
        .measure(move || find_space(&mut document.borrow_mut(), &rules, max))
        .await?
}

/// Scan in a frame read, then hand the winners to `writer` in a later frame
/// write. Returns whatever the writer returns.
pub async fn fill_space<T, W>(ctx: &AdContext, rules: SpacefinderRules, max: Option<usize>, writer: W) -> Result<T>
where
    T: 'static,
    W: FnOnce(&mut Document, &[SpacefinderItem]) -> Result<T> + 'static,
{
    let result = find_space_in_frame(ctx, rules, max).await?;
    let document = ctx.document().clone();
    ctx.frame()
        .mutate(move || writer(&mut document.borrow_mut(), &result.winners))
        .await
        .and_then(|written| written)
}
