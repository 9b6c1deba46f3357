//! Article body inline ads
//!
//! Inline slots go before paragraphs of the article body. Desktop places
//! `inline1` with tight rules first, then the remaining inlines in the
//! right column with relaxed ones; mobile places all of them in one pass.
//! The thresholds are tuned per layout and kept as they are.

use std::rc::Rc;

use adslot_dom::{Document, NodeId};

use crate::context::AdContext;
use crate::lifecycle::add_slot;
use crate::sizes::AdSize;
use crate::slot::{create_ad_slot, wrap_slot_in_container, CreateSlotOptions, SlotKind};
use crate::spacefinder::{fill_space, filter_nearby_candidates, OpponentRule, SpacefinderItem, SpacefinderRules};
use crate::Result;

pub const ARTICLE_BODY_SELECTOR: &str = ".article-body-commercial-selector";

/// Opponent rule for ad slots already in the body
const AD_SLOT_SPACING: OpponentRule = OpponentRule { min_above: 500.0, min_below: 500.0, radius: None };

pub fn desktop_inline1_rules() -> SpacefinderRules {
    SpacefinderRules::new(ARTICLE_BODY_SELECTOR, "> p")
        .min_above(300.0)
        .min_below(700.0)
        .opponent("> h2", OpponentRule::new(5.0, 190.0))
        .opponent(".ad-slot", AD_SLOT_SPACING)
        .opponent("> :not(p):not(h2):not(.ad-slot-container)", OpponentRule::new(35.0, 400.0))
        .filter(filter_nearby_candidates(f64::from(AdSize::MPU.height), AD_SLOT_SPACING.min_below))
}

pub fn desktop_subsequent_rules(is_paid_content: bool) -> SpacefinderRules {
    SpacefinderRules::new(ARTICLE_BODY_SELECTOR, "> p")
        .min_above(if is_paid_content { 1600.0 } else { 1000.0 })
        .min_below(800.0)
        .opponent(".ad-slot", AD_SLOT_SPACING)
        .opponent("> [data-spacefinder-role=numbered-title]", OpponentRule::new(0.0, 200.0))
        .filter(filter_nearby_candidates(f64::from(AdSize::HALF_PAGE.height), AD_SLOT_SPACING.min_below))
}

pub fn mobile_rules() -> SpacefinderRules {
    SpacefinderRules::new(ARTICLE_BODY_SELECTOR, "> p")
        .min_above(200.0)
        .min_below(200.0)
        .opponent("> h2", OpponentRule::new(100.0, 250.0))
        .opponent(".ad-slot", AD_SLOT_SPACING)
        .opponent("> :not(p):not(h2):not(.ad-slot-container)", OpponentRule::new(35.0, 200.0))
        .filter(filter_nearby_candidates(f64::from(AdSize::MPU.height), AD_SLOT_SPACING.min_below))
}

/// Place the article's inline ads, returns the new advert ids
pub async fn init_article_inline_ads(ctx: &Rc<AdContext>) -> Result<Vec<String>> {
    let limits = &ctx.config().article;
    let mut ids = Vec::new();

    if ctx.breakpoint().is_desktop_or_wider() {
        ids.extend(insert_inline_ads(ctx, desktop_inline1_rules(), 1, 1, &[]).await?);
        let rest = limits.max_inline_ads_desktop.saturating_sub(ids.len());
        let rules = desktop_subsequent_rules(ctx.config().page.is_paid_content);
        ids.extend(insert_inline_ads(ctx, rules, rest, ids.len() + 1, &["offset-right"]).await?);
    } else {
        ids.extend(insert_inline_ads(ctx, mobile_rules(), limits.max_inline_ads_mobile, 1, &[]).await?);
    }

    tracing::info!(inline_ads = ids.len(), "article inline ads placed");
    Ok(ids)
}

/// Put an inline slot before each winner still in the page. Names start at
/// `inline{first_index}` and count placed slots only.
fn place_inline_slots(
    doc: &mut Document,
    winners: &[SpacefinderItem],
    first_index: usize,
    classes: &[&'static str],
) -> Result<Vec<NodeId>> {
    let mut slots = Vec::with_capacity(winners.len());
    for winner in winners {
        let Some(parent) = doc.tree().parent(winner.element) else {
            tracing::debug!(element = %winner.element, "winner left the page before the write");
            continue;
        };
        let mut options = CreateSlotOptions::named(format!("inline{}", first_index + slots.len()));
        for class in classes {
            options = options.with_class(*class);
        }
        let slot = create_ad_slot(doc, SlotKind::Inline, &options)?;
        let container = wrap_slot_in_container(doc, slot, &[])?;
        doc.insert_before(parent, container, Some(winner.element))?;
        slots.push(slot);
    }
    Ok(slots)
}

async fn insert_inline_ads(
    ctx: &Rc<AdContext>,
    rules: SpacefinderRules,
    max: usize,
    first_index: usize,
    classes: &[&'static str],
) -> Result<Vec<String>> {
    if max == 0 {
        return Ok(Vec::new());
    }
    let classes = classes.to_vec();
    let slots = fill_space(ctx, rules, Some(max), move |doc, winners| {
        place_inline_slots(doc, winners, first_index, &classes)
    })
    .await?;

    let mut ids = Vec::with_capacity(slots.len());
    for slot in slots {
        match add_slot(ctx, slot, false) {
            Ok(id) => ids.push(id),
            Err(err) => tracing::warn!(%slot, %err, "inline slot not added"),
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spacefinder::ItemMeta;
    use adslot_dom::Viewport;

    fn winner(element: NodeId) -> SpacefinderItem {
        SpacefinderItem { element, top: 0.0, bottom: 200.0, meta: ItemMeta::default() }
    }

    #[test]
    fn test_detached_winner_leaves_no_gap_in_names() {
        let mut doc = Document::new(Viewport::new(1300.0, 800.0));
        let body = doc.body();
        let first = doc.create_block("p", &[], 200.0);
        let gone = doc.create_block("p", &[], 200.0);
        let last = doc.create_block("p", &[], 200.0);
        doc.append_child(body, first).unwrap();
        doc.append_child(body, last).unwrap();

        let winners = [winner(first), winner(gone), winner(last)];
        let slots = place_inline_slots(&mut doc, &winners, 2, &["offset-right"]).unwrap();

        let ids: Vec<_> = slots.iter().map(|&s| doc.tree().get_attribute(s, "id").unwrap().to_string()).collect();
        assert_eq!(ids, ["dfp-ad--inline2", "dfp-ad--inline3"]);
        assert!(doc.tree().has_class(slots[1], "ad-slot--offset-right"));
        assert_eq!(doc.tree().parent(doc.tree().parent(slots[1]).unwrap()), Some(body));
    }
}
