//! Fixed slots
//!
//! Slots with a fixed home: the mobile sticky banner at the bottom of the
//! body and the high merchandising slot before the content footer. A
//! missing anchor is not an error; the slot is simply not placed.

use std::rc::Rc;

use adslot_dom::NodeId;

use crate::context::AdContext;
use crate::lifecycle::add_slot;
use crate::sizes::Breakpoint;
use crate::slot::{create_ad_slot, wrap_slot_in_container, CreateSlotOptions, SlotKind};
use crate::Result;

pub const HIGH_MERCH_ANCHOR_SELECTOR: &str = ".content-footer > *";

/// Mobile sticky banner, phones only
pub async fn init_mobile_sticky(ctx: &Rc<AdContext>) -> Result<Option<String>> {
    if !ctx.config().switches.mobile_sticky || ctx.breakpoint() >= Breakpoint::Tablet {
        return Ok(None);
    }

    let document = ctx.document().clone();
    let slot = ctx
        .frame()
        .mutate(move || -> Result<NodeId> {
            let mut doc = document.borrow_mut();
            let slot = create_ad_slot(&mut doc, SlotKind::MobileSticky, &CreateSlotOptions::default())?;
            let container = wrap_slot_in_container(&mut doc, slot, &["ad-slot-container--mobile-sticky"])?;
            let body = doc.body();
            doc.append_child(body, container)?;
            Ok(slot)
        })
        .await??;

    // Always in view, no point waiting for an intersection
    add_slot(ctx, slot, true).map(Some)
}

/// High merchandising slot before the first content footer element
pub async fn init_high_merch(ctx: &Rc<AdContext>) -> Result<Option<String>> {
    if ctx.config().page.is_paid_content {
        return Ok(None);
    }

    let document = ctx.document().clone();
    let slot = ctx
        .frame()
        .mutate(move || -> Result<Option<NodeId>> {
            let mut doc = document.borrow_mut();
            let Some(anchor) = doc.query_selector(HIGH_MERCH_ANCHOR_SELECTOR)? else {
                return Ok(None);
            };
            let Some(parent) = doc.tree().parent(anchor) else {
                return Ok(None);
            };
            let slot = create_ad_slot(&mut doc, SlotKind::MerchandisingHigh, &CreateSlotOptions::default())?;
            let container = wrap_slot_in_container(&mut doc, slot, &["fc-container--commercial"])?;
            doc.insert_before(parent, container, Some(anchor))?;
            Ok(Some(slot))
        })
        .await??;

    match slot {
        Some(slot) => add_slot(ctx, slot, false).map(Some),
        None => {
            tracing::warn!(anchor = HIGH_MERCH_ANCHOR_SELECTOR, "high merch anchor missing, slot skipped");
            Ok(None)
        }
    }
}
