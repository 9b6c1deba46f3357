//! Slot definition
//!
//! Turns an ad slot element into an ad server slot: size mapping, page
//! targeting and, when the signal vendor is switched on and consented,
//! supplementary targeting raced against a timeout. The slot is usable as
//! soon as it is defined; `slot_ready` tells the loader when enrichment is
//! in or has been given up on.

use std::rc::Rc;

use adslot_dom::{DomError, NodeId};

use crate::advert::Advert;
use crate::completion::{completion, Completion};
use crate::consent::{get_consent_for, Vendor};
use crate::context::AdContext;
use crate::gpt::{build_size_mapping, SlotHandle, Targeting};
use crate::sizes::{slot_size_mapping, SizeMapping};
use crate::{AdError, Result};

/// A defined ad server slot
#[derive(Debug, Clone)]
pub struct DefinedSlot {
    pub slot: SlotHandle,
    pub slot_ready: Completion,
}

/// Define `node` as an ad server slot.
///
/// Fails straight away when `sizes` is empty; a slot is never defined
/// without knowing what it may show.
pub fn define_slot(ctx: &Rc<AdContext>, node: NodeId, sizes: &SizeMapping, targeting: &Targeting) -> Result<DefinedSlot> {
    let (id, name, out_of_page) = {
        let doc = ctx.document().borrow();
        let el = doc.tree().element(node).ok_or(DomError::NotAnElement(node))?;
        let id = el.id.clone().ok_or(AdError::MissingSlotId)?;
        let name = el.dataset("name").unwrap_or(id.as_str()).to_string();
        (id, name, el.has_attr("data-out-of-page"))
    };

    if sizes.is_empty() {
        return Err(AdError::MissingSizeMapping { name });
    }

    let server = ctx.ad_server();
    let mapping = build_size_mapping(sizes);
    let sizes_for_define = if out_of_page { Vec::new() } else { mapping.sizes };
    let slot = server.define_slot(&ctx.config().ad_unit, &sizes_for_define, &id, out_of_page)?;
    server.define_size_mapping(slot, &mapping.mapping);
    server.set_targeting(slot, "slot", &[name.clone()]);
    for (key, values) in targeting {
        server.set_targeting(slot, key, values);
    }

    let slot_ready = match ctx.signals() {
        Some(client) if ctx.config().switches.third_party_signals => {
            let (trigger, ready) = completion();
            let task_ctx = ctx.clone();
            let slot_id = id.clone();
            let timeout = client.timeout();
            // Waiting for consent counts against the signal timeout
            ctx.spawn(async move {
                smol::future::or(enrich_targeting(&task_ctx, slot, &slot_id), async {
                    smol::Timer::after(timeout).await;
                    tracing::warn!(%slot_id, ?timeout, "slot ready without third-party signals");
                })
                .await;
                trigger.complete();
            })
            .detach();
            ready
        }
        _ => Completion::done(),
    };

    tracing::info!(%id, %name, %slot, out_of_page, "defined slot");
    Ok(DefinedSlot { slot, slot_ready })
}

async fn enrich_targeting(ctx: &Rc<AdContext>, slot: SlotHandle, slot_id: &str) {
    let consent = ctx.consent().on_consent().await;
    if !get_consent_for(Vendor::Ias, &consent) {
        tracing::debug!(slot_id, "no consent for third-party signals");
        return;
    }
    let Some(client) = ctx.signals() else {
        return;
    };
    // A timed out request resolves to None; the slot proceeds without
    if let Some(targeting) = client.request(slot_id, &ctx.config().ad_unit).await {
        for (key, values) in &targeting {
            ctx.ad_server().set_targeting(slot, key, values);
        }
        tracing::debug!(slot_id, keys = targeting.len(), "applied third-party signals");
    }
}

/// Size mapping for an ad slot element: the defaults for its `data-name`
/// plus any `data-{breakpoint}` sizes on the node and `additional` sizes
pub fn advert_sizes(ctx: &AdContext, node: NodeId, additional: Option<&SizeMapping>) -> Result<SizeMapping> {
    let doc = ctx.document().borrow();
    let el = doc.tree().element(node).ok_or(DomError::NotAnElement(node))?;
    let name = el.dataset("name").unwrap_or_default();

    let mut sizes = slot_size_mapping(name).unwrap_or_default();
    sizes.merge(&SizeMapping::from_attributes(|attr| el.get_attr(attr))?);
    if let Some(additional) = additional {
        sizes.merge(additional);
    }
    Ok(sizes)
}

/// Build and define the advert for an ad slot element. Not registered.
pub fn create_advert(ctx: &Rc<AdContext>, node: NodeId, additional: Option<&SizeMapping>) -> Result<Advert> {
    let sizes = advert_sizes(ctx, node, additional)?;
    let (id, name) = {
        let doc = ctx.document().borrow();
        let el = doc.tree().element(node).ok_or(DomError::NotAnElement(node))?;
        let id = el.id.clone().ok_or(AdError::MissingSlotId)?;
        let name = el.dataset("name").unwrap_or(id.as_str()).to_string();
        (id, name)
    };

    let defined = define_slot(ctx, node, &sizes, &Targeting::new())?;
    let mut advert = Advert::new(id, name, node, sizes, defined.slot, defined.slot_ready);
    advert.last_breakpoint = advert.sizes.matching_breakpoint(ctx.document().borrow().viewport().width);
    Ok(advert)
}
