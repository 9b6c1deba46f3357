//! Header bidding
//!
//! Runs the bid partners for a batch of adverts. Adverts that already have
//! a bid request for the current cycle are left out of the batch, and the
//! claim on every remaining advert is written before the first await so two
//! overlapping batches never auction the same slot twice. Partners run
//! concurrently, each against its own timeout; one failing or slow partner
//! never blocks the others.

use std::rc::Rc;
use std::time::Duration;

use smol::future::BoxedLocal;

use crate::completion::{completion, CompletionTrigger};
use crate::config::Switches;
use crate::consent::{get_consent_for, Vendor};
use crate::context::AdContext;
use crate::registry::AdvertRegistry;
use crate::sizes::AdSize;
use crate::{AdError, Result};

/// What a partner needs to know about a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidSlot {
    pub id: String,
    pub name: String,
    pub sizes: Vec<AdSize>,
}

/// Sizes a partner may bid on
pub type SizeFilter = Rc<dyn Fn(&AdSize) -> bool>;

/// Header bidding partner (Prebid-like, A9-like)
pub trait BidPartner {
    fn name(&self) -> &str;

    fn vendor(&self) -> Vendor;

    /// Sizes this partner bids on; ad server proxy sizes by default
    fn size_filter(&self) -> SizeFilter {
        Rc::new(|size: &AdSize| !size.is_proxy())
    }

    /// Run an auction for `slots`, resolving once bids are in
    fn request_bids(&self, slots: Vec<BidSlot>, size_filter: SizeFilter) -> BoxedLocal<Result<()>>;
}

/// How one partner's auction ended
#[derive(Debug)]
pub enum BidOutcome {
    Completed,
    Failed(AdError),
    TimedOut,
}

#[derive(Debug)]
pub struct BidReport {
    pub partner: String,
    pub outcome: BidOutcome,
}

/// Claim the adverts in `ids` that have no bid request yet. Every claimed
/// advert gets the returned batch's completion.
pub fn claim_batch(registry: &mut AdvertRegistry, ids: &[String]) -> Option<(Vec<BidSlot>, CompletionTrigger)> {
    let (trigger, request) = completion();
    let mut slots = Vec::new();

    for id in ids {
        let Some(advert) = registry.get_mut(id) else {
            continue;
        };
        if advert.header_bidding_bid_request.is_some() {
            tracing::debug!(id = %advert.id, "bid request already made this cycle");
            continue;
        }
        advert.header_bidding_bid_request = Some(request.clone());
        slots.push(advert.bid_slot());
    }

    if slots.is_empty() { None } else { Some((slots, trigger)) }
}

fn switched_on(vendor: Vendor, switches: &Switches) -> bool {
    match vendor {
        Vendor::Prebid => switches.prebid,
        Vendor::A9 => switches.a9,
        _ => true,
    }
}

/// Request bids for a batch of adverts, returns one report per partner that
/// ran. Resolves once every partner finished, failed or timed out.
pub async fn request_bids(ctx: &Rc<AdContext>, ids: &[String]) -> Vec<BidReport> {
    let claimed = claim_batch(&mut ctx.registry().borrow_mut(), ids);
    let Some((slots, trigger)) = claimed else {
        return Vec::new();
    };

    let consent = ctx.consent().on_consent().await;
    let switches = &ctx.config().switches;
    let timeout = ctx.config().timeouts.bid_partner();

    let tasks: Vec<_> = ctx
        .bid_partners()
        .iter()
        .filter(|p| switched_on(p.vendor(), switches) && get_consent_for(p.vendor(), &consent))
        .map(|partner| {
            let name = partner.name().to_string();
            let auction = partner.request_bids(slots.clone(), partner.size_filter());
            ctx.spawn(run_partner(name, auction, timeout))
        })
        .collect();

    tracing::debug!(slots = slots.len(), partners = tasks.len(), "requesting bids");

    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        reports.push(task.await);
    }
    trigger.complete();
    reports
}

async fn run_partner(partner: String, auction: BoxedLocal<Result<()>>, timeout: Duration) -> BidReport {
    let finished = smol::future::or(async { Some(auction.await) }, async {
        smol::Timer::after(timeout).await;
        None
    })
    .await;

    let outcome = match finished {
        Some(Ok(())) => BidOutcome::Completed,
        Some(Err(err)) => {
            tracing::warn!(%partner, %err, "bid partner failed");
            BidOutcome::Failed(err)
        }
        None => {
            tracing::warn!(%partner, ?timeout, "bid partner timed out");
            BidOutcome::TimedOut
        }
    };
    BidReport { partner, outcome }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advert::Advert;
    use crate::completion::Completion;
    use crate::gpt::SlotHandle;
    use crate::sizes::{slot_size_mapping, SizeMapping};
    use adslot_dom::Document;

    fn registry_with(doc: &mut Document, ids: &[&str]) -> AdvertRegistry {
        let mut registry = AdvertRegistry::new();
        for (n, id) in ids.iter().enumerate() {
            let node = doc.create_block("div", &[], 0.0);
            let sizes = slot_size_mapping("inline").unwrap_or_else(SizeMapping::new);
            let advert = Advert::new(id.to_string(), id.to_string(), node, sizes, SlotHandle(n as u64), Completion::done());
            registry.register(advert).unwrap();
        }
        registry
    }

    #[test]
    fn test_claim_skips_existing_requests() {
        let mut doc = Document::default();
        let mut registry = registry_with(&mut doc, &["adA", "adB"]);
        let (_in_flight, pending) = completion();
        registry.get_mut("adB").unwrap().header_bidding_bid_request = Some(pending);

        let (slots, _trigger) = claim_batch(&mut registry, &["adA".into(), "adB".into()]).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].id, "adA");
        assert!(registry.get("adA").unwrap().header_bidding_bid_request.is_some());
    }

    #[test]
    fn test_claim_nothing_new() {
        let mut doc = Document::default();
        let mut registry = registry_with(&mut doc, &["adA"]);
        assert!(claim_batch(&mut registry, &["adA".into()]).is_some());
        assert!(claim_batch(&mut registry, &["adA".into()]).is_none());
        assert!(claim_batch(&mut registry, &["missing".into()]).is_none());
    }

    #[test]
    fn test_claim_completes_with_trigger() {
        let mut doc = Document::default();
        let mut registry = registry_with(&mut doc, &["adA", "adB"]);
        let (_, trigger) = claim_batch(&mut registry, &["adA".into(), "adB".into()]).unwrap();

        let a = registry.get("adA").unwrap().header_bidding_bid_request.clone().unwrap();
        let b = registry.get("adB").unwrap().header_bidding_bid_request.clone().unwrap();
        assert!(!a.is_complete());
        trigger.complete();
        assert!(a.is_complete() && b.is_complete());
    }

    #[test]
    fn test_default_size_filter_drops_proxies() {
        struct Partner;
        impl BidPartner for Partner {
            fn name(&self) -> &str {
                "partner"
            }
            fn vendor(&self) -> Vendor {
                Vendor::Prebid
            }
            fn request_bids(&self, _: Vec<BidSlot>, _: SizeFilter) -> BoxedLocal<Result<()>> {
                Box::pin(async { Ok(()) })
            }
        }

        let filter = Partner.size_filter();
        assert!(filter(&AdSize::MPU));
        assert!(!filter(&AdSize::FLUID));
        assert!(!filter(&AdSize::OUT_OF_PAGE));
    }

    #[test]
    fn test_partner_timeout() {
        let auction: BoxedLocal<Result<()>> = Box::pin(smol::future::pending());
        let report = smol::block_on(run_partner("slow".into(), auction, Duration::from_millis(20)));
        assert!(matches!(report.outcome, BidOutcome::TimedOut));
    }
}
