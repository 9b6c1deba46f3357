//! Load and refresh
//!
//! Both paths wait for slot readiness, run header bidding for the advert
//! (at most once per cycle), then hand over to the ad server. Readiness
//! never fails: a missing third-party signal only means less targeting.

use std::rc::Rc;

use crate::context::AdContext;
use crate::header_bidding::request_bids;
use crate::lazy_load::enable_lazy_load;
use crate::{AdError, Result};

/// First display of an advert
pub async fn load_advert(ctx: &Rc<AdContext>, id: &str) -> Result<()> {
    let ready = ctx
        .registry()
        .borrow()
        .get(id)
        .map(|a| a.slot_ready.clone())
        .ok_or_else(|| AdError::UnknownAdvert { id: id.to_string() })?;
    ready.wait().await;

    bid_for(ctx, id).await;

    // The advert may have been collapsed while bids were out
    if !ctx.registry().borrow().contains(id) {
        tracing::debug!(id, "advert went away before display");
        return Ok(());
    }
    ctx.ad_server().display(id);
    tracing::info!(id, "displayed advert");
    Ok(())
}

/// Re-auction and refresh one already displayed advert
pub async fn refresh_advert(ctx: &Rc<AdContext>, id: &str) -> Result<()> {
    let ready = {
        let mut registry = ctx.registry().borrow_mut();
        let advert = registry
            .get_mut(id)
            .ok_or_else(|| AdError::UnknownAdvert { id: id.to_string() })?;
        advert.start_cycle();
        advert.slot_ready.clone()
    };
    ready.wait().await;

    bid_for(ctx, id).await;

    let Some(slot) = ctx.registry().borrow().get(id).map(|a| a.slot) else {
        return Ok(());
    };
    ctx.ad_server().refresh(&[slot]);
    tracing::info!(id, %slot, "refreshed advert");
    Ok(())
}

/// Request bids for one advert, or wait for the request already out
async fn bid_for(ctx: &Rc<AdContext>, id: &str) {
    request_bids(ctx, &[id.to_string()]).await;
    let in_flight = ctx
        .registry()
        .borrow()
        .get(id)
        .and_then(|a| a.header_bidding_bid_request.clone());
    if let Some(request) = in_flight {
        request.wait().await;
    }
}

/// Display a registered advert: observe it for lazy loading, or load it
/// now when lazy loading is off or `force_display` is set
pub fn display_ad(ctx: &Rc<AdContext>, id: &str, force_display: bool) -> Result<()> {
    if ctx.config().switches.lazy_load && !force_display {
        return enable_lazy_load(ctx, id);
    }

    let task_ctx = ctx.clone();
    let id = id.to_string();
    ctx.spawn(async move {
        if let Err(err) = load_advert(&task_ctx, &id).await {
            tracing::warn!(%id, %err, "advert failed to load");
        }
    })
    .detach();
    Ok(())
}
