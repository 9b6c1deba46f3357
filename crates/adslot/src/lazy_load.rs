//! Lazy-Load Scheduler
//!
//! Adverts waiting to load are observed by the context's single shared
//! intersection observer. Entries are delivered on their own task turn,
//! never inside the call that caused them. Each intersecting target is
//! unobserved first, so a slot fires once per observation, then displayed
//! on its own task: refreshed if it has rendered before, loaded otherwise.

use std::rc::Rc;

use adslot_dom::NodeId;

use crate::context::AdContext;
use crate::display::{load_advert, refresh_advert};
use crate::{AdError, Result};

/// Observe an advert and display it once it nears the viewport
pub fn enable_lazy_load(ctx: &Rc<AdContext>, id: &str) -> Result<()> {
    let node = {
        let mut registry = ctx.registry().borrow_mut();
        let advert = registry
            .get(id)
            .ok_or_else(|| AdError::UnknownAdvert { id: id.to_string() })?;
        let (node, rendered) = (advert.node, advert.is_rendered);
        if !rendered {
            registry.mark_to_load(id);
        }
        node
    };

    ctx.observer().borrow_mut().observe(node);
    tracing::debug!(id, %node, "observing advert");
    schedule_intersection_check(ctx);
    Ok(())
}

/// Queue one intersection check for the next task turn. Repeated calls
/// before it runs share the same check.
pub fn schedule_intersection_check(ctx: &Rc<AdContext>) {
    if ctx.intersection_check_pending.replace(true) {
        return;
    }
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        smol::future::yield_now().await;
        task_ctx.intersection_check_pending.set(false);
        check_intersections(&task_ctx);
    })
    .detach();
}

/// Deliver pending intersection entries, returns the nodes that fired
pub fn check_intersections(ctx: &Rc<AdContext>) -> Vec<NodeId> {
    let entries = {
        let mut doc = ctx.document().borrow_mut();
        ctx.observer().borrow_mut().check(&mut doc)
    };

    let mut fired = Vec::new();
    for entry in entries.into_iter().filter(|e| e.is_intersecting) {
        ctx.observer().borrow_mut().unobserve(entry.target);
        fired.push(entry.target);
        on_intersect(ctx, entry.target);
    }
    fired
}

fn on_intersect(ctx: &Rc<AdContext>, node: NodeId) {
    let (id, rendered) = {
        let mut registry = ctx.registry().borrow_mut();
        let Some(advert) = registry.find_by_node(node) else {
            tracing::debug!(%node, "intersecting node has no advert");
            return;
        };
        let (id, rendered) = (advert.id.clone(), advert.is_rendered);
        registry.take_to_load(&id);
        (id, rendered)
    };

    tracing::debug!(%id, rendered, "advert near viewport");
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let result = if rendered {
            refresh_advert(&task_ctx, &id).await
        } else {
            load_advert(&task_ctx, &id).await
        };
        if let Err(err) = result {
            tracing::warn!(%id, %err, "lazy display failed");
        }
    })
    .detach();
}
