//! Slot lifecycle
//!
//! Discovery of slots already in the page, dynamic slots, ad server render
//! callbacks and slot collapse.

use std::rc::Rc;

use adslot_dom::{BoxStyle, Document, NodeId};

use crate::context::AdContext;
use crate::define::create_advert;
use crate::display::display_ad;
use crate::refresh;
use crate::sizes::AdSize;
use crate::slot::AD_SLOT_SELECTOR;
use crate::{AdError, Result};

/// Ad server `slotRenderEnded` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRenderEnded {
    pub slot_id: String,
    pub is_empty: bool,
    pub size: Option<AdSize>,
    pub line_item_id: Option<u64>,
}

/// Hidden itself or inside a hidden ancestor
fn is_disabled(document: &Document, node: NodeId) -> bool {
    let tree = document.tree();
    std::iter::once(node)
        .chain(tree.ancestors(node))
        .any(|id| tree.element(id).is_some_and(|el| el.style.hidden))
}

/// The element to take out of the page with a slot: its container if any
fn removal_target(document: &Document, node: NodeId) -> NodeId {
    match document.tree().parent(node) {
        Some(parent) if document.tree().has_class(parent, "ad-slot-container") => parent,
        _ => node,
    }
}

fn wants_immediate_display(document: &Document, node: NodeId) -> bool {
    document.tree().get_attribute(node, "data-lazy-load") == Some("false")
}

/// Register and display every unregistered ad slot in the page. Disabled
/// slots are removed first. Returns the ids of the new adverts.
pub async fn fill_advert_slots(ctx: &Rc<AdContext>) -> Result<Vec<String>> {
    let (enabled, disabled) = {
        let document = ctx.document().clone();
        let known: Vec<NodeId> = ctx.registry().borrow().iter().map(|a| a.node).collect();
        ctx.frame()
            .measure(move || -> Result<(Vec<NodeId>, Vec<NodeId>)> {
                let doc = document.borrow();
                let slots = doc.query_selector_all(AD_SLOT_SELECTOR)?;
                Ok(slots
                    .into_iter()
                    .filter(|node| !known.contains(node))
                    .partition(|&node| !is_disabled(&doc, node)))
            })
            .await??
    };

    if !disabled.is_empty() {
        let document = ctx.document().clone();
        let removed = disabled.len();
        ctx.frame()
            .mutate(move || {
                let mut doc = document.borrow_mut();
                for node in disabled {
                    let target = removal_target(&doc, node);
                    // Already gone with an earlier container
                    let _ = doc.remove(target);
                }
            })
            .await?;
        tracing::debug!(removed, "removed disabled slots");
    }

    let mut ids = Vec::new();
    for node in enabled {
        match register_slot(ctx, node) {
            Ok(id) => ids.push(id),
            Err(err) => tracing::error!(%node, %err, "could not create advert"),
        }
    }

    let immediate: Vec<bool> = {
        let doc = ctx.document().borrow();
        ids.iter()
            .map(|id| {
                ctx.registry()
                    .borrow()
                    .get(id)
                    .is_some_and(|a| wants_immediate_display(&doc, a.node))
            })
            .collect()
    };
    for (id, immediate) in ids.iter().zip(immediate) {
        display_ad(ctx, id, immediate)?;
    }

    tracing::info!(adverts = ids.len(), "filled advert slots");
    Ok(ids)
}

/// Define and register the advert for a slot element, without displaying it
fn register_slot(ctx: &Rc<AdContext>, node: NodeId) -> Result<String> {
    let id = {
        let doc = ctx.document().borrow();
        doc.tree().get_attribute(node, "id").map(str::to_string).ok_or(AdError::MissingSlotId)?
    };
    // Check before defining so a rejected duplicate never reaches the ad server
    if ctx.registry().borrow().contains(&id) {
        return Err(AdError::DuplicateAdvert { id });
    }
    let advert = create_advert(ctx, node, None)?;
    ctx.registry().borrow_mut().register(advert)?;
    Ok(id)
}

/// Add a slot inserted after page load. The element must already be in the
/// page.
pub fn add_slot(ctx: &Rc<AdContext>, node: NodeId, force_display: bool) -> Result<String> {
    let id = register_slot(ctx, node)?;
    let immediate = force_display || wants_immediate_display(&ctx.document().borrow(), node);
    display_ad(ctx, &id, immediate)?;
    Ok(id)
}

/// Unregister an advert, destroy its ad server slot and take it out of the
/// page
pub async fn collapse_slot(ctx: &Rc<AdContext>, id: &str) -> Result<()> {
    let advert = ctx
        .registry()
        .borrow_mut()
        .unregister(id)
        .ok_or_else(|| AdError::UnknownAdvert { id: id.to_string() })?;
    ctx.observer().borrow_mut().unobserve(advert.node);
    ctx.ad_server().destroy_slots(&[advert.slot]);

    let document = ctx.document().clone();
    let node = advert.node;
    ctx.frame()
        .mutate(move || {
            let mut doc = document.borrow_mut();
            let target = removal_target(&doc, node);
            doc.remove(target)
        })
        .await??;

    tracing::info!(id, "collapsed slot");
    Ok(())
}

/// Ad server render callback
pub fn on_slot_render_ended(ctx: &Rc<AdContext>, event: &SlotRenderEnded) {
    let node = {
        let mut registry = ctx.registry().borrow_mut();
        let Some(advert) = registry.get_mut(&event.slot_id) else {
            tracing::debug!(id = %event.slot_id, "render for unknown advert");
            return;
        };
        advert.is_empty = Some(event.is_empty);
        if !event.is_empty {
            advert.is_rendered = true;
            advert.size = event.size;
            advert.line_item_id = event.line_item_id;
        }
        let node = advert.node;
        if !event.is_empty {
            registry.track_refresh(&event.slot_id);
        }
        node
    };

    tracing::info!(id = %event.slot_id, empty = event.is_empty, size = ?event.size, "slot rendered");

    let task_ctx = ctx.clone();
    let event = event.clone();
    ctx.spawn(async move {
        if event.is_empty {
            if let Err(err) = collapse_slot(&task_ctx, &event.slot_id).await {
                tracing::debug!(id = %event.slot_id, %err, "empty slot not collapsed");
            }
            return;
        }
        let Some(size) = event.size.filter(|s| !s.is_proxy()) else {
            return;
        };
        let document = task_ctx.document().clone();
        let resized = task_ctx
            .frame()
            .mutate(move || {
                let mut doc = document.borrow_mut();
                let style = doc.tree().element(node).map(|el| el.style).unwrap_or_default();
                doc.set_style(node, BoxStyle { height: f64::from(size.height), ..style })
            })
            .await;
        if let Err(err) = resized.and_then(|r| r.map_err(AdError::from)) {
            tracing::debug!(id = %event.slot_id, %err, "could not size rendered slot");
        }
    })
    .detach();
}

/// Ad server viewability callback
pub fn on_slot_viewable(ctx: &Rc<AdContext>, id: &str) {
    refresh::on_slot_viewable(ctx, id);
}

/// What [`init_page`] placed
#[derive(Debug, Default)]
pub struct PageAdverts {
    /// Slots that were in the page markup
    pub static_slots: Vec<String>,
    /// Fixed slots that found their place
    pub fixed_slots: Vec<String>,
    /// Article inline slots
    pub inline_slots: Vec<String>,
    pub liveblog: Option<crate::liveblog::LiveblogInserter>,
}

/// Bring up every advert on the page: fixed slots, slots in the markup,
/// then article inlines or the liveblog inserter
pub async fn init_page(ctx: &Rc<AdContext>) -> Result<PageAdverts> {
    let mut page = PageAdverts::default();

    for fixed in [
        crate::fixed_slots::init_high_merch(ctx).await,
        crate::fixed_slots::init_mobile_sticky(ctx).await,
    ] {
        match fixed {
            Ok(Some(id)) => page.fixed_slots.push(id),
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "fixed slot failed"),
        }
    }

    page.static_slots = fill_advert_slots(ctx).await?;

    if ctx.config().page.is_liveblog {
        page.liveblog = Some(crate::liveblog::init_liveblog(ctx).await?);
    } else {
        page.inline_slots = crate::article::init_article_inline_ads(ctx).await?;
    }

    tracing::info!(
        static_slots = page.static_slots.len(),
        fixed_slots = page.fixed_slots.len(),
        inline_slots = page.inline_slots.len(),
        liveblog = page.liveblog.is_some(),
        "page adverts initialised"
    );
    Ok(page)
}
