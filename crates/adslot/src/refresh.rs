//! Refresh Coordinator
//!
//! Decides which displayed adverts may show a new creative. Two triggers:
//! a debounced resize that moves an advert into a different size-mapping
//! bucket, and a slot staying viewable for the refresh interval.

use std::rc::Rc;

use adslot_dom::DomTree;

use crate::advert::Advert;
use crate::context::AdContext;
use crate::display::refresh_advert;
use crate::lazy_load::enable_lazy_load;

/// Whether an advert may be refreshed.
///
/// Never for slots opted out with `data-refresh="false"`, fluid or
/// outstream creatives, line items that must stay put, or any advert while
/// a pageskin owns the page.
pub fn should_refresh(advert: &Advert, tree: &DomTree, non_refreshable_line_item_ids: &[u64], has_page_skin: bool) -> bool {
    if has_page_skin {
        return false;
    }
    if tree.get_attribute(advert.node, "data-refresh") == Some("false") {
        return false;
    }
    if let Some(size) = advert.size {
        if size.is_fluid() || size.is_outstream() {
            return false;
        }
    }
    if let Some(line_item) = advert.line_item_id {
        if non_refreshable_line_item_ids.contains(&line_item) {
            return false;
        }
    }
    true
}

/// [`should_refresh`] with the context's page configuration
pub fn advert_should_refresh(ctx: &AdContext, advert: &Advert) -> bool {
    let page = &ctx.config().page;
    let doc = ctx.document().borrow();
    should_refresh(advert, doc.tree(), &page.non_refreshable_line_item_ids, page.has_page_skin)
}

/// Resize listener. Only the last resize in a burst runs the breakpoint
/// check, after the debounce interval.
pub fn on_resize(ctx: &Rc<AdContext>) {
    if !ctx.config().switches.refresh_on_resize {
        return;
    }
    let generation = ctx.resize_generation.get() + 1;
    ctx.resize_generation.set(generation);

    let task_ctx = ctx.clone();
    let debounce = ctx.config().timeouts.resize_debounce();
    ctx.spawn(async move {
        smol::Timer::after(debounce).await;
        if task_ctx.resize_generation.get() != generation {
            return;
        }
        for id in refresh_on_breakpoint_change(&task_ctx) {
            let refresh_ctx = task_ctx.clone();
            task_ctx
                .spawn(async move {
                    if let Err(err) = refresh_advert(&refresh_ctx, &id).await {
                        tracing::warn!(%id, %err, "resize refresh failed");
                    }
                })
                .detach();
        }
    })
    .detach();
}

/// Update each tracked advert's size-mapping bucket for the current width
/// and return the ids whose bucket changed and that may refresh
pub fn refresh_on_breakpoint_change(ctx: &AdContext) -> Vec<String> {
    let width = ctx.document().borrow().viewport().width;
    let mut changed = Vec::new();
    {
        let mut registry = ctx.registry().borrow_mut();
        let tracked = registry.adverts_to_refresh().to_vec();
        for id in tracked {
            let Some(advert) = registry.get_mut(&id) else {
                continue;
            };
            let bucket = advert.sizes.matching_breakpoint(width);
            if bucket == advert.last_breakpoint {
                continue;
            }
            tracing::debug!(%id, from = ?advert.last_breakpoint, to = ?bucket, "size mapping bucket changed");
            advert.last_breakpoint = bucket;
            changed.push(id);
        }
    }

    let registry = ctx.registry().borrow();
    changed
        .into_iter()
        .filter(|id| registry.get(id).is_some_and(|a| advert_should_refresh(ctx, a)))
        .collect()
}

/// The ad server reports a slot as viewable. After the refresh interval the
/// slot is observed again, so it refreshes once it is next near the
/// viewport.
pub fn on_slot_viewable(ctx: &Rc<AdContext>, id: &str) {
    if !ctx.config().switches.viewable_refresh {
        return;
    }
    let eligible = ctx
        .registry()
        .borrow()
        .get(id)
        .is_some_and(|a| a.is_rendered && advert_should_refresh(ctx, a));
    if !eligible {
        return;
    }

    let task_ctx = ctx.clone();
    let id = id.to_string();
    let interval = ctx.config().timeouts.viewable_refresh();
    ctx.spawn(async move {
        smol::Timer::after(interval).await;
        if let Err(err) = enable_lazy_load(&task_ctx, &id) {
            tracing::debug!(%id, %err, "viewable refresh skipped");
        }
    })
    .detach();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Completion;
    use crate::gpt::SlotHandle;
    use crate::sizes::{AdSize, SizeMapping};
    use adslot_dom::Document;

    fn advert(doc: &mut Document) -> Advert {
        let node = doc.create_block("div", &["js-ad-slot"], 250.0);
        let mut advert = Advert::new(
            "dfp-ad--inline1".into(),
            "inline1".into(),
            node,
            SizeMapping::new(),
            SlotHandle(1),
            Completion::done(),
        );
        advert.size = Some(AdSize::MPU);
        advert.is_rendered = true;
        advert
    }

    #[test]
    fn test_refreshable_by_default() {
        let mut doc = Document::default();
        let advert = advert(&mut doc);
        assert!(should_refresh(&advert, doc.tree(), &[], false));
    }

    #[test]
    fn test_fluid_never_refreshes() {
        let mut doc = Document::default();
        let mut advert = advert(&mut doc);
        advert.size = Some(AdSize::FLUID);
        assert_eq!(advert.size.unwrap().to_string(), "fluid");
        assert!(!should_refresh(&advert, doc.tree(), &[], false));
    }

    #[test]
    fn test_outstream_never_refreshes() {
        let mut doc = Document::default();
        let mut advert = advert(&mut doc);
        for size in [AdSize::OUTSTREAM_DESKTOP, AdSize::OUTSTREAM_GOOGLE_DESKTOP, AdSize::OUTSTREAM_MOBILE] {
            advert.size = Some(size);
            assert!(!should_refresh(&advert, doc.tree(), &[], false));
        }
    }

    #[test]
    fn test_opt_out_attribute_wins() {
        let mut doc = Document::default();
        let advert = advert(&mut doc);
        doc.tree_mut().set_attribute(advert.node, "data-refresh", "false").unwrap();
        assert!(!should_refresh(&advert, doc.tree(), &[], false));

        doc.tree_mut().set_attribute(advert.node, "data-refresh", "true").unwrap();
        assert!(should_refresh(&advert, doc.tree(), &[], false));
    }

    #[test]
    fn test_non_refreshable_line_item() {
        let mut doc = Document::default();
        let mut advert = advert(&mut doc);
        advert.line_item_id = Some(123);
        assert!(!should_refresh(&advert, doc.tree(), &[123], false));
        advert.line_item_id = Some(456);
        assert!(should_refresh(&advert, doc.tree(), &[123], false));
    }

    #[test]
    fn test_page_skin_blocks_everything() {
        let mut doc = Document::default();
        let advert = advert(&mut doc);
        assert!(!should_refresh(&advert, doc.tree(), &[], true));
    }
}
