//! Liveblog Incremental Inserter
//!
//! A liveblog grows while it is read. The first pass places ads through the
//! whole body; every `liveblog:blocks-updated` event then scans only the
//! new blocks, from the bottom of the fresh content up to the newest ad
//! already in place, keeping a viewport height between ads. Once the page
//! holds the maximum number of liveblog ads the listener is removed for
//! good.
//!
//! Some updates arrive with server-inserted slots instead. Their
//! `{numAdsToInsert, fromIndex}` detail says how many of those empty slots
//! to fill and where their numbering starts.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use adslot_dom::{CustomEvent, Document, ListenerId, ListenerOptions, NodeId};
use serde::Deserialize;

use crate::config::LiveblogConfig;
use crate::context::AdContext;
use crate::lifecycle::add_slot;
use crate::slot::{create_ad_slot, slot_id, wrap_slot_in_container, CreateSlotOptions, SlotKind};
use crate::spacefinder::{find_space, SpacefinderItem, SpacefinderResult, SpacefinderRules};
use crate::Result;

pub const BLOCKS_UPDATED_EVENT: &str = "liveblog:blocks-updated";
pub const LIVEBLOG_BODY_SELECTOR: &str = ".js-liveblog-body";
const BLOCK_SELECTOR: &str = "> .block";
const AD_CONTAINER_SELECTOR: &str = "> .ad-slot-container";

/// Detail of a blocks-updated event carrying server-inserted slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlocksUpdated {
    pub num_ads_to_insert: usize,
    pub from_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Initial,
    Update,
    ServerSlots(BlocksUpdated),
}

#[derive(Debug, Default)]
struct LiveblogState {
    inserted: usize,
    /// Number for the next slot name
    next_index: usize,
    listener: Option<ListenerId>,
    running: bool,
    queued: VecDeque<Pass>,
    exhausted: bool,
}

/// Handle on the liveblog inserter of one page
#[derive(Debug, Clone)]
pub struct LiveblogInserter {
    state: Rc<RefCell<LiveblogState>>,
}

impl LiveblogInserter {
    /// Liveblog ads placed so far
    pub fn inserted(&self) -> usize {
        self.state.borrow().inserted
    }

    /// The ad limit was reached; no further ads on this page view
    pub fn is_exhausted(&self) -> bool {
        self.state.borrow().exhausted
    }

    pub fn is_listening(&self) -> bool {
        self.state.borrow().listener.is_some()
    }
}

/// Place the first liveblog ads and start listening for updates
pub async fn init_liveblog(ctx: &Rc<AdContext>) -> Result<LiveblogInserter> {
    let inserter = LiveblogInserter {
        state: Rc::new(RefCell::new(LiveblogState { next_index: 1, ..LiveblogState::default() })),
    };
    if !ctx.config().switches.liveblog_ads {
        tracing::debug!("liveblog ads switched off");
        return Ok(inserter);
    }

    run_pass(ctx, &inserter.state, Pass::Initial).await?;
    if inserter.is_exhausted() {
        return Ok(inserter);
    }

    let weak = Rc::downgrade(ctx);
    let state = inserter.state.clone();
    let listener = ctx.events().borrow_mut().add_listener(
        BLOCKS_UPDATED_EVENT,
        Rc::new(move |event: &CustomEvent| on_blocks_updated(&weak, &state, event)),
        ListenerOptions::default(),
    );
    inserter.state.borrow_mut().listener = Some(listener);
    Ok(inserter)
}

fn on_blocks_updated(ctx: &Weak<AdContext>, state: &Rc<RefCell<LiveblogState>>, event: &CustomEvent) {
    let Some(ctx) = ctx.upgrade() else {
        return;
    };
    let pass = match &event.detail {
        Some(detail) => match serde_json::from_value::<BlocksUpdated>(detail.clone()) {
            Ok(update) => Pass::ServerSlots(update),
            Err(err) => {
                tracing::warn!(%err, "ignoring malformed blocks-updated detail");
                Pass::Update
            }
        },
        None => Pass::Update,
    };

    let start = {
        let mut s = state.borrow_mut();
        if s.exhausted {
            return;
        }
        s.queued.push_back(pass);
        !std::mem::replace(&mut s.running, true)
    };
    if !start {
        return;
    }

    // Passes run one at a time so two scans never claim the same space
    let state = state.clone();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        loop {
            let next = state.borrow_mut().queued.pop_front();
            let Some(pass) = next else {
                break;
            };
            if let Err(err) = run_pass(&task_ctx, &state, pass).await {
                tracing::warn!(%err, ?pass, "liveblog pass failed");
            }
        }
        state.borrow_mut().running = false;
    })
    .detach();
}

async fn run_pass(ctx: &Rc<AdContext>, state: &Rc<RefCell<LiveblogState>>, pass: Pass) -> Result<()> {
    let max_ads = ctx.config().liveblog.max_ads;
    let remaining = {
        let s = state.borrow();
        if s.exhausted {
            return Ok(());
        }
        max_ads.saturating_sub(s.inserted)
    };

    let placed = if remaining == 0 {
        0
    } else {
        match pass {
            Pass::ServerSlots(update) => fill_server_slots(ctx, update, remaining).await?,
            Pass::Initial | Pass::Update => scan_and_insert(ctx, state, pass, remaining).await?,
        }
    };

    let mut s = state.borrow_mut();
    s.inserted += placed;
    tracing::debug!(?pass, placed, total = s.inserted, "liveblog pass");
    if s.inserted >= max_ads {
        s.exhausted = true;
        s.queued.clear();
        if let Some(listener) = s.listener.take() {
            ctx.events().borrow_mut().remove_listener(listener);
        }
        tracing::info!(max_ads, "liveblog ad limit reached");
    }
    Ok(())
}

/// Newest ad container already in the liveblog body
fn topmost_ad(document: &Document) -> Result<Option<NodeId>> {
    let Some(body) = document.query_selector(LIVEBLOG_BODY_SELECTOR)? else {
        return Ok(None);
    };
    Ok(document.query_within(body, AD_CONTAINER_SELECTOR)?.into_iter().next())
}

/// Ads go in right after their winning block, so a new ad sits at the
/// block's bottom. The ad already in place (`start_at`) sits at its own top.
fn rules_for(config: &LiveblogConfig, viewport_height: f64, pass: Pass, start_at: Option<NodeId>) -> SpacefinderRules {
    let between = config.between_ads_multiplier * viewport_height;
    let ad_top = move |item: &SpacefinderItem| if Some(item.element) == start_at { item.top } else { item.bottom };
    let enough_space = move |candidate: &SpacefinderItem, prev: Option<&SpacefinderItem>| {
        prev.is_none_or(|p| (ad_top(candidate) - ad_top(p)).abs() >= between)
    };

    let rules = SpacefinderRules::new(LIVEBLOG_BODY_SELECTOR, BLOCK_SELECTOR).filter(enough_space);
    match (pass, start_at) {
        (Pass::Update, Some(start)) => rules.from_bottom(true).start_at(Some(start)),
        _ => rules.min_above(config.first_ad_multiplier * viewport_height),
    }
}

/// Put a liveblog slot after each winner, numbered from `first_index`
fn place_liveblog_slots(doc: &mut Document, winners: &[SpacefinderItem], first_index: usize) -> Result<Vec<NodeId>> {
    let mut slots = Vec::with_capacity(winners.len());
    for winner in winners {
        let name = format!("liveblog-inline-{}", first_index + slots.len());
        let slot = create_ad_slot(doc, SlotKind::LiveblogInline, &CreateSlotOptions::named(name))?;
        let container = wrap_slot_in_container(doc, slot, &["ad-slot-container--liveblog"])?;
        doc.insert_after(winner.element, container)?;
        slots.push(slot);
    }
    Ok(slots)
}

async fn scan_and_insert(ctx: &Rc<AdContext>, state: &Rc<RefCell<LiveblogState>>, pass: Pass, remaining: usize) -> Result<usize> {
    let config = ctx.config().liveblog.clone();
    let document = ctx.document().clone();
    // The newest ad is looked up in the same read as the scan
    let found = ctx
        .frame()
        .measure(move || -> Result<SpacefinderResult> {
            let mut doc = document.borrow_mut();
            let start_at = match pass {
                Pass::Update => topmost_ad(&doc)?,
                _ => None,
            };
            let rules = rules_for(&config, doc.viewport().height, pass, start_at);
            find_space(&mut doc, &rules, Some(remaining))
        })
        .await??;

    let first_index = state.borrow().next_index;
    let document = ctx.document().clone();
    let slots = ctx
        .frame()
        .mutate(move || place_liveblog_slots(&mut document.borrow_mut(), &found.winners, first_index))
        .await??;

    state.borrow_mut().next_index += slots.len();
    let mut placed = 0;
    for slot in slots {
        match add_slot(ctx, slot, false) {
            Ok(_) => placed += 1,
            Err(err) => tracing::warn!(%slot, %err, "liveblog slot not added"),
        }
    }
    Ok(placed)
}

/// Fill empty slots the server put into the page
async fn fill_server_slots(ctx: &Rc<AdContext>, update: BlocksUpdated, remaining: usize) -> Result<usize> {
    let known: Vec<NodeId> = ctx.registry().borrow().iter().map(|a| a.node).collect();
    let wanted = update.num_ads_to_insert.min(remaining);
    let document = ctx.document().clone();
    let pending = ctx
        .frame()
        .measure(move || -> Result<Vec<NodeId>> {
            let doc = document.borrow();
            let Some(body) = doc.query_selector(LIVEBLOG_BODY_SELECTOR)? else {
                return Ok(Vec::new());
            };
            Ok(doc
                .query_within(body, ".js-ad-slot")?
                .into_iter()
                .filter(|node| !known.contains(node))
                .take(wanted)
                .collect())
        })
        .await??;
    if pending.is_empty() {
        return Ok(0);
    }

    let document = ctx.document().clone();
    let unnamed = pending.clone();
    ctx.frame()
        .mutate(move || -> Result<()> {
            let mut doc = document.borrow_mut();
            let tree = doc.tree_mut();
            for (n, node) in unnamed.into_iter().enumerate() {
                if tree.get_attribute(node, "id").is_none() {
                    let name = format!("liveblog-inline-{}", update.from_index + n);
                    tree.set_attribute(node, "id", &slot_id(&name))?;
                    tree.set_attribute(node, "data-name", &name)?;
                }
            }
            Ok(())
        })
        .await??;

    let mut placed = 0;
    for node in pending {
        match add_slot(ctx, node, false) {
            Ok(_) => placed += 1,
            Err(err) => tracing::warn!(%node, %err, "server slot not added"),
        }
    }
    Ok(placed)
}
