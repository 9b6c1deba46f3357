//! Shared fakes and page builders for the integration tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use adslot::dom::{BoxStyle, Document, NodeId, Viewport};
use adslot::sizes::{AdSize, ViewportSizes};
use adslot::{
    create_ad_slot, wrap_slot_in_container, AdContext, AdContextBuilder, AdError, AdServer, BidPartner, BidSlot,
    Config, ConsentProvider, ConsentState, CreateSlotOptions, Result, SizeFilter, SlotHandle, SlotKind, Vendor,
};
use smol::future::{BoxedLocal, FutureExt};
use smol::LocalExecutor;

// ============================================================================
// AD SERVER
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Define { element_id: String, slot: SlotHandle, out_of_page: bool },
    Targeting { slot: SlotHandle, key: String, values: Vec<String> },
    Display(String),
    Refresh(Vec<SlotHandle>),
    Destroy(Vec<SlotHandle>),
}

/// Ad server that records every call
#[derive(Debug, Default)]
pub struct RecordingAdServer {
    next_slot: Cell<u64>,
    calls: RefCell<Vec<Call>>,
}

impl RecordingAdServer {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn defined(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Define { element_id, .. } => Some(element_id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn displayed(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Display(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn refreshed(&self) -> Vec<SlotHandle> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Refresh(slots) => Some(slots.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn destroyed(&self) -> Vec<SlotHandle> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Destroy(slots) => Some(slots.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Last targeting value set for `key` on `slot`
    pub fn targeting(&self, slot: SlotHandle, key: &str) -> Option<Vec<String>> {
        self.calls.borrow().iter().rev().find_map(|c| match c {
            Call::Targeting { slot: s, key: k, values } if *s == slot && k == key => Some(values.clone()),
            _ => None,
        })
    }
}

impl AdServer for RecordingAdServer {
    fn define_slot(&self, _ad_unit: &str, _sizes: &[AdSize], element_id: &str, out_of_page: bool) -> Result<SlotHandle> {
        let slot = SlotHandle(self.next_slot.get());
        self.next_slot.set(slot.0 + 1);
        self.calls.borrow_mut().push(Call::Define { element_id: element_id.to_string(), slot, out_of_page });
        Ok(slot)
    }

    fn define_size_mapping(&self, _slot: SlotHandle, _mapping: &[ViewportSizes]) {}

    fn set_targeting(&self, slot: SlotHandle, key: &str, values: &[String]) {
        self.calls
            .borrow_mut()
            .push(Call::Targeting { slot, key: key.to_string(), values: values.to_vec() });
    }

    fn display(&self, element_id: &str) {
        self.calls.borrow_mut().push(Call::Display(element_id.to_string()));
    }

    fn refresh(&self, slots: &[SlotHandle]) {
        self.calls.borrow_mut().push(Call::Refresh(slots.to_vec()));
    }

    fn destroy_slots(&self, slots: &[SlotHandle]) {
        self.calls.borrow_mut().push(Call::Destroy(slots.to_vec()));
    }
}

// ============================================================================
// BID PARTNER
// ============================================================================

/// Bid partner that records the slots of every auction
pub struct FakePartner {
    name: &'static str,
    vendor: Vendor,
    delay: Duration,
    fail: bool,
    auctions: RefCell<Vec<Vec<String>>>,
}

impl FakePartner {
    pub fn new(name: &'static str, vendor: Vendor) -> Self {
        Self { name, vendor, delay: Duration::ZERO, fail: false, auctions: RefCell::new(Vec::new()) }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Slot ids of each auction, in order
    pub fn auctions(&self) -> Vec<Vec<String>> {
        self.auctions.borrow().clone()
    }

    /// Every slot id bid on, flattened
    pub fn bid_ids(&self) -> Vec<String> {
        self.auctions.borrow().iter().flatten().cloned().collect()
    }
}

impl BidPartner for FakePartner {
    fn name(&self) -> &str {
        self.name
    }

    fn vendor(&self) -> Vendor {
        self.vendor
    }

    fn request_bids(&self, slots: Vec<BidSlot>, _size_filter: SizeFilter) -> BoxedLocal<Result<()>> {
        self.auctions.borrow_mut().push(slots.into_iter().map(|s| s.id).collect());
        let (delay, fail, partner) = (self.delay, self.fail, self.name.to_string());
        async move {
            if !delay.is_zero() {
                smol::Timer::after(delay).await;
            }
            if fail {
                return Err(AdError::BidPartner { partner, reason: "no fill".into() });
            }
            Ok(())
        }
        .boxed_local()
    }
}

/// Consent platform that never hears back from the reader
#[derive(Debug, Default)]
pub struct UndecidedConsent;

impl ConsentProvider for UndecidedConsent {
    fn on_consent(&self) -> BoxedLocal<ConsentState> {
        smol::future::pending().boxed_local()
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// Config with short timers so tests settle quickly
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.timeouts.frame_interval_ms = 0;
    config.timeouts.resize_debounce_ms = 20;
    config.timeouts.third_party_signal_ms = 50;
    config.timeouts.bid_partner_ms = 50;
    config.timeouts.viewable_refresh_ms = 30;
    config
}

pub struct Harness {
    pub ex: Rc<LocalExecutor<'static>>,
    pub server: Rc<RecordingAdServer>,
    pub document: Rc<RefCell<Document>>,
    pub ctx: Rc<AdContext>,
}

impl Harness {
    pub fn new(document: Document, config: Config) -> Self {
        Self::with(document, config, |builder| builder)
    }

    pub fn with(document: Document, config: Config, f: impl FnOnce(AdContextBuilder) -> AdContextBuilder) -> Self {
        let ex = Rc::new(LocalExecutor::new());
        let server = Rc::new(RecordingAdServer::default());
        let document = Rc::new(RefCell::new(document));
        let builder = AdContext::builder(document.clone(), server.clone())
            .config(config)
            .executor(ex.clone());
        let ctx = f(builder).build();
        Self { ex, server, document, ctx }
    }

    /// Drive the context's executor until `future` completes
    pub fn run<T>(&self, future: impl Future<Output = T>) -> T {
        smol::block_on(self.ex.run(future))
    }

    pub fn slot_of(&self, id: &str) -> Option<SlotHandle> {
        self.ctx.registry().borrow().get(id).map(|a| a.slot)
    }
}

/// Let background tasks run for `ms` milliseconds
pub async fn settle(ms: u64) {
    smol::Timer::after(Duration::from_millis(ms)).await;
}

// ============================================================================
// PAGES
// ============================================================================

pub fn document(width: f64) -> Document {
    Document::new(Viewport::new(width, 800.0))
}

/// Append a block of `height` under `parent`
pub fn block(doc: &mut Document, parent: NodeId, tag: &str, classes: &[&str], height: f64) -> NodeId {
    let node = doc.create_block(tag, classes, height);
    doc.append_child(parent, node).unwrap();
    node
}

/// Append an ad slot of `kind` under `parent`, wrapped in a container
pub fn slot(doc: &mut Document, parent: NodeId, kind: SlotKind, name: Option<&str>, height: f64) -> NodeId {
    let options = match name {
        Some(name) => CreateSlotOptions::named(name),
        None => CreateSlotOptions::default(),
    };
    let node = create_ad_slot(doc, kind, &options).unwrap();
    doc.set_style(node, BoxStyle::with_height(height)).unwrap();
    let container = wrap_slot_in_container(doc, node, &[]).unwrap();
    doc.append_child(parent, container).unwrap();
    node
}

/// Article page: `paragraphs` paragraphs of 200px in the commercial body
pub fn article_page(width: f64, paragraphs: usize) -> (Document, NodeId) {
    let mut doc = document(width);
    let page_body = doc.body();
    let body = block(&mut doc, page_body, "div", &["article-body-commercial-selector"], 0.0);
    for _ in 0..paragraphs {
        block(&mut doc, body, "p", &[], 200.0);
    }
    (doc, body)
}

/// Liveblog page: `blocks` blocks of 500px in the liveblog body
pub fn liveblog_page(blocks: usize) -> (Document, NodeId) {
    let mut doc = document(1300.0);
    let page_body = doc.body();
    let body = block(&mut doc, page_body, "div", &["js-liveblog-body"], 0.0);
    for _ in 0..blocks {
        block(&mut doc, body, "div", &["block"], 500.0);
    }
    (doc, body)
}
