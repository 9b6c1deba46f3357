//! Ad context
//!
//! Everything the ad slot lifecycle shares, owned in one place and passed
//! down as `Rc<AdContext>`: configuration, the page, the frame scheduler,
//! the advert registry, the vendor boundaries and the executor that runs
//! every background task. Independent contexts never see each other's
//! adverts.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use adslot_dom::{CustomEvent, Document, EventBus, IntersectionObserver, RootMargin};
use smol::{LocalExecutor, Task};

use crate::config::Config;
use crate::consent::{ConsentProvider, ConsentState, StaticConsent};
use crate::frame::FrameScheduler;
use crate::gpt::AdServer;
use crate::header_bidding::BidPartner;
use crate::memo::Memo;
use crate::registry::AdvertRegistry;
use crate::signals::SignalClient;
use crate::sizes::Breakpoint;
use crate::{lazy_load, refresh};

pub struct AdContext {
    config: Config,
    document: Rc<RefCell<Document>>,
    frame: FrameScheduler,
    registry: RefCell<AdvertRegistry>,
    ad_server: Rc<dyn AdServer>,
    bid_partners: Vec<Rc<dyn BidPartner>>,
    consent: Rc<dyn ConsentProvider>,
    signals: Option<SignalClient>,
    events: RefCell<EventBus>,
    executor: Rc<LocalExecutor<'static>>,
    /// Shared lazy-load observer, created on first use
    observer: Memo<RefCell<IntersectionObserver>>,
    pub(crate) intersection_check_pending: Cell<bool>,
    pub(crate) resize_generation: Cell<u64>,
}

impl std::fmt::Debug for AdContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdContext")
            .field("adverts", &self.registry.borrow().len())
            .field("bid_partners", &self.bid_partners.len())
            .field("signals", &self.signals.is_some())
            .field("frame", &self.frame)
            .finish()
    }
}

impl AdContext {
    pub fn builder(document: Rc<RefCell<Document>>, ad_server: Rc<dyn AdServer>) -> AdContextBuilder {
        AdContextBuilder {
            config: Config::default(),
            document,
            ad_server,
            bid_partners: Vec::new(),
            consent: None,
            signals: None,
            executor: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn document(&self) -> &Rc<RefCell<Document>> {
        &self.document
    }

    pub fn frame(&self) -> &FrameScheduler {
        &self.frame
    }

    pub fn registry(&self) -> &RefCell<AdvertRegistry> {
        &self.registry
    }

    pub fn ad_server(&self) -> &dyn AdServer {
        self.ad_server.as_ref()
    }

    pub fn bid_partners(&self) -> &[Rc<dyn BidPartner>] {
        &self.bid_partners
    }

    pub fn consent(&self) -> &Rc<dyn ConsentProvider> {
        &self.consent
    }

    pub fn signals(&self) -> Option<&SignalClient> {
        self.signals.as_ref()
    }

    pub fn events(&self) -> &RefCell<EventBus> {
        &self.events
    }

    pub fn executor(&self) -> &Rc<LocalExecutor<'static>> {
        &self.executor
    }

    /// The shared lazy-load observer
    pub fn observer(&self) -> &RefCell<IntersectionObserver> {
        self.observer.get()
    }

    /// Spawn a background task on the context's executor
    pub fn spawn<T: 'static>(&self, future: impl Future<Output = T> + 'static) -> Task<T> {
        self.executor.spawn(future)
    }

    /// Breakpoint of the current viewport
    pub fn breakpoint(&self) -> Breakpoint {
        Breakpoint::for_width(self.document.borrow().viewport().width)
    }

    /// Dispatch a page event to registered listeners
    pub fn dispatch_event(&self, event: &CustomEvent) -> usize {
        EventBus::dispatch(&self.events, event)
    }

    /// The reader scrolled
    pub fn scroll_to(self: &Rc<Self>, y: f64) {
        self.document.borrow_mut().scroll_to(y);
        lazy_load::schedule_intersection_check(self);
    }

    /// The window was resized
    pub fn resize(self: &Rc<Self>, width: f64, height: f64) {
        self.document.borrow_mut().resize(width, height);
        refresh::on_resize(self);
        lazy_load::schedule_intersection_check(self);
    }
}

pub struct AdContextBuilder {
    config: Config,
    document: Rc<RefCell<Document>>,
    ad_server: Rc<dyn AdServer>,
    bid_partners: Vec<Rc<dyn BidPartner>>,
    consent: Option<Rc<dyn ConsentProvider>>,
    signals: Option<SignalClient>,
    executor: Option<Rc<LocalExecutor<'static>>>,
}

impl AdContextBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn bid_partner(mut self, partner: Rc<dyn BidPartner>) -> Self {
        self.bid_partners.push(partner);
        self
    }

    /// Consent source; without one every vendor is considered consented
    pub fn consent(mut self, consent: Rc<dyn ConsentProvider>) -> Self {
        self.consent = Some(consent);
        self
    }

    pub fn signals(mut self, signals: SignalClient) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Executor to run background work on. The caller drives it.
    pub fn executor(mut self, executor: Rc<LocalExecutor<'static>>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Build the context and start its frame driver
    pub fn build(self) -> Rc<AdContext> {
        let executor = self.executor.unwrap_or_else(|| Rc::new(LocalExecutor::new()));
        let consent = self
            .consent
            .unwrap_or_else(|| Rc::new(StaticConsent(ConsentState::all_granted())));

        let margin = self.config.lazy_load.variant.root_margin();
        let observer = Memo::new(move || {
            let root_margin = RootMargin::parse(margin).unwrap_or_else(|err| {
                tracing::warn!(%err, margin, "bad lazy-load margin, using none");
                RootMargin::default()
            });
            tracing::debug!(margin, "created lazy-load observer");
            RefCell::new(IntersectionObserver::new(root_margin, vec![0.0]))
        });

        let frame = FrameScheduler::new();
        executor
            .spawn(frame.clone().run(self.config.timeouts.frame_interval()))
            .detach();

        tracing::info!(
            ad_unit = %self.config.ad_unit,
            bid_partners = self.bid_partners.len(),
            lazy_load = self.config.switches.lazy_load,
            "ad context created"
        );

        Rc::new(AdContext {
            config: self.config,
            document: self.document,
            frame,
            registry: RefCell::new(AdvertRegistry::new()),
            ad_server: self.ad_server,
            bid_partners: self.bid_partners,
            consent,
            signals: self.signals,
            events: RefCell::new(EventBus::new()),
            executor,
            observer,
            intersection_check_pending: Cell::new(false),
            resize_generation: Cell::new(0),
        })
    }
}
