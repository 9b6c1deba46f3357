//! Stand-ins for the ad server, bid partners and signal vendor
//!
//! They log what the real SDKs would be asked to do and answer the way a
//! quiet ad server would: every display renders an MPU.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use adslot::sizes::{AdSize, ViewportSizes};
use adslot::{AdServer, BidPartner, BidSlot, Result, SignalRequest, SizeFilter, SlotHandle, Targeting, Vendor};
use smol::channel::Receiver;
use smol::future::{BoxedLocal, FutureExt};

/// Ad server that logs calls and queues a render for every display
#[derive(Debug, Default)]
pub struct LoggingAdServer {
    next_slot: Cell<u64>,
    displays: Cell<usize>,
    refreshes: Cell<usize>,
    /// Element ids displayed or refreshed and not yet reported rendered
    pending_renders: RefCell<Vec<String>>,
    slots: RefCell<Vec<(SlotHandle, String)>>,
}

impl LoggingAdServer {
    pub fn take_pending_renders(&self) -> Vec<String> {
        std::mem::take(&mut self.pending_renders.borrow_mut())
    }

    pub fn displays(&self) -> usize {
        self.displays.get()
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.get()
    }
}

impl AdServer for LoggingAdServer {
    fn define_slot(&self, ad_unit: &str, sizes: &[AdSize], element_id: &str, out_of_page: bool) -> Result<SlotHandle> {
        let slot = SlotHandle(self.next_slot.get());
        self.next_slot.set(slot.0 + 1);
        self.slots.borrow_mut().push((slot, element_id.to_string()));
        tracing::debug!(%slot, ad_unit, element_id, sizes = sizes.len(), out_of_page, "defineSlot");
        Ok(slot)
    }

    fn define_size_mapping(&self, slot: SlotHandle, mapping: &[ViewportSizes]) {
        tracing::trace!(%slot, entries = mapping.len(), "defineSizeMapping");
    }

    fn set_targeting(&self, slot: SlotHandle, key: &str, values: &[String]) {
        tracing::trace!(%slot, key, ?values, "setTargeting");
    }

    fn display(&self, element_id: &str) {
        self.displays.set(self.displays.get() + 1);
        self.pending_renders.borrow_mut().push(element_id.to_string());
        tracing::debug!(element_id, "display");
    }

    fn refresh(&self, slots: &[SlotHandle]) {
        self.refreshes.set(self.refreshes.get() + slots.len());
        let known = self.slots.borrow();
        let mut pending = self.pending_renders.borrow_mut();
        for slot in slots {
            if let Some((_, id)) = known.iter().find(|(s, _)| s == slot) {
                pending.push(id.clone());
            }
        }
        tracing::debug!(slots = slots.len(), "refresh");
    }

    fn destroy_slots(&self, slots: &[SlotHandle]) {
        self.slots.borrow_mut().retain(|(s, _)| !slots.contains(s));
        tracing::debug!(slots = slots.len(), "destroySlots");
    }
}

/// Bid partner that answers after a fixed latency
pub struct LoggingPartner {
    name: &'static str,
    vendor: Vendor,
    latency: Duration,
}

impl LoggingPartner {
    pub fn new(name: &'static str, vendor: Vendor, latency: Duration) -> Self {
        Self { name, vendor, latency }
    }
}

impl BidPartner for LoggingPartner {
    fn name(&self) -> &str {
        self.name
    }

    fn vendor(&self) -> Vendor {
        self.vendor
    }

    fn request_bids(&self, slots: Vec<BidSlot>, size_filter: SizeFilter) -> BoxedLocal<Result<()>> {
        let biddable: usize = slots
            .iter()
            .map(|s| s.sizes.iter().filter(|size| size_filter(size)).count())
            .sum();
        tracing::debug!(partner = self.name, slots = slots.len(), biddable, "auction");
        let latency = self.latency;
        async move {
            smol::Timer::after(latency).await;
            Ok(())
        }
        .boxed_local()
    }
}

/// Signal vendor: answers every request after `latency`
pub async fn serve_signals(requests: Receiver<SignalRequest>, latency: Duration) {
    let mut answered = 0usize;
    while let Ok(request) = requests.recv().await {
        smol::Timer::after(latency).await;
        let targeting: Targeting = [("fr".to_string(), vec!["7".to_string()])].into();
        let slot_id = request.slot_id.clone();
        if request.respond(targeting) {
            answered += 1;
        } else {
            tracing::debug!(%slot_id, "signal reply came too late");
        }
    }
    tracing::debug!(answered, "signal vendor stopped");
}
