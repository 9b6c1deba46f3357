//! Advert state
//!
//! One [`Advert`] per ad slot element known to the system. The DOM owns
//! the node; an advert only refers to it by id.

use adslot_dom::NodeId;

use crate::completion::Completion;
use crate::gpt::SlotHandle;
use crate::header_bidding::BidSlot;
use crate::sizes::{AdSize, Breakpoint, SizeMapping};

#[derive(Debug, Clone)]
pub struct Advert {
    /// DOM id of the slot element
    pub id: String,
    /// Logical slot name from `data-name`
    pub name: String,
    pub node: NodeId,
    pub sizes: SizeMapping,
    pub slot: SlotHandle,
    /// Resolves once supplementary targeting is in or has timed out
    pub slot_ready: Completion,
    /// Whether the ad server has rendered any creative into the slot
    pub is_rendered: bool,
    /// Last render was empty
    pub is_empty: Option<bool>,
    /// Size of the last rendered creative
    pub size: Option<AdSize>,
    /// Bid request for the current load or refresh cycle
    pub header_bidding_bid_request: Option<Completion>,
    pub line_item_id: Option<u64>,
    /// Size-mapping bucket in force when the advert was last checked
    pub last_breakpoint: Option<Breakpoint>,
}

impl Advert {
    pub fn new(id: String, name: String, node: NodeId, sizes: SizeMapping, slot: SlotHandle, slot_ready: Completion) -> Self {
        Self {
            id,
            name,
            node,
            sizes,
            slot,
            slot_ready,
            is_rendered: false,
            is_empty: None,
            size: None,
            header_bidding_bid_request: None,
            line_item_id: None,
            last_breakpoint: None,
        }
    }

    /// Start a new load or refresh cycle: the previous bid request no
    /// longer counts
    pub fn start_cycle(&mut self) {
        self.header_bidding_bid_request = None;
    }

    /// What bid partners get to see
    pub fn bid_slot(&self) -> BidSlot {
        BidSlot {
            id: self.id.clone(),
            name: self.name.clone(),
            sizes: self.sizes.all_sizes(),
        }
    }
}
