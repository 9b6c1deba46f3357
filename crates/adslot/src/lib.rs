//! adslot - Ad slot lifecycle
//!
//! Decides where ads go on a page, when they load and how they stay
//! consistent while the page changes underneath them.
//!
//! # Pieces
//! - [`spacefinder`] finds room for ads in a content body
//! - [`slot`] builds slot elements, [`registry`] tracks the adverts
//! - [`define`], [`header_bidding`] and [`display`] take an advert from
//!   definition through bidding to the ad server
//! - [`lazy_load`] and [`refresh`] schedule loads and refreshes
//! - [`liveblog`] keeps placing ads as a liveblog grows
//!
//! Everything runs on one thread. Shared state lives in an [`AdContext`]
//! whose executor the embedder drives.
//!
//! # Example
//! ```rust,ignore
//! let ex = Rc::new(LocalExecutor::new());
//! let ctx = AdContext::builder(document, ad_server).executor(ex.clone()).build();
//! let page = smol::block_on(ex.run(adslot::init_page(&ctx)))?;
//! ```

mod error;

pub mod advert;
pub mod article;
pub mod completion;
pub mod config;
pub mod consent;
pub mod context;
pub mod define;
pub mod display;
pub mod fixed_slots;
pub mod frame;
pub mod gpt;
pub mod header_bidding;
pub mod lazy_load;
pub mod lifecycle;
pub mod liveblog;
pub mod memo;
pub mod refresh;
pub mod registry;
pub mod signals;
pub mod sizes;
pub mod slot;
pub mod spacefinder;

pub use advert::Advert;
pub use completion::{completion, Completion, CompletionTrigger};
pub use config::Config;
pub use consent::{get_consent_for, ConsentProvider, ConsentState, StaticConsent, Vendor};
pub use context::{AdContext, AdContextBuilder};
pub use define::{create_advert, define_slot, DefinedSlot};
pub use display::{display_ad, load_advert, refresh_advert};
pub use error::{AdError, Result};
pub use frame::{FrameScheduler, FrameStats};
pub use gpt::{AdServer, SlotHandle, Targeting};
pub use header_bidding::{request_bids, BidOutcome, BidPartner, BidReport, BidSlot, SizeFilter};
pub use lazy_load::enable_lazy_load;
pub use lifecycle::{
    add_slot, collapse_slot, fill_advert_slots, init_page, on_slot_render_ended, on_slot_viewable, PageAdverts,
    SlotRenderEnded,
};
pub use liveblog::{init_liveblog, LiveblogInserter};
pub use memo::Memo;
pub use refresh::should_refresh;
pub use registry::AdvertRegistry;
pub use signals::{signal_queue, SignalClient, SignalRequest};
pub use sizes::{AdSize, Breakpoint, SizeMapping};
pub use slot::{create_ad_slot, wrap_slot_in_container, CreateSlotOptions, SlotKind};
pub use spacefinder::{find_space, SpacefinderItem, SpacefinderRules};

pub use adslot_dom as dom;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
