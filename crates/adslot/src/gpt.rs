//! Ad server boundary
//!
//! The ad server SDK is a black box reached through [`AdServer`]. The core
//! only ever defines slots, attaches size mappings and targeting, and asks
//! for a display or a per-slot refresh.

use std::collections::BTreeMap;
use std::fmt;

use crate::sizes::{AdSize, SizeMapping, ViewportSizes};
use crate::Result;

/// Opaque ad server slot handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotHandle(pub u64);

impl fmt::Display for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// Key/values attached to a slot
pub type Targeting = BTreeMap<String, Vec<String>>;

/// Ad server SDK call surface
pub trait AdServer {
    /// `googletag.defineSlot` (or `defineOutOfPageSlot`)
    fn define_slot(&self, ad_unit: &str, sizes: &[AdSize], element_id: &str, out_of_page: bool) -> Result<SlotHandle>;

    /// `slot.defineSizeMapping`
    fn define_size_mapping(&self, slot: SlotHandle, mapping: &[ViewportSizes]);

    /// `slot.setTargeting`
    fn set_targeting(&self, slot: SlotHandle, key: &str, values: &[String]);

    /// `googletag.display`
    fn display(&self, element_id: &str);

    /// `pubads().refresh([slot, ...])`
    fn refresh(&self, slots: &[SlotHandle]);

    /// `googletag.destroySlots`
    fn destroy_slots(&self, slots: &[SlotHandle]);
}

/// Ad server form of a size mapping: the sizes passed to `defineSlot` and
/// the viewport-keyed entries passed to `defineSizeMapping`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSizeMapping {
    pub sizes: Vec<AdSize>,
    pub mapping: Vec<ViewportSizes>,
}

/// Build the ad server size mapping
pub fn build_size_mapping(sizes: &SizeMapping) -> ServerSizeMapping {
    ServerSizeMapping {
        sizes: sizes.all_sizes(),
        mapping: sizes.to_viewport_sizes(),
    }
}
