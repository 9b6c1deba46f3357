//! Ad sizes and size mappings
//!
//! A size mapping says which creative sizes a slot accepts at each
//! breakpoint. The ad server receives it as viewport-width keyed entries;
//! the refresh coordinator uses the matching breakpoint to decide whether
//! a resize changed what a slot may show.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{AdError, Result};

/// Creative size in CSS pixels. `0x0` is the "fluid" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdSize {
    pub width: u32,
    pub height: u32,
}

impl AdSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const FLUID: AdSize = AdSize::new(0, 0);
    pub const OUT_OF_PAGE: AdSize = AdSize::new(1, 1);
    pub const EMPTY: AdSize = AdSize::new(2, 2);
    pub const MPU: AdSize = AdSize::new(300, 250);
    pub const HALF_PAGE: AdSize = AdSize::new(300, 600);
    pub const PORTRAIT: AdSize = AdSize::new(300, 1050);
    pub const SKYSCRAPER: AdSize = AdSize::new(160, 600);
    pub const LEADERBOARD: AdSize = AdSize::new(728, 90);
    pub const BILLBOARD: AdSize = AdSize::new(970, 250);
    pub const CASCADE: AdSize = AdSize::new(940, 230);
    pub const FABRIC: AdSize = AdSize::new(900, 250);
    pub const OUTSTREAM_DESKTOP: AdSize = AdSize::new(620, 350);
    pub const OUTSTREAM_GOOGLE_DESKTOP: AdSize = AdSize::new(550, 310);
    pub const OUTSTREAM_MOBILE: AdSize = AdSize::new(300, 197);
    pub const MOBILE_STICKY: AdSize = AdSize::new(320, 50);
    pub const GOOGLE_CARD: AdSize = AdSize::new(300, 274);
    pub const PORTRAIT_INTERSTITIAL: AdSize = AdSize::new(320, 480);
    pub const MERCHANDISING_HIGH: AdSize = AdSize::new(88, 87);
    pub const MERCHANDISING: AdSize = AdSize::new(88, 88);

    pub fn is_fluid(&self) -> bool {
        *self == AdSize::FLUID
    }

    /// Video formats that play once and must not be replaced mid-view
    pub fn is_outstream(&self) -> bool {
        matches!(
            *self,
            AdSize::OUTSTREAM_DESKTOP | AdSize::OUTSTREAM_GOOGLE_DESKTOP | AdSize::OUTSTREAM_MOBILE
        )
    }

    /// Sizes that only exist for the ad server's own bookkeeping
    pub fn is_proxy(&self) -> bool {
        self.is_fluid() || *self == AdSize::OUT_OF_PAGE || *self == AdSize::EMPTY
    }
}

impl fmt::Display for AdSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fluid() {
            write!(f, "fluid")
        } else {
            write!(f, "{},{}", self.width, self.height)
        }
    }
}

impl FromStr for AdSize {
    type Err = AdError;

    /// `"300,250"` or `"fluid"`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "fluid" {
            return Ok(AdSize::FLUID);
        }
        let (w, h) = s.split_once(',').ok_or_else(|| AdError::InvalidSize(s.to_string()))?;
        let width = w.trim().parse().map_err(|_| AdError::InvalidSize(s.to_string()))?;
        let height = h.trim().parse().map_err(|_| AdError::InvalidSize(s.to_string()))?;
        Ok(AdSize::new(width, height))
    }
}

/// Named responsive breakpoints, ordered by minimum width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Breakpoint {
    Mobile,
    MobileMedium,
    MobileLandscape,
    Phablet,
    Tablet,
    Desktop,
    LeftCol,
    Wide,
}

impl Breakpoint {
    pub const ALL: [Breakpoint; 8] = [
        Breakpoint::Mobile,
        Breakpoint::MobileMedium,
        Breakpoint::MobileLandscape,
        Breakpoint::Phablet,
        Breakpoint::Tablet,
        Breakpoint::Desktop,
        Breakpoint::LeftCol,
        Breakpoint::Wide,
    ];

    pub fn min_width(self) -> u32 {
        match self {
            Breakpoint::Mobile => 0,
            Breakpoint::MobileMedium => 375,
            Breakpoint::MobileLandscape => 480,
            Breakpoint::Phablet => 660,
            Breakpoint::Tablet => 740,
            Breakpoint::Desktop => 980,
            Breakpoint::LeftCol => 1140,
            Breakpoint::Wide => 1300,
        }
    }

    /// Name used in `data-{name}` size attributes
    pub fn name(self) -> &'static str {
        match self {
            Breakpoint::Mobile => "mobile",
            Breakpoint::MobileMedium => "mobile-medium",
            Breakpoint::MobileLandscape => "mobile-landscape",
            Breakpoint::Phablet => "phablet",
            Breakpoint::Tablet => "tablet",
            Breakpoint::Desktop => "desktop",
            Breakpoint::LeftCol => "left-col",
            Breakpoint::Wide => "wide",
        }
    }

    /// Breakpoint a viewport of this width falls into
    pub fn for_width(width: f64) -> Breakpoint {
        Breakpoint::ALL
            .iter()
            .rev()
            .copied()
            .find(|bp| f64::from(bp.min_width()) <= width)
            .unwrap_or(Breakpoint::Mobile)
    }

    pub fn is_desktop_or_wider(self) -> bool {
        self >= Breakpoint::Desktop
    }
}

/// Breakpoint -> accepted sizes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeMapping {
    sizes: BTreeMap<Breakpoint, Vec<AdSize>>,
}

/// One ad server size mapping entry: at viewports at least this wide, use
/// these sizes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewportSizes {
    pub viewport: (u32, u32),
    pub sizes: Vec<AdSize>,
}

impl SizeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, breakpoint: Breakpoint, sizes: &[AdSize]) -> Self {
        self.add(breakpoint, sizes);
        self
    }

    /// Add sizes to a breakpoint, skipping duplicates
    pub fn add(&mut self, breakpoint: Breakpoint, sizes: &[AdSize]) {
        let entry = self.sizes.entry(breakpoint).or_default();
        for size in sizes {
            if !entry.contains(size) {
                entry.push(*size);
            }
        }
    }

    /// Union with another mapping
    pub fn merge(&mut self, other: &SizeMapping) {
        for (bp, sizes) in &other.sizes {
            self.add(*bp, sizes);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.values().all(Vec::is_empty)
    }

    pub fn get(&self, breakpoint: Breakpoint) -> Option<&[AdSize]> {
        self.sizes.get(&breakpoint).map(Vec::as_slice)
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = Breakpoint> + '_ {
        self.sizes.keys().copied()
    }

    /// The mapping bucket that applies at this viewport width: the widest
    /// mapped breakpoint whose minimum width fits
    pub fn matching_breakpoint(&self, width: f64) -> Option<Breakpoint> {
        self.sizes
            .keys()
            .rev()
            .copied()
            .find(|bp| f64::from(bp.min_width()) <= width)
    }

    /// Sizes in force at this viewport width
    pub fn sizes_for_width(&self, width: f64) -> &[AdSize] {
        self.matching_breakpoint(width)
            .and_then(|bp| self.get(bp))
            .unwrap_or(&[])
    }

    /// Every distinct size across breakpoints, in first-seen order
    pub fn all_sizes(&self) -> Vec<AdSize> {
        let mut all = Vec::new();
        for size in self.sizes.values().flatten() {
            if !all.contains(size) {
                all.push(*size);
            }
        }
        all
    }

    /// Ad server form: one entry per breakpoint, widest first
    pub fn to_viewport_sizes(&self) -> Vec<ViewportSizes> {
        self.sizes
            .iter()
            .rev()
            .map(|(bp, sizes)| ViewportSizes {
                viewport: (bp.min_width(), 0),
                sizes: sizes.clone(),
            })
            .collect()
    }

    /// Read `data-{breakpoint}="300,250|fluid"` attributes
    pub fn from_attributes<'a>(attr: impl Fn(&str) -> Option<&'a str>) -> Result<Self> {
        let mut mapping = SizeMapping::new();
        for bp in Breakpoint::ALL {
            let Some(value) = attr(&format!("data-{}", bp.name())) else {
                continue;
            };
            let sizes = value
                .split('|')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect::<Result<Vec<AdSize>>>()?;
            mapping.add(bp, &sizes);
        }
        Ok(mapping)
    }
}

/// Default mapping for a logical slot name. Numbered slots share their
/// family's mapping: `inline3` uses `inline`, `fronts-banner-2` uses
/// `fronts-banner`.
pub fn slot_size_mapping(name: &str) -> Option<SizeMapping> {
    use Breakpoint::*;

    let family = name.trim_end_matches(|c: char| c.is_ascii_digit()).trim_end_matches('-');
    let family = if family.starts_with("inline") { "inline" } else { family };

    let mapping = match family {
        "right" => SizeMapping::new().with(
            Mobile,
            &[AdSize::OUT_OF_PAGE, AdSize::EMPTY, AdSize::MPU, AdSize::HALF_PAGE, AdSize::FLUID],
        ),
        "top-above-nav" => SizeMapping::new()
            .with(Tablet, &[AdSize::OUT_OF_PAGE, AdSize::EMPTY, AdSize::FABRIC, AdSize::FLUID, AdSize::LEADERBOARD])
            .with(
                Desktop,
                &[
                    AdSize::OUT_OF_PAGE,
                    AdSize::EMPTY,
                    AdSize::LEADERBOARD,
                    AdSize::CASCADE,
                    AdSize::FABRIC,
                    AdSize::BILLBOARD,
                    AdSize::FLUID,
                ],
            ),
        "inline" => SizeMapping::new()
            .with(
                Mobile,
                &[
                    AdSize::OUT_OF_PAGE,
                    AdSize::EMPTY,
                    AdSize::OUTSTREAM_MOBILE,
                    AdSize::MPU,
                    AdSize::GOOGLE_CARD,
                    AdSize::PORTRAIT_INTERSTITIAL,
                    AdSize::FLUID,
                ],
            )
            .with(
                Phablet,
                &[
                    AdSize::OUT_OF_PAGE,
                    AdSize::EMPTY,
                    AdSize::OUTSTREAM_MOBILE,
                    AdSize::OUTSTREAM_DESKTOP,
                    AdSize::OUTSTREAM_GOOGLE_DESKTOP,
                    AdSize::MPU,
                    AdSize::GOOGLE_CARD,
                    AdSize::FLUID,
                ],
            )
            .with(
                Desktop,
                &[
                    AdSize::OUT_OF_PAGE,
                    AdSize::EMPTY,
                    AdSize::MPU,
                    AdSize::GOOGLE_CARD,
                    AdSize::FLUID,
                ],
            ),
        "liveblog-inline" => SizeMapping::new()
            .with(Mobile, &[AdSize::OUT_OF_PAGE, AdSize::EMPTY, AdSize::MPU, AdSize::FLUID])
            .with(
                Tablet,
                &[AdSize::OUT_OF_PAGE, AdSize::EMPTY, AdSize::MPU, AdSize::OUTSTREAM_DESKTOP, AdSize::FLUID],
            ),
        "mostpop" => SizeMapping::new()
            .with(Mobile, &[AdSize::OUT_OF_PAGE, AdSize::EMPTY, AdSize::MPU, AdSize::FLUID])
            .with(
                Tablet,
                &[AdSize::OUT_OF_PAGE, AdSize::EMPTY, AdSize::MPU, AdSize::LEADERBOARD, AdSize::FLUID],
            ),
        "comments" => SizeMapping::new().with(
            Mobile,
            &[AdSize::OUT_OF_PAGE, AdSize::EMPTY, AdSize::MPU, AdSize::SKYSCRAPER, AdSize::HALF_PAGE, AdSize::FLUID],
        ),
        "mobile-sticky" => SizeMapping::new().with(Mobile, &[AdSize::MOBILE_STICKY]),
        "merchandising-high" => SizeMapping::new().with(
            Mobile,
            &[AdSize::OUT_OF_PAGE, AdSize::EMPTY, AdSize::MERCHANDISING_HIGH, AdSize::FLUID],
        ),
        "merchandising" => SizeMapping::new().with(
            Mobile,
            &[AdSize::OUT_OF_PAGE, AdSize::EMPTY, AdSize::MERCHANDISING, AdSize::FLUID],
        ),
        "fronts-banner" => SizeMapping::new().with(
            Desktop,
            &[AdSize::OUT_OF_PAGE, AdSize::EMPTY, AdSize::BILLBOARD, AdSize::FLUID],
        ),
        "article-end" => SizeMapping::new().with(
            Mobile,
            &[AdSize::OUT_OF_PAGE, AdSize::EMPTY, AdSize::FLUID],
        ),
        "survey" => SizeMapping::new().with(Desktop, &[AdSize::OUT_OF_PAGE]),
        _ => return None,
    };
    Some(mapping)
}
