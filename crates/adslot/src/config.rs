//! Configuration
//!
//! Page and switch configuration handed over by the page bootstrap,
//! usually as JSON. Every field has a default so partial documents work.

use std::time::Duration;

use serde::Deserialize;

use crate::Result;

/// Full adslot configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ad unit path passed to `defineSlot`
    pub ad_unit: String,
    pub page: PageConfig,
    pub switches: Switches,
    pub timeouts: Timeouts,
    pub lazy_load: LazyLoadConfig,
    pub liveblog: LiveblogConfig,
    pub article: ArticleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ad_unit: "/59666047/theguardian.com".to_string(),
            page: PageConfig::default(),
            switches: Switches::default(),
            timeouts: Timeouts::default(),
            lazy_load: LazyLoadConfig::default(),
            liveblog: LiveblogConfig::default(),
            article: ArticleConfig::default(),
        }
    }
}

impl Config {
    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Facts about the page being rendered
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// A pageskin campaign owns the page; no advert may refresh
    pub has_page_skin: bool,
    pub is_paid_content: bool,
    pub is_liveblog: bool,
    /// Line items whose creatives must stay on the page once served
    pub non_refreshable_line_item_ids: Vec<u64>,
}

/// Feature switches
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Switches {
    pub lazy_load: bool,
    pub prebid: bool,
    pub a9: bool,
    /// Viewability / brand-safety signal vendor
    pub third_party_signals: bool,
    pub liveblog_ads: bool,
    pub refresh_on_resize: bool,
    pub viewable_refresh: bool,
    pub mobile_sticky: bool,
}

impl Default for Switches {
    fn default() -> Self {
        Self {
            lazy_load: true,
            prebid: true,
            a9: true,
            third_party_signals: true,
            liveblog_ads: true,
            refresh_on_resize: true,
            viewable_refresh: true,
            mobile_sticky: false,
        }
    }
}

/// Timeouts and intervals in milliseconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// How long slot readiness waits for the signal vendor
    pub third_party_signal_ms: u64,
    /// Per-partner header bidding budget
    pub bid_partner_ms: u64,
    pub resize_debounce_ms: u64,
    /// Time a slot must have been viewable before it refreshes
    pub viewable_refresh_ms: u64,
    /// Batching interval of the frame scheduler
    pub frame_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            third_party_signal_ms: 1000,
            bid_partner_ms: 1500,
            resize_debounce_ms: 100,
            viewable_refresh_ms: 30_000,
            frame_interval_ms: 16,
        }
    }
}

impl Timeouts {
    pub fn third_party_signal(&self) -> Duration {
        Duration::from_millis(self.third_party_signal_ms)
    }

    pub fn bid_partner(&self) -> Duration {
        Duration::from_millis(self.bid_partner_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn viewable_refresh(&self) -> Duration {
        Duration::from_millis(self.viewable_refresh_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Lazy loading margin experiment variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LazyLoadVariant {
    #[default]
    Control,
    Percent10,
    Percent15,
}

impl LazyLoadVariant {
    /// Observer root margin for this variant
    pub fn root_margin(self) -> &'static str {
        match self {
            LazyLoadVariant::Control => "20% 0px",
            LazyLoadVariant::Percent10 => "10% 0px",
            LazyLoadVariant::Percent15 => "15% 0px",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LazyLoadConfig {
    pub variant: LazyLoadVariant,
}

/// Liveblog inline ad limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiveblogConfig {
    pub max_ads: usize,
    /// Gap above the first ad, in viewport heights
    pub first_ad_multiplier: f64,
    /// Gap between consecutive ads, in viewport heights
    pub between_ads_multiplier: f64,
}

impl Default for LiveblogConfig {
    fn default() -> Self {
        Self {
            max_ads: 8,
            first_ad_multiplier: 1.5,
            between_ads_multiplier: 1.0,
        }
    }
}

/// Article body inline ad limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArticleConfig {
    pub max_inline_ads_mobile: usize,
    pub max_inline_ads_desktop: usize,
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            max_inline_ads_mobile: 8,
            max_inline_ads_desktop: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(
            r#"{
                "page": { "has_page_skin": true, "non_refreshable_line_item_ids": [123] },
                "lazy_load": { "variant": "percent-10" },
                "timeouts": { "bid_partner_ms": 800 }
            }"#,
        )
        .unwrap();

        assert!(config.page.has_page_skin);
        assert_eq!(config.page.non_refreshable_line_item_ids, vec![123]);
        assert_eq!(config.lazy_load.variant.root_margin(), "10% 0px");
        assert_eq!(config.timeouts.bid_partner_ms, 800);
        assert_eq!(config.timeouts.third_party_signal_ms, 1000);
        assert_eq!(config.liveblog.max_ads, 8);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(Config::from_json("{"), Err(crate::AdError::Config(_))));
    }
}
