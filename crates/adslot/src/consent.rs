//! Consent
//!
//! Third-party signals and header bidding only run for vendors the reader
//! consented to. The consent platform itself is outside this crate; it
//! hands over a resolved [`ConsentState`].

use std::collections::BTreeSet;

use smol::future::{BoxedLocal, FutureExt};

/// Vendors gated by consent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Vendor {
    Prebid,
    A9,
    /// Viewability / brand-safety signal vendor
    Ias,
    Googletag,
}

impl Vendor {
    pub fn as_str(self) -> &'static str {
        match self {
            Vendor::Prebid => "prebid",
            Vendor::A9 => "a9",
            Vendor::Ias => "ias",
            Vendor::Googletag => "googletag",
        }
    }
}

/// Consent framework the reader answered under
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentFramework {
    /// Per-vendor consents
    Tcfv2 { vendor_consents: BTreeSet<Vendor> },
    /// Opt-out model
    Usnat { do_not_sell: bool },
    Aus { personalised_advertising: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentState {
    pub framework: ConsentFramework,
}

impl ConsentState {
    /// Consent to every vendor under TCF
    pub fn all_granted() -> Self {
        Self {
            framework: ConsentFramework::Tcfv2 {
                vendor_consents: [Vendor::Prebid, Vendor::A9, Vendor::Ias, Vendor::Googletag].into(),
            },
        }
    }

    pub fn none_granted() -> Self {
        Self {
            framework: ConsentFramework::Tcfv2 { vendor_consents: BTreeSet::new() },
        }
    }
}

/// Whether `vendor` may run under `state`
pub fn get_consent_for(vendor: Vendor, state: &ConsentState) -> bool {
    match &state.framework {
        ConsentFramework::Tcfv2 { vendor_consents } => vendor_consents.contains(&vendor),
        ConsentFramework::Usnat { do_not_sell } => !do_not_sell,
        ConsentFramework::Aus { personalised_advertising } => *personalised_advertising,
    }
}

/// Source of the reader's consent
pub trait ConsentProvider {
    /// Resolves once the reader's choice is known
    fn on_consent(&self) -> BoxedLocal<ConsentState>;
}

/// Provider with a consent state known up front
#[derive(Debug, Clone)]
pub struct StaticConsent(pub ConsentState);

impl ConsentProvider for StaticConsent {
    fn on_consent(&self) -> BoxedLocal<ConsentState> {
        let state = self.0.clone();
        async move { state }.boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcf_is_per_vendor() {
        let state = ConsentState {
            framework: ConsentFramework::Tcfv2 { vendor_consents: [Vendor::Prebid].into() },
        };
        assert!(get_consent_for(Vendor::Prebid, &state));
        assert!(!get_consent_for(Vendor::A9, &state));
    }

    #[test]
    fn test_opt_out_frameworks() {
        let usnat = ConsentState { framework: ConsentFramework::Usnat { do_not_sell: true } };
        assert!(!get_consent_for(Vendor::Ias, &usnat));

        let aus = ConsentState { framework: ConsentFramework::Aus { personalised_advertising: true } };
        assert!(get_consent_for(Vendor::Ias, &aus));
    }

    #[test]
    fn test_static_provider_resolves() {
        let provider = StaticConsent(ConsentState::none_granted());
        let state = smol::block_on(provider.on_consent());
        assert!(!get_consent_for(Vendor::Googletag, &state));
    }
}
