//! Error types

use adslot_dom::DomError;

pub type Result<T> = std::result::Result<T, AdError>;

/// Ad slot error
#[derive(Debug, thiserror::Error)]
pub enum AdError {
    #[error("Tried to render ad slot '{name}' without any size mappings")]
    MissingSizeMapping { name: String },

    #[error("advert '{id}' is already registered")]
    DuplicateAdvert { id: String },

    #[error("no advert registered for '{id}'")]
    UnknownAdvert { id: String },

    #[error("ad slot node has no id")]
    MissingSlotId,

    #[error("unknown slot kind '{0}'")]
    UnknownSlotKind(String),

    #[error("invalid ad size '{0}'")]
    InvalidSize(String),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("ad server error: {0}")]
    AdServer(String),

    #[error("bid partner '{partner}' failed: {reason}")]
    BidPartner { partner: String, reason: String },

    #[error("frame scheduler dropped a queued job")]
    FrameDropped,

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}
