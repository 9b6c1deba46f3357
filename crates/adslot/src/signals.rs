//! Third-party signal queue
//!
//! The viewability / brand-safety vendor is driven through a typed outbound
//! queue: the core pushes a [`SignalRequest`] carrying its own reply
//! channel and races the reply against a timer. The vendor adapter owns the
//! receiving end. A reply that arrives after the timer lands on a closed
//! channel and is dropped.

use std::time::Duration;

use smol::channel::{Receiver, Sender};

use crate::gpt::Targeting;

/// One request for slot targeting
#[derive(Debug)]
pub struct SignalRequest {
    pub slot_id: String,
    pub ad_unit: String,
    pub reply: Sender<Targeting>,
}

impl SignalRequest {
    /// Answer the request. Returns false when the requester gave up.
    pub fn respond(self, targeting: Targeting) -> bool {
        self.reply.try_send(targeting).is_ok()
    }
}

/// Core side of the signal queue
#[derive(Debug, Clone)]
pub struct SignalClient {
    tx: Sender<SignalRequest>,
    timeout: Duration,
}

/// Create a signal queue. The receiver goes to the vendor adapter.
pub fn signal_queue(timeout: Duration) -> (SignalClient, Receiver<SignalRequest>) {
    let (tx, rx) = smol::channel::unbounded();
    (SignalClient { tx, timeout }, rx)
}

impl SignalClient {
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ask the vendor for slot targeting. Resolves with `None` when the
    /// vendor is gone or does not answer within the timeout.
    pub async fn request(&self, slot_id: &str, ad_unit: &str) -> Option<Targeting> {
        let (reply, replies) = smol::channel::bounded(1);
        let request = SignalRequest {
            slot_id: slot_id.to_string(),
            ad_unit: ad_unit.to_string(),
            reply,
        };
        if self.tx.try_send(request).is_err() {
            tracing::warn!(slot_id, "signal vendor is not listening");
            return None;
        }

        let timeout = self.timeout;
        smol::future::or(async { replies.recv().await.ok() }, async {
            smol::Timer::after(timeout).await;
            tracing::warn!(slot_id, ?timeout, "third-party signal timed out");
            None
        })
        .await
    }
}
