//! Completion signal
//!
//! A one-shot "done" broadcast with any number of waiters, built on a
//! channel that is never sent on: dropping the trigger closes the channel
//! and wakes every waiter. Used for slot readiness and in-flight bid
//! requests, which several tasks may await.

use smol::channel::{Receiver, Sender};

/// Awaitable side, cheap to clone
#[derive(Debug, Clone)]
pub struct Completion {
    rx: Receiver<()>,
}

/// Completing side. Completes when consumed or dropped.
#[derive(Debug)]
pub struct CompletionTrigger {
    _tx: Sender<()>,
}

/// Create a pending completion and its trigger
pub fn completion() -> (CompletionTrigger, Completion) {
    let (tx, rx) = smol::channel::bounded(1);
    (CompletionTrigger { _tx: tx }, Completion { rx })
}

impl Completion {
    /// An already completed signal
    pub fn done() -> Self {
        let (trigger, completion) = completion();
        trigger.complete();
        completion
    }

    pub fn is_complete(&self) -> bool {
        self.rx.is_closed()
    }

    /// Wait until the trigger completes
    pub async fn wait(&self) {
        // Nothing is ever sent; recv returns once the channel closes
        let _ = self.rx.recv().await;
    }
}

impl CompletionTrigger {
    pub fn complete(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_waiters_wake() {
        let (trigger, done) = completion();
        let other = done.clone();
        assert!(!done.is_complete());

        let ex = smol::LocalExecutor::new();
        let a = ex.spawn(async move { done.wait().await });
        let b = ex.spawn(async move { other.wait().await });

        smol::block_on(ex.run(async {
            smol::future::yield_now().await;
            trigger.complete();
            a.await;
            b.await;
        }));
    }

    #[test]
    fn test_done_is_complete() {
        let done = Completion::done();
        assert!(done.is_complete());
        smol::block_on(done.wait());
    }
}
