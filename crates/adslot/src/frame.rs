//! Frame Scheduler
//!
//! Batches DOM reads and writes into frames. Within a frame every queued
//! measurement runs before any queued mutation, so a layout scan never
//! observes a half-mutated page and mutations never force a layout between
//! reads. Writes queued while the write phase runs wait for the next frame.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use smol::channel::{Receiver, Sender};

use crate::{AdError, Result};

type Job = Box<dyn FnOnce()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Measure,
    Mutate,
}

#[derive(Default)]
struct Queues {
    reads: VecDeque<Job>,
    writes: VecDeque<Job>,
    frames: u64,
    wake_pending: bool,
}

/// What one flushed frame did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub reads: usize,
    pub writes: usize,
}

/// Read/write batching scheduler, cheap to clone
#[derive(Clone)]
pub struct FrameScheduler {
    queues: Rc<RefCell<Queues>>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let q = self.queues.borrow();
        f.debug_struct("FrameScheduler")
            .field("reads", &q.reads.len())
            .field("writes", &q.writes.len())
            .field("frames", &q.frames)
            .finish()
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = smol::channel::unbounded();
        Self {
            queues: Rc::new(RefCell::new(Queues::default())),
            wake_tx,
            wake_rx,
        }
    }

    /// Queue a read for the next frame
    pub fn measure<T, F>(&self, f: F) -> impl Future<Output = Result<T>> + 'static
    where
        T: 'static,
        F: FnOnce() -> T + 'static,
    {
        self.schedule(Phase::Measure, f)
    }

    /// Queue a write for the next frame, after all of that frame's reads
    pub fn mutate<T, F>(&self, f: F) -> impl Future<Output = Result<T>> + 'static
    where
        T: 'static,
        F: FnOnce() -> T + 'static,
    {
        self.schedule(Phase::Mutate, f)
    }

    fn schedule<T, F>(&self, phase: Phase, f: F) -> impl Future<Output = Result<T>> + 'static
    where
        T: 'static,
        F: FnOnce() -> T + 'static,
    {
        let (tx, rx) = smol::channel::bounded(1);
        let job: Job = Box::new(move || {
            // The waiter may have been dropped; the job still ran
            let _ = tx.try_send(f());
        });

        {
            let mut q = self.queues.borrow_mut();
            match phase {
                Phase::Measure => q.reads.push_back(job),
                Phase::Mutate => q.writes.push_back(job),
            }
            self.request_frame(&mut q);
        }

        async move { rx.recv().await.map_err(|_| AdError::FrameDropped) }
    }

    fn request_frame(&self, q: &mut Queues) {
        if !q.wake_pending {
            q.wake_pending = true;
            let _ = self.wake_tx.try_send(());
        }
    }

    /// Jobs waiting for the next frame as `(reads, writes)`
    pub fn pending(&self) -> (usize, usize) {
        let q = self.queues.borrow();
        (q.reads.len(), q.writes.len())
    }

    /// Run one frame now: all reads (including reads queued by reads),
    /// then the writes that were queued when the write phase began.
    pub fn flush(&self) -> FrameStats {
        let frame = {
            let mut q = self.queues.borrow_mut();
            q.wake_pending = false;
            q.frames += 1;
            q.frames
        };

        let mut reads = 0;
        loop {
            let job = self.queues.borrow_mut().reads.pop_front();
            let Some(job) = job else { break };
            job();
            reads += 1;
        }

        let writes = std::mem::take(&mut self.queues.borrow_mut().writes);
        let write_count = writes.len();
        for job in writes {
            job();
        }

        {
            let mut q = self.queues.borrow_mut();
            if !q.reads.is_empty() || !q.writes.is_empty() {
                self.request_frame(&mut q);
            }
        }

        if reads + write_count > 0 {
            tracing::debug!(frame, reads, writes = write_count, "frame flushed");
        }
        FrameStats { frame, reads, writes: write_count }
    }

    /// Drive frames forever: wait for work, wait one frame interval so
    /// more work can batch up, then flush.
    pub async fn run(self, interval: Duration) {
        while self.wake_rx.recv().await.is_ok() {
            if interval.is_zero() {
                smol::future::yield_now().await;
            } else {
                smol::Timer::after(interval).await;
            }
            self.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_reads_run_before_writes() {
        let frame = FrameScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        let w1 = frame.mutate(move || l.borrow_mut().push("write 1"));
        let l = log.clone();
        let r1 = frame.measure(move || l.borrow_mut().push("read 1"));
        let l = log.clone();
        let w2 = frame.mutate(move || l.borrow_mut().push("write 2"));
        let l = log.clone();
        let r2 = frame.measure(move || l.borrow_mut().push("read 2"));

        assert_eq!(frame.pending(), (2, 2));
        let stats = frame.flush();
        assert_eq!(stats.reads, 2);
        assert_eq!(stats.writes, 2);
        assert_eq!(*log.borrow(), vec!["read 1", "read 2", "write 1", "write 2"]);

        smol::block_on(async {
            r1.await.unwrap();
            r2.await.unwrap();
            w1.await.unwrap();
            w2.await.unwrap();
        });
    }

    #[test]
    fn test_write_queued_by_write_waits_a_frame() {
        let frame = FrameScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let (f, l) = (frame.clone(), log.clone());
        let _outer = frame.mutate(move || {
            l.borrow_mut().push("outer");
            let l2 = l.clone();
            std::mem::drop(f.mutate(move || l2.borrow_mut().push("inner")));
        });

        frame.flush();
        assert_eq!(*log.borrow(), vec!["outer"]);
        assert_eq!(frame.pending(), (0, 1));
        frame.flush();
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_measure_returns_value_through_driver() {
        let ex = smol::LocalExecutor::new();
        let frame = FrameScheduler::new();
        ex.spawn(frame.clone().run(Duration::ZERO)).detach();

        let value = smol::block_on(ex.run(async { frame.measure(|| 40 + 2).await }));
        assert_eq!(value.unwrap(), 42);
    }

    #[test]
    fn test_dropped_scheduler_reports_dropped_job() {
        let frame = FrameScheduler::new();
        let pending = frame.measure(|| 1);
        drop(frame);
        assert!(matches!(smol::block_on(pending), Err(AdError::FrameDropped)));
    }
}
