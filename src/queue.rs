//! Inbound/outbound packet queues.
//!
//! Two backing modes implement the same [`PacketQueue`] trait: a
//! synchronous in-RAM ring buffer ([`RamQueue`]) for the round-engine hot
//! path, and an external-memory-backed queue ([`XmemQueue`]) that stages
//! puts/gets through a single-outstanding-operation worker hand-off.

use crate::frame::DataFrame;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use heapless::Deque;

/// Result of a put/get on a [`PacketQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue has no room for another element.
    Full,
    /// The queue has no element to return.
    Empty,
    /// An external-memory operation is already outstanding.
    Busy,
}

/// Common contract for the inbound/outbound FIFOs, independent of backing
/// storage.
pub trait PacketQueue {
    /// Enqueue `frame`, FIFO order. Returns [`QueueError::Full`] (or
    /// [`QueueError::Busy`] for the xmem backing) without mutating state
    /// on failure.
    fn put(&mut self, frame: &DataFrame) -> Result<(), QueueError>;

    /// Dequeue the oldest frame.
    fn get(&mut self) -> Result<DataFrame, QueueError>;

    /// Number of frames currently queued.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool;
}

/// Synchronous ring-buffer backing, indexing a statically-sized arena held
/// inline. This is the only backing mode usable inside a round's real-time
/// path (the xmem mode cannot guarantee slot-deadline latency).
pub struct RamQueue<const N: usize> {
    buf: Deque<DataFrame, N>,
    drop_cnt: u32,
}

impl<const N: usize> RamQueue<N> {
    pub fn new() -> Self {
        Self {
            buf: Deque::new(),
            drop_cnt: 0,
        }
    }

    /// Number of puts rejected for lack of room since construction.
    pub fn drop_count(&self) -> u32 {
        self.drop_cnt
    }
}

impl<const N: usize> Default for RamQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PacketQueue for RamQueue<N> {
    fn put(&mut self, frame: &DataFrame) -> Result<(), QueueError> {
        self.buf.push_back(frame.clone()).map_err(|_| {
            self.drop_cnt += 1;
            QueueError::Full
        })
    }

    fn get(&mut self) -> Result<DataFrame, QueueError> {
        self.buf.pop_front().ok_or(QueueError::Empty)
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    fn is_full(&self) -> bool {
        self.buf.len() == N
    }
}

/// One request posted to the external-memory worker, expressed as an
/// owned enum rather than a raw-pointer struct so the hand-off stays in
/// safe Rust.
#[derive(Debug, Clone)]
pub enum XmemTask {
    /// Stage `frame` into external memory at logical slot `addr`.
    Write { addr: u32, frame: DataFrame },
    /// Fetch the frame staged at logical slot `addr`.
    Read { addr: u32 },
}

/// Completion signal posted back by the worker.
#[derive(Debug, Clone)]
pub enum XmemResult {
    WriteDone,
    ReadDone(DataFrame),
    Failed,
}

/// External-memory-backed queue. `put`/`get` post to a depth-1 channel and
/// return immediately; at most one operation may be outstanding at a time
/// — a second request while one is in flight returns [`QueueError::Busy`]
/// rather than blocking.
pub struct XmemQueue<const N: usize> {
    task_tx: Sender<'static, CriticalSectionRawMutex, XmemTask, 1>,
    result_rx: Receiver<'static, CriticalSectionRawMutex, XmemResult, 1>,
    outstanding: bool,
    next_addr: u32,
    pending_len: usize,
    drop_cnt: u32,
}

impl<const N: usize> XmemQueue<N> {
    /// `channel`/`results` are the depth-1 channels shared with the worker
    /// task; both must outlive the queue (hence `'static`).
    pub fn new(
        task_tx: Sender<'static, CriticalSectionRawMutex, XmemTask, 1>,
        result_rx: Receiver<'static, CriticalSectionRawMutex, XmemResult, 1>,
    ) -> Self {
        Self {
            task_tx,
            result_rx,
            outstanding: false,
            next_addr: 0,
            pending_len: 0,
            drop_cnt: 0,
        }
    }

    /// Non-blocking poll for a completed operation; the caller (round
    /// engine's preprocess window) drains this between rounds, never
    /// inside a slot deadline.
    pub fn poll_complete(&mut self) -> Option<XmemResult> {
        if !self.outstanding {
            return None;
        }
        if let Ok(result) = self.result_rx.try_receive() {
            self.outstanding = false;
            Some(result)
        } else {
            None
        }
    }

    pub fn is_busy(&self) -> bool {
        self.outstanding
    }
}

/// Provides the [`PacketQueue`] contract for the xmem backing, treating a
/// request made while one is outstanding as `Busy` and treating "posted
/// successfully" as the `Ok` case — fire-and-forget `put` semantics, with
/// the caller expected to poll for actual completion.
impl<const N: usize> PacketQueue for XmemQueue<N> {
    fn put(&mut self, frame: &DataFrame) -> Result<(), QueueError> {
        if self.outstanding {
            return Err(QueueError::Busy);
        }
        let addr = self.next_addr;
        self.task_tx
            .try_send(XmemTask::Write {
                addr,
                frame: frame.clone(),
            })
            .map_err(|_| {
                self.drop_cnt += 1;
                QueueError::Full
            })?;
        self.outstanding = true;
        self.next_addr = self.next_addr.wrapping_add(1);
        self.pending_len = self.pending_len.saturating_add(1);
        Ok(())
    }

    fn get(&mut self) -> Result<DataFrame, QueueError> {
        if self.outstanding {
            return Err(QueueError::Busy);
        }
        if self.pending_len == 0 {
            return Err(QueueError::Empty);
        }
        let addr = self.next_addr.wrapping_sub(self.pending_len as u32);
        self.task_tx
            .try_send(XmemTask::Read { addr })
            .map_err(|_| QueueError::Busy)?;
        self.outstanding = true;
        // The actual bytes arrive later via `poll_complete`; callers that
        // need synchronous semantics should prefer `RamQueue`.
        Err(QueueError::Busy)
    }

    fn len(&self) -> usize {
        self.pending_len
    }

    fn is_full(&self) -> bool {
        self.pending_len >= N
    }
}

/// Depth-1 channel pair backing one [`XmemQueue`] and its worker.
pub type XmemChannel = Channel<CriticalSectionRawMutex, XmemTask, 1>;
pub type XmemResultChannel = Channel<CriticalSectionRawMutex, XmemResult, 1>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::data_frame_from;

    #[test]
    fn fifo_ordering_is_preserved() {
        let mut q: RamQueue<4> = RamQueue::new();
        q.put(&data_frame_from(b"a")).unwrap();
        q.put(&data_frame_from(b"b")).unwrap();
        assert_eq!(&q.get().unwrap()[..], b"a");
        assert_eq!(&q.get().unwrap()[..], b"b");
    }

    #[test]
    fn full_queue_rejects_and_counts_drop() {
        let mut q: RamQueue<2> = RamQueue::new();
        q.put(&data_frame_from(b"a")).unwrap();
        q.put(&data_frame_from(b"b")).unwrap();
        assert_eq!(q.put(&data_frame_from(b"c")), Err(QueueError::Full));
        assert_eq!(q.drop_count(), 1);
    }

    #[test]
    fn empty_queue_returns_empty_error() {
        let mut q: RamQueue<2> = RamQueue::new();
        assert_eq!(q.get(), Err(QueueError::Empty));
    }

    #[test]
    fn is_full_reflects_capacity() {
        let mut q: RamQueue<1> = RamQueue::new();
        assert!(!q.is_full());
        q.put(&data_frame_from(b"x")).unwrap();
        assert!(q.is_full());
    }
}
