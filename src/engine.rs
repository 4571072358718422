//! Application-facing API.
//!
//! Bundles the queues, stats and round-engine role behind a narrow
//! `send`/`recv`/`get_stats`/`run_round` surface: an orchestrator
//! constructed from ports/generics that exposes a small command/tick
//! surface rather than leaking its internals.

use crate::config::LwbConfig;
use crate::frame::{data_frame_from, DataFrame, MAX_DATA_PKT_LEN};
use crate::queue::{PacketQueue, QueueError, RamQueue};
use crate::round::host::{HostRound, HostRoundOutcome};
use crate::round::source::{SourceRound, SourceRoundOutcome};
use crate::scheduler::SchedulerPolicy;
use crate::slot::SlotTransport;
use crate::stats::Stats;
use crate::sync::SyncState;
use crate::timebase::Timebase;

/// Source-side facade: the shape an application task built on top of this
/// crate actually calls into round after round.
pub struct LwbSource<const IN: usize, const OUT: usize> {
    cfg: LwbConfig,
    round: SourceRound,
    in_queue: RamQueue<IN>,
    out_queue: RamQueue<OUT>,
    stats: Stats,
    rx_timestamp_hf: u64,
}

impl<const IN: usize, const OUT: usize> LwbSource<IN, OUT> {
    pub fn start(cfg: LwbConfig, self_id: u16) -> Self {
        Self {
            round: SourceRound::new(&cfg, self_id),
            cfg,
            in_queue: RamQueue::new(),
            out_queue: RamQueue::new(),
            stats: Stats::new(),
            rx_timestamp_hf: 0,
        }
    }

    /// Enqueue `payload` for transmission on this node's next assigned
    /// slot. `payload` longer than [`MAX_DATA_PKT_LEN`] is rejected
    /// up-front rather than silently truncated.
    pub fn send(&mut self, payload: &[u8]) -> Result<(), QueueError> {
        if payload.len() > MAX_DATA_PKT_LEN {
            return Err(QueueError::Full);
        }
        self.out_queue.put(&data_frame_from(payload))
    }

    /// Dequeue the oldest received payload, if any.
    pub fn recv(&mut self) -> Option<DataFrame> {
        self.in_queue.get().ok()
    }

    pub fn rcv_buffer_count(&self) -> usize {
        self.in_queue.len()
    }

    pub fn send_buffer_count(&self) -> usize {
        self.out_queue.len()
    }

    pub fn get_stats(&self) -> Stats {
        self.stats
    }

    pub fn sync_state(&self) -> SyncState {
        self.round.sync_state()
    }

    /// Run one round; this is the only place the engine touches the
    /// transport/timebase ports.
    pub fn run_round<T: SlotTransport, C: Timebase>(
        &mut self,
        transport: &mut T,
        clock: &mut C,
    ) -> SourceRoundOutcome {
        let outcome = self.round.run_round(
            &self.cfg,
            transport,
            clock,
            &mut self.in_queue,
            &mut self.out_queue,
            &mut self.stats,
        );
        self.rx_timestamp_hf = clock.now_hf();
        outcome
    }

    /// `global_time·1e6 + (now_hf − rx_timestamp)·1e6/HF_HZ` when synced;
    /// otherwise extrapolated from the low-frequency clock alone. `hf_hz`
    /// is the caller's HF timer rate — this crate has no fixed radio clock
    /// rate of its own, the timebase is an external collaborator.
    pub fn get_timestamp_us<C: Timebase>(&self, clock: &C, hf_hz: u64) -> u64 {
        let elapsed_hf = clock.now_hf().saturating_sub(self.rx_timestamp_hf);
        if self.round.sync_state() == SyncState::Synced {
            u64::from(self.round.global_time()) * 1_000_000 + elapsed_hf * 1_000_000 / hf_hz.max(1)
        } else {
            u64::from(self.round.global_time()) * 1_000_000
        }
    }
}

/// Host-side facade wrapping [`HostRound`] with the same narrow
/// `send`/`recv`/`get_stats` surface as [`LwbSource`], plus direct access
/// to the currently broadcast schedule for diagnostics.
pub struct LwbHost<P, const IN: usize, const OUT: usize> {
    cfg: LwbConfig,
    round: HostRound<P>,
    in_queue: RamQueue<IN>,
    out_queue: RamQueue<OUT>,
    stats: Stats,
}

impl<P: SchedulerPolicy, const IN: usize, const OUT: usize> LwbHost<P, IN, OUT> {
    pub fn start(cfg: LwbConfig, policy: P, time: u32) -> Self {
        Self {
            round: HostRound::new(&cfg, policy, time),
            cfg,
            in_queue: RamQueue::new(),
            out_queue: RamQueue::new(),
            stats: Stats::new(),
        }
    }

    pub fn send(&mut self, payload: &[u8]) -> Result<(), QueueError> {
        if payload.len() > MAX_DATA_PKT_LEN {
            return Err(QueueError::Full);
        }
        self.out_queue.put(&data_frame_from(payload))
    }

    pub fn recv(&mut self) -> Option<DataFrame> {
        self.in_queue.get().ok()
    }

    pub fn rcv_buffer_count(&self) -> usize {
        self.in_queue.len()
    }

    pub fn send_buffer_count(&self) -> usize {
        self.out_queue.len()
    }

    pub fn get_stats(&self) -> Stats {
        self.stats
    }

    pub fn run_round<T: SlotTransport, C: Timebase>(
        &mut self,
        transport: &mut T,
        clock: &mut C,
    ) -> HostRoundOutcome {
        self.round.run_round(
            &self.cfg,
            transport,
            clock,
            &mut self.in_queue,
            &mut self.out_queue,
            &mut self.stats,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::StaticPolicy;
    use crate::slot::sim::SimulatedGlossy;
    use crate::timebase::sim::SimClock;

    #[test]
    fn source_send_rejects_oversized_payload() {
        let mut src: LwbSource<4, 4> = LwbSource::start(LwbConfig::default(), 3);
        let oversized = [0u8; MAX_DATA_PKT_LEN + 1];
        assert_eq!(src.send(&oversized), Err(QueueError::Full));
    }

    #[test]
    fn host_facade_runs_a_round_without_panicking() {
        let policy: StaticPolicy<8> = StaticPolicy::new();
        let mut host: LwbHost<_, 4, 4> = LwbHost::start(LwbConfig::default(), policy, 0);
        let mut clock = SimClock::new();
        let mut glossy = SimulatedGlossy::default();
        host.run_round(&mut glossy, &mut clock);
        assert_eq!(host.get_stats().pck_cnt, 0);
    }
}
