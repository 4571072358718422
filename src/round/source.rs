//! Round engine — source role.
//!
//! One round: bootstrap loop, schedule receive + sync FSM transition, time
//! recovery (drift EWMA on the first schedule of a round), slot
//! participation gated on `Synced`, contention, second-schedule handshake,
//! idle-round bookkeeping, inter-round sleep.

use crate::config::LwbConfig;
use crate::frame::WireFrame;
use crate::queue::PacketQueue;
use crate::schedule::Schedule;
use crate::slot::{SlotInfo, SlotTransport};
use crate::stats::Stats;
use crate::sync::{SyncEvent, SyncFsm, SyncState};
use crate::timebase::{hf_to_lf, Timebase};
use log::{info, warn};

/// What happened during one call to [`SourceRound::run_round`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRoundOutcome {
    /// Still bootstrapping; no schedule captured this call.
    StillBootstrapping,
    /// Schedule received and (if synced) slots serviced.
    Serviced { synced: bool },
    /// Schedule missed; sync state advanced per the transition table.
    Missed { new_state: SyncState },
}

/// Per-source round engine state carried across rounds.
pub struct SourceRound {
    self_id: u16,
    sync: SyncFsm,
    global_time: u32,
    last_synced_lf: u64,
    last_was_data_round: bool,
    period_idle: u16,
}

impl SourceRound {
    pub fn new(cfg: &LwbConfig, self_id: u16) -> Self {
        Self {
            self_id,
            sync: SyncFsm::new(cfg.t_guard_hf, cfg.t_guard_1_hf, cfg.t_guard_2_hf),
            global_time: 0,
            last_synced_lf: 0,
            last_was_data_round: false,
            period_idle: cfg.sched_period_idle,
        }
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    /// Host's global time, seconds, as of the last successfully received
    /// schedule.
    pub fn global_time(&self) -> u32 {
        self.global_time
    }

    /// Current idle-round period estimate, in units of `1 / period_scale`
    /// seconds.
    pub fn period_idle(&self) -> u16 {
        self.period_idle
    }

    /// Drive the bootstrap loop: attempt schedule receptions until one
    /// carries a fresh time reference or `t_silent_hf` has elapsed. On
    /// timeout, sleeps `t_deepsleep_lf` and returns so the caller can
    /// retry on its next call, rather than blocking forever in one call.
    pub fn bootstrap<T: SlotTransport, C: Timebase>(
        &mut self,
        cfg: &LwbConfig,
        transport: &mut T,
        clock: &mut C,
        stats: &mut Stats,
    ) -> Option<Schedule> {
        let start_hf = clock.now_hf();
        loop {
            let mut buf = WireFrame::new();
            transport.slot_recv(&mut buf, None, cfg.tx_cnt_sched, true, true);
            let info = transport.slot_stop();
            stats.rx_total += info.n_rx;

            if info.t_ref_updated {
                if let Ok(sched) = Schedule::decode(&buf, cfg.sched_compress) {
                    return Some(sched);
                }
            }

            if clock.now_hf().saturating_sub(start_hf) >= u64::from(cfg.t_silent_hf) {
                warn!("source {}: bootstrap silent timeout, deep-sleeping", self.self_id);
                stats.sleep_cnt += 1;
                let deadline = clock.now_lf() + u64::from(cfg.t_deepsleep_lf);
                clock.wait_until_lf(deadline);
                return None;
            }
        }
    }

    /// Run one full round once out of bootstrap: receive the schedule,
    /// drive the sync FSM and time recovery, and (if synced) service data
    /// slots, contention, and the second schedule.
    #[allow(clippy::too_many_arguments)]
    pub fn run_round<T: SlotTransport, C: Timebase, Q: PacketQueue>(
        &mut self,
        cfg: &LwbConfig,
        transport: &mut T,
        clock: &mut C,
        in_queue: &mut Q,
        out_queue: &mut Q,
        stats: &mut Stats,
    ) -> SourceRoundOutcome {
        if self.sync.state() == SyncState::Bootstrap {
            return match self.bootstrap(cfg, transport, clock, stats) {
                Some(sched) => {
                    self.sync.transition(SyncEvent::Rcvd);
                    self.recover_time(cfg, &sched, clock);
                    self.service_round(cfg, &sched, transport, clock, in_queue, out_queue, stats);
                    SourceRoundOutcome::Serviced { synced: true }
                }
                None => SourceRoundOutcome::StillBootstrapping,
            };
        }

        let guard = self.sync.guard_time();
        let deadline_hf = clock.now_hf() + u64::from(cfg.t_sched_hf) + u64::from(guard);
        clock.wait_until_hf(deadline_hf);

        let mut buf = WireFrame::new();
        transport.slot_recv(&mut buf, None, cfg.tx_cnt_sched, true, true);
        let rx_info = transport.slot_stop();
        stats.rx_total += rx_info.n_rx;
        stats.relay_cnt = rx_info.relay_cnt_first_rx;
        stats.glossy_snr = rx_info.snr;

        let sched = if rx_info.t_ref_updated {
            Schedule::decode(&buf, cfg.sched_compress).ok()
        } else {
            None
        };

        match sched {
            Some(sched) => {
                self.sync.transition(SyncEvent::Rcvd);
                self.recover_time(cfg, &sched, clock);
                let synced = self.sync.is_synced();
                if synced {
                    self.service_round(cfg, &sched, transport, clock, in_queue, out_queue, stats);
                }
                self.sleep_until_next(cfg, clock, sched.period, stats);
                SourceRoundOutcome::Serviced { synced }
            }
            None => {
                let new_state = self.sync.transition(SyncEvent::Missed);
                // Estimate t_ref_lf by restoring the last sync point and
                // advancing it by one idle period; correct further if the
                // prior round was a data round.
                let mut estimate = self.last_synced_lf + hf_to_lf(u64::from(cfg.t_sched_hf));
                if self.last_was_data_round {
                    estimate += u64::from(self.period_idle);
                }
                self.sleep_until_next(cfg, clock, self.period_idle, stats);
                self.last_synced_lf = estimate;
                SourceRoundOutcome::Missed { new_state }
            }
        }
    }

    fn recover_time<C: Timebase>(&mut self, cfg: &LwbConfig, sched: &Schedule, clock: &mut C) {
        let t_ref_hf = clock.now_hf().saturating_sub(u64::from(cfg.t_ref_ofs_hf));
        let t_ref_lf = hf_to_lf(t_ref_hf);

        if sched.flags.cont {
            let predicted_lf = self.last_synced_lf + u64::from(self.period_idle);
            let drift = (t_ref_lf as i64 - predicted_lf as i64).clamp(i16::MIN as i64, i16::MAX as i64) as i16;
            self.sync.update_drift(drift);
        }

        self.global_time = sched.time;
        self.last_synced_lf = t_ref_lf;
        self.last_was_data_round = sched.flags.sack;
        if sched.period != 0 {
            self.period_idle = sched.period;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn service_round<T: SlotTransport, C: Timebase, Q: PacketQueue>(
        &mut self,
        cfg: &LwbConfig,
        sched: &Schedule,
        transport: &mut T,
        clock: &mut C,
        in_queue: &mut Q,
        out_queue: &mut Q,
        stats: &mut Stats,
    ) {
        let t_slot = if sched.flags.sack {
            cfg.t_data_hf
        } else {
            cfg.t_cont_hf
        };

        for &slot_id in &sched.slots {
            let deadline = clock.now_hf() + u64::from(t_slot) + u64::from(cfg.t_gap_hf);
            clock.wait_until_hf(deadline);

            if slot_id == self.self_id {
                match out_queue.get() {
                    Ok(frame) => {
                        transport.slot_send(self.self_id, &frame, frame.len(), cfg.tx_cnt_data, false, false);
                        transport.slot_stop();
                        stats.pck_cnt += 1;
                    }
                    Err(_) => {
                        // nothing to send, but the slot must still be
                        // occupied; with no data there is nothing useful
                        // to flood.
                        transport.slot_stop();
                    }
                }
            } else {
                let mut buf = WireFrame::new();
                transport.slot_recv(&mut buf, None, cfg.tx_cnt_data, false, false);
                let info = transport.slot_stop();
                if info.n_rx > 0 && (slot_id == 0 || slot_id == cfg.host_id) {
                    let frame = crate::frame::data_frame_from(&buf);
                    if in_queue.put(&frame).is_err() {
                        stats.rxbuf_drop += 1;
                    }
                }
            }
        }

        if sched.flags.cont {
            self.do_contention(cfg, transport, clock, out_queue, stats);
        }

        if sched.flags.dack {
            info!(
                "source {}: idle round, pck_cnt={} rxdrop={}",
                self.self_id, stats.pck_cnt, stats.rxbuf_drop
            );
        }
    }

    fn do_contention<T: SlotTransport, C: Timebase, Q: PacketQueue>(
        &mut self,
        cfg: &LwbConfig,
        transport: &mut T,
        clock: &mut C,
        out_queue: &mut Q,
        stats: &mut Stats,
    ) {
        let deadline = clock.now_hf() + u64::from(cfg.t_cont_hf);
        clock.wait_until_hf(deadline);

        if !out_queue.is_empty() {
            let req = [out_queue.len() as u8];
            transport.slot_send(self.self_id, &req, req.len(), cfg.tx_cnt_data, false, false);
        } else {
            transport.slot_send(self.self_id, &[], 0, cfg.tx_cnt_data, false, false);
        }
        transport.slot_stop();

        // Second schedule: 2-byte frame, period==0 is the no-change
        // sentinel.
        let mut buf = WireFrame::new();
        transport.slot_recv(&mut buf, Some(2), cfg.tx_cnt_data, false, false);
        let info: SlotInfo = transport.slot_stop();
        if info.n_rx > 0 && buf.len() >= 2 {
            let period = u16::from_le_bytes([buf[0], buf[1]]);
            if period != 0 {
                self.period_idle = period;
            }
        }
        stats.srq_cnt = stats.srq_cnt.saturating_add(1);
    }

    fn sleep_until_next<C: Timebase>(&mut self, cfg: &LwbConfig, clock: &mut C, period: u16, stats: &mut Stats) {
        let guard_lf = hf_to_lf(u64::from(self.sync.guard_time()));
        let preprocess_lf = hf_to_lf(u64::from(cfg.t_preprocess_hf));
        let deadline = self
            .last_synced_lf
            .saturating_add(u64::from(period))
            .saturating_sub(guard_lf)
            .saturating_sub(preprocess_lf);
        clock.wait_until_lf(deadline.max(clock.now_lf()));
        stats.sleep_cnt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::RamQueue;
    use crate::schedule::ScheduleFlags;
    use crate::slot::sim::{ScriptedSlot, SimulatedGlossy};
    use crate::timebase::sim::SimClock;
    use heapless::Vec as HVec;

    fn encode(sched: &Schedule) -> WireFrame {
        let mut buf = WireFrame::new();
        sched.encode(&mut buf, false).unwrap();
        buf
    }

    #[test]
    fn s1_bootstrap_then_sync() {
        let cfg = LwbConfig::default();
        let mut source = SourceRound::new(&cfg, 7);
        let mut in_q: RamQueue<4> = RamQueue::new();
        let mut out_q: RamQueue<4> = RamQueue::new();
        let mut stats = Stats::new();
        let mut clock = SimClock::new();

        let mut slots = HVec::<u16, 8>::new();
        let sched = Schedule {
            time: 1000,
            period: 100,
            flags: ScheduleFlags {
                cont: false,
                dack: true,
                sack: true,
            },
            slots: {
                let _ = slots.push(0);
                slots
            },
        };
        let wire = encode(&sched);

        let script = vec![ScriptedSlot {
            info: SlotInfo {
                n_rx: 1,
                t_ref_updated: true,
                t_ref: 10,
                ..Default::default()
            },
            rx_payload: Some(wire),
        }];
        let mut glossy = SimulatedGlossy::new(script);

        let outcome = source.run_round(&cfg, &mut glossy, &mut clock, &mut in_q, &mut out_q, &mut stats);
        assert_eq!(outcome, SourceRoundOutcome::Serviced { synced: true });
        assert_eq!(source.sync_state(), SyncState::Synced);
        assert_eq!(source.global_time, 1000);
    }
}
