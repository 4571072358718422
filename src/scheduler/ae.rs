//! Acknowledgement-coupled (AE) host scheduling policy.
//!
//! A 3-state machine (idle/request/data) driven by contention activity
//! and data-slot outcomes, with SACK accounting and "unknown stream"
//! handling.

use super::stream_table::StreamTable;
use super::{SchedulerPolicy, SlotOutcome, StreamRequest};
use crate::config::LwbConfig;
use crate::schedule::{Schedule, ScheduleFlags};
use heapless::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AeState {
    Idle,
    Request,
    Data,
}

pub struct AePolicy<const N: usize> {
    streams: StreamTable<N>,
    state: AeState,
    pending_sack: Vec<u16, N>,
}

impl<const N: usize> AePolicy<N> {
    pub fn new() -> Self {
        Self {
            streams: StreamTable::new(),
            state: AeState::Idle,
            pending_sack: Vec::new(),
        }
    }
}

impl<const N: usize> Default for AePolicy<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SchedulerPolicy for AePolicy<N> {
    fn init(&mut self, cfg: &LwbConfig, time: u32) -> Schedule {
        self.state = AeState::Idle;
        let mut sched = Schedule::empty(time);
        sched.period = cfg.sched_period_idle;
        sched.flags = ScheduleFlags {
            cont: true,
            dack: true,
            sack: false,
        };
        sched
    }

    fn compute(
        &mut self,
        cfg: &LwbConfig,
        time: u32,
        slot_outcomes: &[SlotOutcome],
        contention_activity: bool,
    ) -> Schedule {
        let mut sched = Schedule::empty(time);

        match self.state {
            AeState::Idle => {
                if contention_activity {
                    // Any contention-slot activity advances to request:
                    // one slot per known stream (active or not — every
                    // node gets a chance to request), period = 1.
                    for id in self.streams.all_node_ids(cfg.max_n_streams) {
                        let _ = sched.slots.push(id);
                    }
                    sched.period = 1;
                    sched.flags = ScheduleFlags {
                        cont: false,
                        dack: false,
                        sack: false,
                    };
                    self.state = AeState::Request;
                } else {
                    sched.period = cfg.sched_period_idle;
                    sched.flags = ScheduleFlags {
                        cont: true,
                        dack: true,
                        sack: false,
                    };
                }
            }
            AeState::Request => {
                let active = self.streams.active_node_ids(cfg.max_n_streams);
                if active.is_empty() {
                    sched.period = cfg.sched_period_idle.saturating_sub(1);
                    sched.flags = ScheduleFlags {
                        cont: true,
                        dack: false,
                        sack: false,
                    };
                    self.state = AeState::Idle;
                } else {
                    for id in active {
                        let _ = sched.slots.push(id);
                    }
                    sched.period = cfg.t_req_round;
                    sched.flags = ScheduleFlags {
                        cont: false,
                        dack: false,
                        sack: true,
                    };
                    self.state = AeState::Data;
                }
            }
            AeState::Data => {
                for outcome in slot_outcomes {
                    match outcome {
                        SlotOutcome::Served { node_id } => {
                            self.streams.deactivate(*node_id);
                            log::info!("scheduler: data received, stream {node_id} removed");
                            let _ = self.pending_sack.push(*node_id);
                        }
                        SlotOutcome::UnknownSender { node_id } => {
                            log::warn!("scheduler: data received from unknown stream {node_id}");
                        }
                        SlotOutcome::Empty => {}
                    }
                }
                sched.period = cfg
                    .sched_period_idle
                    .saturating_sub(cfg.t_req_round)
                    .saturating_sub(1);
                sched.flags = ScheduleFlags {
                    cont: true,
                    dack: false,
                    sack: false,
                };
                self.state = AeState::Idle;
            }
        }
        sched
    }

    fn on_request(&mut self, req: StreamRequest) {
        self.streams.request(req.node_id);
    }

    fn knows_stream(&self, node_id: u16) -> bool {
        self.streams.contains(node_id)
    }

    fn prepare_sack(&mut self, out: &mut heapless::Vec<u8, 64>) -> usize {
        let mut n = 0;
        while let Some(id) = self.pending_sack.pop() {
            if out.extend_from_slice(&id.to_le_bytes()).is_err() {
                // put it back, ran out of room this round
                let _ = self.pending_sack.push(id);
                break;
            }
            n += 2;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s6_idle_request_data_idle_cycle() {
        let cfg = LwbConfig::default();
        let mut policy: AePolicy<8> = AePolicy::new();
        policy.on_request(StreamRequest {
            node_id: 11,
            outstanding: 1,
        });

        let idle = policy.init(&cfg, 0);
        assert!(idle.flags.cont);

        let request = policy.compute(&cfg, 1, &[], true);
        assert_eq!(&request.slots[..], &[11]);
        assert!(!request.flags.cont);

        let data = policy.compute(&cfg, 2, &[], false);
        assert!(data.flags.sack);
        assert_eq!(&data.slots[..], &[11]);

        let back_to_idle = policy.compute(
            &cfg,
            3,
            &[SlotOutcome::Served { node_id: 11 }],
            false,
        );
        assert!(back_to_idle.flags.cont);

        let mut sack_buf = heapless::Vec::<u8, 64>::new();
        let n = policy.prepare_sack(&mut sack_buf);
        assert_eq!(n, 2);
        assert_eq!(u16::from_le_bytes([sack_buf[0], sack_buf[1]]), 11);
    }

    #[test]
    fn unknown_sender_does_not_abort_the_round() {
        let cfg = LwbConfig::default();
        let mut policy: AePolicy<8> = AePolicy::new();
        policy.init(&cfg, 0);
        policy.compute(&cfg, 1, &[], true);
        policy.compute(&cfg, 2, &[], false);
        let next = policy.compute(
            &cfg,
            3,
            &[SlotOutcome::UnknownSender { node_id: 999 }],
            false,
        );
        assert!(next.flags.cont);
    }
}
