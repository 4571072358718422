//! Static host scheduling: constant period, one slot per active stream,
//! no request/contention cycling. The simplest of the three variants —
//! useful as a baseline to validate the [`super::SchedulerPolicy`] trait
//! against before reasoning about the AE/eLWB state machines.

use super::stream_table::StreamTable;
use super::{SchedulerPolicy, SlotOutcome, StreamRequest};
use crate::config::LwbConfig;
use crate::schedule::{Schedule, ScheduleFlags};

pub struct StaticPolicy<const N: usize> {
    streams: StreamTable<N>,
}

impl<const N: usize> StaticPolicy<N> {
    pub fn new() -> Self {
        Self {
            streams: StreamTable::new(),
        }
    }

    fn build(&self, cfg: &LwbConfig, time: u32) -> Schedule {
        let mut sched = Schedule::empty(time);
        sched.period = cfg.sched_period_idle;
        sched.flags = ScheduleFlags {
            cont: false,
            dack: true,
            sack: true,
        };
        for id in self.streams.active_node_ids(cfg.max_n_streams) {
            let _ = sched.slots.push(id);
        }
        sched
    }
}

impl<const N: usize> Default for StaticPolicy<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SchedulerPolicy for StaticPolicy<N> {
    fn init(&mut self, cfg: &LwbConfig, time: u32) -> Schedule {
        self.build(cfg, time)
    }

    fn compute(
        &mut self,
        cfg: &LwbConfig,
        time: u32,
        slot_outcomes: &[SlotOutcome],
        _contention_activity: bool,
    ) -> Schedule {
        for outcome in slot_outcomes {
            if let SlotOutcome::UnknownSender { node_id } = outcome {
                log::warn!("scheduler: data from unknown stream {node_id}");
            }
        }
        self.build(cfg, time)
    }

    fn on_request(&mut self, req: StreamRequest) {
        self.streams.request(req.node_id);
    }

    fn knows_stream(&self, node_id: u16) -> bool {
        self.streams.contains(node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_one_slot_per_active_stream() {
        let cfg = LwbConfig::default();
        let mut policy: StaticPolicy<8> = StaticPolicy::new();
        policy.on_request(StreamRequest {
            node_id: 5,
            outstanding: 1,
        });
        policy.on_request(StreamRequest {
            node_id: 3,
            outstanding: 1,
        });
        let sched = policy.init(&cfg, 0);
        assert_eq!(&sched.slots[..], &[3, 5]);
        assert!(sched.flags.sack);
        assert!(!sched.flags.cont);
    }

    #[test]
    fn period_is_constant_across_rounds() {
        let cfg = LwbConfig::default();
        let mut policy: StaticPolicy<8> = StaticPolicy::new();
        let a = policy.init(&cfg, 0);
        let b = policy.compute(&cfg, 10, &[], false);
        assert_eq!(a.period, b.period);
    }
}
