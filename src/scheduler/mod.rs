//! Host scheduler policies.
//!
//! All three variants implement [`SchedulerPolicy`]; the host round engine
//! is generic over the policy and does not know which one is in effect.
//! `AePolicy` implements the full idle/request/data state machine;
//! `StaticPolicy` and `ElwbPolicy` generalize the same stream-table/
//! delegate shape to a constant-period and a demand-adaptive variant
//! respectively.

pub mod ae;
pub mod elwb;
pub mod static_policy;
pub mod stream_table;

use crate::config::LwbConfig;
use crate::schedule::Schedule;

pub use ae::AePolicy;
pub use elwb::ElwbPolicy;
pub use static_policy::StaticPolicy;

/// A stream request frame's decoded content, independent of its 1- or
/// 2-byte wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub node_id: u16,
    /// Frames outstanding on the requester's side, if conveyed.
    pub outstanding: u8,
}

/// Per-round outcome the host feeds back into the policy after running the
/// data slots, so the policy can retire satisfied streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    /// A known stream's data was received; its request is now satisfied.
    Served { node_id: u16 },
    /// Data arrived in a slot whose node id matched no known stream.
    UnknownSender { node_id: u16 },
    /// No data arrived in this slot.
    Empty,
}

/// Pluggable host scheduling policy.
pub trait SchedulerPolicy {
    /// Produce the very first schedule.
    fn init(&mut self, cfg: &LwbConfig, time: u32) -> Schedule;

    /// Produce the next schedule given the outcome of the round just
    /// completed. `contention_activity` is `true` if the just-finished
    /// round's contention slot saw any reception.
    fn compute(
        &mut self,
        cfg: &LwbConfig,
        time: u32,
        slot_outcomes: &[SlotOutcome],
        contention_activity: bool,
    ) -> Schedule;

    /// Fold in a stream request observed in a request-round slot.
    fn on_request(&mut self, req: StreamRequest);

    /// Whether `node_id` has a registered stream entry (active or
    /// inactive). The round engine uses this to tell a legitimate sender
    /// from one whose data arrived in a slot position the policy no
    /// longer recognizes.
    fn knows_stream(&self, node_id: u16) -> bool;

    /// Build the SACK payload (acked node ids) for policies that support
    /// it. Default: no-op, 0 bytes — only [`AePolicy`] overrides this.
    fn prepare_sack(&mut self, _out: &mut heapless::Vec<u8, 64>) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_policy_is_a_valid_scheduler_policy_impl() {
        fn assert_impl<T: SchedulerPolicy>() {}
        assert_impl::<StaticPolicy<8>>();
        assert_impl::<AePolicy<8>>();
        assert_impl::<ElwbPolicy<8>>();
    }
}
