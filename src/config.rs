//! Tunable parameters for the LWB engine.
//!
//! All tunables named in the external-interface surface live here, grouped
//! by subsystem, with a `Default` reproducing the reference constants.
//! Values can be overridden at `LwbEngine::start` time or hot-reloaded by
//! an owning application.

use serde::{Deserialize, Serialize};

/// Core tunable configuration for one node (host or source).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LwbConfig {
    // --- Identity ---
    /// Node id of the host (sink). Slot id `0` is reserved for the host's
    /// own slot regardless of this value.
    pub host_id: u16,

    // --- Frame / queue sizing ---
    /// Depth of the inbound queue.
    pub in_queue_size: usize,
    /// Depth of the outbound queue.
    pub out_queue_size: usize,
    /// Maximum concurrently-tracked stream entries on the host.
    pub max_n_streams: usize,

    // --- Round timing (HF ticks unless noted) ---
    /// Time reserved for the schedule slot.
    pub t_sched_hf: u32,
    /// Time reserved for a data slot.
    pub t_data_hf: u32,
    /// Time reserved for the contention slot.
    pub t_cont_hf: u32,
    /// Gap between consecutive slots.
    pub t_gap_hf: u32,
    /// Base guard interval (`Bootstrap`/`Synced`).
    pub t_guard_hf: u32,
    /// Guard interval after one missed schedule (`Unsynced`).
    pub t_guard_1_hf: u32,
    /// Guard interval after two missed schedules (`Unsynced2`).
    pub t_guard_2_hf: u32,
    /// Application pre-process window before each round.
    pub t_preprocess_hf: u32,
    /// Compensates for radio/MAC warm-up when deriving `t_ref` from a
    /// flood's reported time reference. Runtime-configurable rather than
    /// a compile-time constant (see `DESIGN.md`'s Open Question).
    pub t_ref_ofs_hf: u32,
    /// Silence threshold before the bootstrap loop gives up and sleeps.
    pub t_silent_hf: u32,
    /// Deep-sleep duration between bootstrap retries.
    pub t_deepsleep_lf: u32,

    // --- Flood parameters ---
    /// Number of retransmissions per flood for a schedule.
    pub tx_cnt_sched: u8,
    /// Number of retransmissions per flood for a data/request slot.
    pub tx_cnt_data: u8,
    /// Maximum flooding hop count.
    pub max_hops: u8,

    // --- Scheduling ---
    /// Units-per-second scale factor for the wire `period` field.
    pub period_scale: u16,
    /// Base idle-round period, in units of `1 / period_scale` s.
    pub sched_period_idle: u16,
    /// Duration of an AE request round, same units as `sched_period_idle`.
    pub t_req_round: u16,
    /// Whether the schedule's slot list is run-length compressed on the
    /// wire.
    pub sched_compress: bool,

    // --- Data sink behaviour ---
    /// When true, received data-round payloads are handed to an external
    /// sink instead of being enqueued to the inbound queue.
    pub write_to_sink: bool,
    /// Use the external-memory-backed queue instead of the in-RAM one.
    pub use_xmem: bool,
}

impl Default for LwbConfig {
    fn default() -> Self {
        Self {
            host_id: 1,

            in_queue_size: 8,
            out_queue_size: 8,
            max_n_streams: 32,

            t_sched_hf: 3_000,
            t_data_hf: 2_000,
            t_cont_hf: 1_000,
            t_gap_hf: 500,
            t_guard_hf: 100,
            t_guard_1_hf: 200,
            t_guard_2_hf: 400,
            t_preprocess_hf: 1_500,
            t_ref_ofs_hf: 300,
            t_silent_hf: 60_000,
            t_deepsleep_lf: 30,

            tx_cnt_sched: 3,
            tx_cnt_data: 2,
            max_hops: 15,

            period_scale: 100,
            sched_period_idle: 1_000, // 10s at scale 100
            t_req_round: 50,          // 0.5s
            sched_compress: true,

            write_to_sink: false,
            use_xmem: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let cfg = LwbConfig::default();
        assert!(cfg.t_guard_hf < cfg.t_guard_1_hf);
        assert!(cfg.t_guard_1_hf < cfg.t_guard_2_hf);
        assert!(cfg.t_req_round < cfg.sched_period_idle);
    }
}
