//! Read-only statistics snapshot.
//!
//! The round engine is the sole writer; everything else only clones a
//! snapshot.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Total data packets successfully relayed/received.
    pub pck_cnt: u32,
    /// Total receptions across all slots (including non-data ones).
    pub rx_total: u32,
    /// Inbound-queue puts dropped for lack of room.
    pub rxbuf_drop: u32,
    /// Outbound-queue puts dropped for lack of room.
    pub txbuf_drop: u32,
    /// Number of times bootstrap was (re-)entered.
    pub bootstrap_cnt: u32,
    /// Number of times the sync FSM left `Synced`.
    pub unsynced_cnt: u32,
    /// Number of inter-round sleeps taken.
    pub sleep_cnt: u32,
    /// Current clock-drift estimate (LF ticks per period).
    pub drift: i16,
    /// Relay count (hop distance) observed on the last received schedule.
    pub relay_cnt: u8,
    /// SNR of the last received schedule.
    pub glossy_snr: i8,
    /// Stream requests processed by the host scheduler.
    pub srq_cnt: u16,
    /// HF time of the last slot serviced.
    pub t_slot_last: u64,
    /// Data packets discarded because their node id matched no known
    /// stream entry — see `DESIGN.md`'s Open Question on the AE policy's
    /// "unknown stream" case.
    pub unknown_stream_cnt: u32,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }
}
