//! Per-source time-sync state machine.
//!
//! A plain lookup table, not the function-pointer `Fsm` used elsewhere in
//! this crate's lineage — this state machine has no per-state enter/exit
//! behaviour beyond guard-interval selection and counters, so a table plus
//! a couple of methods is the better fit here (see `DESIGN.md`).

use log::{info, warn};

/// Drift values outside this bound (in low-frequency ticks per period) are
/// rejected as spurious and do not update the running estimate.
const DRIFT_ACCEPT_BOUND: i16 = 100;

/// Source-side synchronization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No schedule has ever been captured (or sync was lost for too long).
    Bootstrap,
    /// Tracking the host's schedule.
    Synced,
    /// Missed one schedule since last sync.
    Unsynced,
    /// Missed two consecutive schedules since last sync.
    Unsynced2,
}

/// Outcome of the most recent schedule-receive attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// A schedule was received and its time reference accepted.
    Rcvd,
    /// No usable schedule was received in the window.
    Missed,
}

const STATES: [SyncState; 4] = [
    SyncState::Bootstrap,
    SyncState::Synced,
    SyncState::Unsynced,
    SyncState::Unsynced2,
];

fn index_of(s: SyncState) -> usize {
    STATES.iter().position(|&x| x == s).unwrap()
}

/// `next_state[event][state]` transition table.
const NEXT_STATE: [[SyncState; 4]; 2] = [
    // RCVD
    [
        SyncState::Synced, // Bootstrap -> Synced
        SyncState::Synced, // Synced -> Synced
        SyncState::Synced, // Unsynced -> Synced
        SyncState::Synced, // Unsynced2 -> Synced
    ],
    // MISSED
    [
        SyncState::Bootstrap,  // Bootstrap -> Bootstrap
        SyncState::Unsynced,   // Synced -> Unsynced
        SyncState::Unsynced2,  // Unsynced -> Unsynced2
        SyncState::Bootstrap,  // Unsynced2 -> Bootstrap
    ],
];

/// Tracks sync state, guard interval in effect, and the running clock-drift
/// estimate for one source node.
#[derive(Debug, Clone)]
pub struct SyncFsm {
    state: SyncState,
    guard_base: u32,
    guard_1: u32,
    guard_2: u32,
    unsynced_cnt: u32,
    bootstrap_cnt: u32,
    drift: i16,
}

impl SyncFsm {
    /// `guard_base`/`guard_1`/`guard_2` are the guard intervals (in HF
    /// ticks) used in `Bootstrap`/`Synced`, `Unsynced`, and `Unsynced2`
    /// respectively — widening as confidence in the time reference drops.
    pub fn new(guard_base: u32, guard_1: u32, guard_2: u32) -> Self {
        Self {
            state: SyncState::Bootstrap,
            guard_base,
            guard_1,
            guard_2,
            unsynced_cnt: 0,
            bootstrap_cnt: 1,
            drift: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_synced(&self) -> bool {
        self.state == SyncState::Synced
    }

    pub fn unsynced_cnt(&self) -> u32 {
        self.unsynced_cnt
    }

    pub fn bootstrap_cnt(&self) -> u32 {
        self.bootstrap_cnt
    }

    /// Guard interval in effect for the *next* schedule receive, given the
    /// current state.
    pub fn guard_time(&self) -> u32 {
        match self.state {
            SyncState::Bootstrap | SyncState::Synced => self.guard_base,
            SyncState::Unsynced => self.guard_1,
            SyncState::Unsynced2 => self.guard_2,
        }
    }

    /// Feed an event through the transition table and update counters.
    pub fn transition(&mut self, event: SyncEvent) -> SyncState {
        let from = self.state;
        let to = NEXT_STATE[event as usize][index_of(from)];
        if to != from {
            info!("sync: {from:?} -> {to:?} ({event:?})");
        }
        match (from, to) {
            (_, SyncState::Unsynced) | (_, SyncState::Unsynced2) => self.unsynced_cnt += 1,
            (_, SyncState::Bootstrap) if from != SyncState::Bootstrap => {
                self.bootstrap_cnt += 1;
            }
            _ => {}
        }
        self.state = to;
        to
    }

    /// Update the running drift estimate (EWMA, factor 1/2), rejecting
    /// samples outside `DRIFT_ACCEPT_BOUND`. Only called on the first
    /// schedule of a round that also carries a contention slot.
    pub fn update_drift(&mut self, sample: i16) {
        if sample.unsigned_abs() >= DRIFT_ACCEPT_BOUND as u16 {
            warn!("sync: rejecting implausible drift sample {sample}");
            return;
        }
        self.drift = (self.drift + sample) / 2;
    }

    pub fn drift(&self) -> i16 {
        self.drift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s5_missed_schedule_resync_path() {
        let mut fsm = SyncFsm::new(10, 20, 40);
        assert_eq!(fsm.transition(SyncEvent::Rcvd), SyncState::Synced);
        assert_eq!(fsm.transition(SyncEvent::Missed), SyncState::Unsynced);
        assert_eq!(fsm.transition(SyncEvent::Missed), SyncState::Unsynced2);
        assert_eq!(fsm.transition(SyncEvent::Missed), SyncState::Bootstrap);
        assert_eq!(fsm.unsynced_cnt(), 2);
        assert!(fsm.bootstrap_cnt() >= 2);
    }

    #[test]
    fn guard_widens_with_desync_depth() {
        let mut fsm = SyncFsm::new(10, 20, 40);
        assert_eq!(fsm.guard_time(), 10);
        fsm.transition(SyncEvent::Rcvd);
        fsm.transition(SyncEvent::Missed);
        assert_eq!(fsm.guard_time(), 20);
        fsm.transition(SyncEvent::Missed);
        assert_eq!(fsm.guard_time(), 40);
    }

    #[test]
    fn rcvd_from_any_state_returns_to_synced() {
        for start in [
            SyncState::Bootstrap,
            SyncState::Synced,
            SyncState::Unsynced,
            SyncState::Unsynced2,
        ] {
            let mut fsm = SyncFsm::new(1, 2, 3);
            fsm.state = start;
            assert_eq!(fsm.transition(SyncEvent::Rcvd), SyncState::Synced);
        }
    }

    #[test]
    fn drift_rejects_outliers() {
        let mut fsm = SyncFsm::new(1, 2, 3);
        fsm.update_drift(10);
        assert_eq!(fsm.drift(), 5);
        fsm.update_drift(200);
        assert_eq!(fsm.drift(), 5, "outlier must not move the estimate");
    }
}
