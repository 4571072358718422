//! High/low-frequency timebase port.
//!
//! The round engine never reads a hardware timer directly; it goes through
//! this trait so the same engine code drives both a real radio-timer backed
//! implementation and the deterministic [`SimClock`] used in tests.

/// Ratio between the high-frequency (slot-grained) and low-frequency
/// (inter-round, deep-sleep-safe) timer rates.
pub const HF_LF_RATIO: u32 = 32;

/// A timer deadline, expressed in the timebase it was scheduled against.
pub type Deadline = u64;

/// Absolute-deadline timebase the round engine schedules against.
///
/// Implementors own the actual hardware (or simulated) clock; the engine
/// only ever asks "what time is it" and "wake me at this deadline".
pub trait Timebase {
    /// Current high-frequency counter value.
    fn now_hf(&self) -> u64;

    /// Current low-frequency counter value.
    fn now_lf(&self) -> u64;

    /// Block (or, in an async adapter, yield) until `deadline` (in HF
    /// ticks) is reached.
    fn wait_until_hf(&mut self, deadline: Deadline);

    /// Block (or yield) until `deadline` (in LF ticks) is reached — used
    /// for the inter-round sleep, which may span a deep-sleep cycle.
    fn wait_until_lf(&mut self, deadline: Deadline);
}

/// Convert an LF-tick duration into HF ticks.
pub fn lf_to_hf(lf_ticks: u64) -> u64 {
    lf_ticks * u64::from(HF_LF_RATIO)
}

/// Convert an HF-tick duration into LF ticks (floor).
pub fn hf_to_lf(hf_ticks: u64) -> u64 {
    hf_ticks / u64::from(HF_LF_RATIO)
}

#[cfg(any(test, feature = "testing"))]
pub mod sim {
    //! Deterministic test clock the test harness can advance explicitly,
    //! rather than one that reads `Instant::now()`.

    use super::{Deadline, Timebase};

    /// A manually-advanced clock: `wait_until_*` jumps straight to the
    /// requested deadline rather than actually sleeping, so round-engine
    /// integration tests run instantly.
    #[derive(Debug, Default, Clone)]
    pub struct SimClock {
        hf: u64,
        lf: u64,
    }

    impl SimClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn advance_hf(&mut self, ticks: u64) {
            self.hf += ticks;
        }

        pub fn advance_lf(&mut self, ticks: u64) {
            self.lf += ticks;
        }
    }

    impl Timebase for SimClock {
        fn now_hf(&self) -> u64 {
            self.hf
        }

        fn now_lf(&self) -> u64 {
            self.lf
        }

        fn wait_until_hf(&mut self, deadline: Deadline) {
            if deadline > self.hf {
                self.hf = deadline;
            }
        }

        fn wait_until_lf(&mut self, deadline: Deadline) {
            if deadline > self.lf {
                self.lf = deadline;
            }
            self.hf = super::lf_to_hf(self.lf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::sim::SimClock;
    use super::*;

    #[test]
    fn hf_lf_conversion_round_trips_on_exact_multiples() {
        let lf = 10u64;
        assert_eq!(hf_to_lf(lf_to_hf(lf)), lf);
    }

    #[test]
    fn sim_clock_wait_until_never_goes_backwards() {
        let mut clk = SimClock::new();
        clk.advance_hf(100);
        clk.wait_until_hf(50);
        assert_eq!(clk.now_hf(), 100);
        clk.wait_until_hf(150);
        assert_eq!(clk.now_hf(), 150);
    }
}
