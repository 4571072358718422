//! Round engine: the cooperative per-round task shared shape for both the
//! host and source roles.
//!
//! Each role's `run_round` method is a single synchronous method that
//! suspends only at `Timebase::wait_until_*` calls — those are the
//! engine's only yield points. A single cooperative task, not preemptive
//! threads.

pub mod host;
pub mod source;

pub use host::{HostRound, HostRoundOutcome};
pub use source::{SourceRound, SourceRoundOutcome};
