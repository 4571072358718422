//! Event-triggered low-power wireless bus (e-LWB) round engine.
//!
//! A many-to-one, time-synchronized wireless bus protocol: one host and
//! many sources share a round structure of schedule broadcast, data
//! slots, optional contention slot and optional second schedule. This
//! crate implements the round engine, sync FSM, schedule codec, packet
//! queues and host scheduler policies; the radio/flooding primitive and
//! the HF/LF timers are external collaborators reached through the
//! [`slot`] and [`timebase`] port traits.

#![deny(unused_must_use)]

pub mod config;
pub mod engine;
pub mod frame;
pub mod queue;
pub mod round;
pub mod schedule;
pub mod scheduler;
pub mod slot;
pub mod stats;
pub mod sync;
pub mod timebase;

mod error;

pub use config::LwbConfig;
pub use engine::{LwbHost, LwbSource};
pub use error::{Error, Result};
pub use stats::Stats;
