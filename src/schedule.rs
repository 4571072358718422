//! Schedule control-frame codec.
//!
//! Wire layout (little-endian), see `time`/`period`/`n_slots` below:
//!
//! ```text
//! offset  size  field
//! 0       4     time                seconds
//! 4       2     period              1 / PERIOD_SCALE s
//! 6       2     n_slots | flags     low 14 bits = slot count, top 3 = flags
//! 8       2*k   slot[0..k-1]        node-ids, optionally run-length compressed
//! ```
//!
//! A run of `L >= 2` consecutive node-ids with stride 1 is compressed as
//! `(base, L - 1)` with the high bit of the encoded length word set.

use crate::error::CodecError;
use crate::frame::MAX_PKT_LEN;
use heapless::Vec;

/// Byte length of the fixed header (time + period + n_slots/flags).
pub const HEADER_LEN: usize = 8;

/// Units per second for the `period` field.
pub const PERIOD_SCALE: u16 = 100;

/// Upper bound on slots a single schedule can name.
pub const MAX_DATA_SLOTS: usize = 40;

const N_SLOTS_MASK: u16 = 0x1FFF;
const FLAG_CONT: u16 = 1 << 15;
const FLAG_DACK: u16 = 1 << 14;
const FLAG_SACK: u16 = 1 << 13;

const COMPRESSED_RUN_MARKER: u16 = 1 << 15;
const MIN_RUN_LEN: usize = 2;

/// The three round-type bits packed into the schedule's `n_slots` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleFlags {
    /// Round ends with a contention slot.
    pub cont: bool,
    /// Round is an idle anchor (drives app pre/post-process pacing).
    pub dack: bool,
    /// Round is a data round (vs. a request round).
    pub sack: bool,
}

impl ScheduleFlags {
    fn pack(self) -> u16 {
        let mut bits = 0u16;
        if self.cont {
            bits |= FLAG_CONT;
        }
        if self.dack {
            bits |= FLAG_DACK;
        }
        if self.sack {
            bits |= FLAG_SACK;
        }
        bits
    }

    fn unpack(bits: u16) -> Self {
        Self {
            cont: bits & FLAG_CONT != 0,
            dack: bits & FLAG_DACK != 0,
            sack: bits & FLAG_SACK != 0,
        }
    }
}

/// A parsed schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Host's global time at round start, seconds.
    pub time: u32,
    /// Duration until the next schedule, in units of `1 / PERIOD_SCALE` s.
    /// `0` is the distinguished "no change" sentinel on a second schedule.
    pub period: u16,
    /// Round-type bits.
    pub flags: ScheduleFlags,
    /// Node-id per data slot, in round order. Slot id `0` means "host slot".
    pub slots: Vec<u16, MAX_DATA_SLOTS>,
}

impl Schedule {
    /// An empty schedule with only `time` set; used as a placeholder before
    /// the first `compute()` call from a scheduler policy.
    pub fn empty(time: u32) -> Self {
        Self {
            time,
            period: 0,
            flags: ScheduleFlags::default(),
            slots: Vec::new(),
        }
    }

    /// Encode into `out`, returning the number of bytes written.
    /// [`CodecError::Oversized`] if the schedule (even compressed) does not
    /// fit in `out`'s capacity.
    pub fn encode(&self, out: &mut Vec<u8, MAX_PKT_LEN>, compress: bool) -> Result<usize, CodecError> {
        out.clear();
        debug_assert!(self.slots.len() <= N_SLOTS_MASK as usize);

        let n_slots_field = (self.slots.len() as u16 & N_SLOTS_MASK) | self.flags.pack();
        out.extend_from_slice(&self.time.to_le_bytes())
            .map_err(|()| CodecError::Oversized)?;
        out.extend_from_slice(&self.period.to_le_bytes())
            .map_err(|()| CodecError::Oversized)?;
        out.extend_from_slice(&n_slots_field.to_le_bytes())
            .map_err(|()| CodecError::Oversized)?;

        if compress {
            encode_slots_compressed(&self.slots, out)?;
        } else {
            for &s in &self.slots {
                out.extend_from_slice(&s.to_le_bytes())
                    .map_err(|()| CodecError::Oversized)?;
            }
        }
        Ok(out.len())
    }

    /// Decode a schedule from `buf`, decompressing the slot list if needed.
    /// `compressed` must match how the sender encoded the frame — the wire
    /// format carries no self-describing compression bit of its own; the
    /// round engine knows which mode is in effect from its own config.
    pub fn decode(buf: &[u8], compressed: bool) -> Result<Self, CodecError> {
        if buf.len() < HEADER_LEN {
            return Err(CodecError::Truncated);
        }
        let time = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let period = u16::from_le_bytes(buf[4..6].try_into().unwrap());
        let n_slots_field = u16::from_le_bytes(buf[6..8].try_into().unwrap());
        let flags = ScheduleFlags::unpack(n_slots_field);
        let n_slots = (n_slots_field & N_SLOTS_MASK) as usize;

        let body = &buf[HEADER_LEN..];
        let slots = if compressed {
            decode_slots_compressed(body, n_slots)?
        } else {
            if body.len() < n_slots * 2 {
                return Err(CodecError::Truncated);
            }
            let mut v = Vec::new();
            for i in 0..n_slots {
                let s = u16::from_le_bytes(body[i * 2..i * 2 + 2].try_into().unwrap());
                v.push(s).map_err(|_| CodecError::Oversized)?;
            }
            v
        };

        Ok(Self {
            time,
            period,
            flags,
            slots,
        })
    }
}

fn encode_slots_compressed(slots: &[u16], out: &mut Vec<u8, MAX_PKT_LEN>) -> Result<(), CodecError> {
    let mut i = 0;
    while i < slots.len() {
        let base = slots[i];
        let mut run = 1usize;
        while i + run < slots.len() && slots[i + run] == base.wrapping_add(run as u16) {
            run += 1;
        }
        if run >= MIN_RUN_LEN {
            out.extend_from_slice(&base.to_le_bytes())
                .map_err(|()| CodecError::Oversized)?;
            let marker = COMPRESSED_RUN_MARKER | (run as u16 - 1);
            out.extend_from_slice(&marker.to_le_bytes())
                .map_err(|()| CodecError::Oversized)?;
            i += run;
        } else {
            out.extend_from_slice(&base.to_le_bytes())
                .map_err(|()| CodecError::Oversized)?;
            out.extend_from_slice(&0u16.to_le_bytes())
                .map_err(|()| CodecError::Oversized)?;
            i += 1;
        }
    }
    Ok(())
}

fn decode_slots_compressed(body: &[u8], n_slots: usize) -> Result<Vec<u16, MAX_DATA_SLOTS>, CodecError> {
    let mut out = Vec::new();
    let mut pos = 0;
    while out.len() < n_slots {
        if pos + 4 > body.len() {
            return Err(CodecError::Truncated);
        }
        let base = u16::from_le_bytes(body[pos..pos + 2].try_into().unwrap());
        let marker = u16::from_le_bytes(body[pos + 2..pos + 4].try_into().unwrap());
        pos += 4;
        if marker & COMPRESSED_RUN_MARKER != 0 {
            let extra = marker & !COMPRESSED_RUN_MARKER;
            for k in 0..=extra {
                out.push(base.wrapping_add(k)).map_err(|_| CodecError::MalformedRun)?;
            }
        } else {
            out.push(base).map_err(|_| CodecError::MalformedRun)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schedule {
        let mut slots = Vec::new();
        for s in [0u16, 7, 8, 9, 10, 42] {
            slots.push(s).unwrap();
        }
        Schedule {
            time: 123_456,
            period: 250,
            flags: ScheduleFlags {
                cont: true,
                dack: false,
                sack: true,
            },
            slots,
        }
    }

    #[test]
    fn roundtrip_uncompressed() {
        let sched = sample();
        let mut buf = Vec::new();
        let n = sched.encode(&mut buf, false).unwrap();
        assert_eq!(n, HEADER_LEN + sched.slots.len() * 2);
        let decoded = Schedule::decode(&buf, false).unwrap();
        assert_eq!(decoded, sched);
    }

    #[test]
    fn roundtrip_compressed() {
        let sched = sample();
        let mut buf = Vec::new();
        sched.encode(&mut buf, true).unwrap();
        let decoded = Schedule::decode(&buf, true).unwrap();
        assert_eq!(decoded, sched);
    }

    #[test]
    fn flags_share_n_slots_field_without_corrupting_count() {
        let sched = sample();
        let mut buf = Vec::new();
        sched.encode(&mut buf, false).unwrap();
        let n_slots_field = u16::from_le_bytes(buf[6..8].try_into().unwrap());
        assert_eq!((n_slots_field & N_SLOTS_MASK) as usize, sched.slots.len());
    }

    #[test]
    fn period_zero_is_no_change_sentinel() {
        let mut sched = sample();
        sched.period = 0;
        let mut buf = Vec::new();
        sched.encode(&mut buf, false).unwrap();
        let decoded = Schedule::decode(&buf, false).unwrap();
        assert_eq!(decoded.period, 0);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        assert_eq!(Schedule::decode(&[1, 2, 3], false), Err(CodecError::Truncated));
    }

    #[cfg(not(target_os = "espidf"))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decompress_then_recompress_is_bit_identical(
                slots in proptest::collection::vec(0u16..2000, 0..MAX_DATA_SLOTS)
            ) {
                let mut v: Vec<u16, MAX_DATA_SLOTS> = Vec::new();
                for s in slots {
                    if v.push(s).is_err() {
                        break;
                    }
                }
                let sched = Schedule {
                    time: 1,
                    period: 10,
                    flags: ScheduleFlags::default(),
                    slots: v,
                };
                let mut buf = Vec::new();
                sched.encode(&mut buf, true).unwrap();
                let decoded = Schedule::decode(&buf, true).unwrap();
                prop_assert_eq!(decoded.slots, sched.slots);
            }
        }
    }
}
