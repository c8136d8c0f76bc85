//! Wall-clock timestamps carried by events and readings
//!
//! Only whole seconds travel on the wire; the nanosecond part exists for
//! local arithmetic between readings taken within the same second.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nanoseconds per second
pub const NSEC_PER_SEC: u32 = 1_000_000_000;

/// Nanoseconds per millisecond
pub const NSEC_PER_MSEC: u32 = 1_000_000;

/// Milliseconds per second
pub const MSEC_PER_SEC: u32 = 1_000;

/// Seconds plus nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timestamp {
    sec: u32,
    nsec: u32,
}

impl Timestamp {
    /// The epoch
    pub const ZERO: Self = Self { sec: 0, nsec: 0 };

    /// Timestamp at a whole second
    pub const fn from_sec(sec: u32) -> Self {
        Self { sec, nsec: 0 }
    }

    /// Timestamp from seconds and nanoseconds
    ///
    /// Nanoseconds beyond one second carry into the seconds field.
    pub const fn from_sec_nsec(sec: u32, nsec: u32) -> Self {
        Self {
            sec: sec.wrapping_add(nsec / NSEC_PER_SEC),
            nsec: nsec % NSEC_PER_SEC,
        }
    }

    /// Timestamp from total nanoseconds
    pub const fn from_nsec(nsec: u64) -> Self {
        Self {
            sec: (nsec / NSEC_PER_SEC as u64) as u32,
            nsec: (nsec % NSEC_PER_SEC as u64) as u32,
        }
    }

    /// Whole seconds
    pub const fn sec(&self) -> u32 {
        self.sec
    }

    /// Nanoseconds past the whole second
    pub const fn subsec_nanos(&self) -> u32 {
        self.nsec
    }

    /// Total milliseconds
    pub const fn msec(&self) -> u64 {
        self.sec as u64 * MSEC_PER_SEC as u64 + (self.nsec / NSEC_PER_MSEC) as u64
    }

    /// Total nanoseconds
    pub const fn nsec(&self) -> u64 {
        self.sec as u64 * NSEC_PER_SEC as u64 + self.nsec as u64
    }

    /// Sum of two timestamps, or `None` on seconds overflow
    pub fn checked_add(self, other: Self) -> Option<Self> {
        let mut sec = self.sec.checked_add(other.sec)?;
        let mut nsec = self.nsec + other.nsec;
        if nsec >= NSEC_PER_SEC {
            nsec -= NSEC_PER_SEC;
            sec = sec.checked_add(1)?;
        }
        Some(Self { sec, nsec })
    }

    /// Difference of two timestamps, or `None` if `other` is later
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        let mut sec = self.sec.checked_sub(other.sec)?;
        let nsec = if self.nsec < other.nsec {
            sec = sec.checked_sub(1)?;
            self.nsec + NSEC_PER_SEC - other.nsec
        } else {
            self.nsec - other.nsec
        };
        Some(Self { sec, nsec })
    }
}
