//! Simulation time.
//!
//! Time is a bare monotonically increasing step counter.  One step is one
//! full turn of the world: every active agent has acted, every semaphore was
//! signaled, and the commit ran.  There is no wall-clock mapping — research
//! runs are paced by the turn barrier, not by real time.

use std::fmt;
use std::io::{Read, Write};

use crate::codec::{Decode, Encode};

/// An absolute simulation timestep.  `u64` never overflows in practice.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    /// The step `n` turns after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> SimTime {
        SimTime(self.0 + n)
    }

    /// Steps elapsed from `earlier` to `self`.
    ///
    /// # Panics
    /// Panics in debug mode if `earlier > self`.
    #[inline]
    pub fn since(self, earlier: SimTime) -> u64 {
        self.0 - earlier.0
    }
}

impl std::ops::Add<u64> for SimTime {
    type Output = SimTime;
    #[inline]
    fn add(self, rhs: u64) -> SimTime {
        SimTime(self.0 + rhs)
    }
}

impl std::ops::Sub for SimTime {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: SimTime) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl Encode for SimTime {
    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        self.0.encode(out)
    }
}

impl Decode for SimTime {
    fn decode<R: Read + ?Sized>(input: &mut R) -> std::io::Result<Self> {
        Ok(SimTime(u64::decode(input)?))
    }
}
