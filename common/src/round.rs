use core::fmt;
use std::io;

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::wire::Wire;

/// An attempt within a height. Rounds within a height are totally ordered.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Round(u64);

impl Round {
    /// The first round of every height.
    pub const INITIAL: Round = Round(0);

    pub const fn new(round: u64) -> Self {
        Self(round)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn increment(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Wire for Round {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<LE>(self.0)
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        r.read_u64::<LE>().map(Self)
    }
}
