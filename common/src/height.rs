use core::fmt;
use std::io;

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::wire::Wire;

/// A chain position. Heights are monotonically non-decreasing within a replica.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Height(u64);

impl Height {
    pub const fn new(height: u64) -> Self {
        Self(height)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn increment(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Wire for Height {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<LE>(self.0)
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        r.read_u64::<LE>().map(Self)
    }
}
