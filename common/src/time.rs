use core::fmt;
use core::ops::Add;
use core::time::Duration;
use std::io;

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::wire::Wire;

/// A wall-clock instant in milliseconds. Only required to be monotone
/// within a single replica; never compared across replicas.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, duration: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(duration.as_millis() as u64))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl Wire for Timestamp {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<LE>(self.0)
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        r.read_u64::<LE>().map(Self)
    }
}
