use std::io;

use crate::wire::{read_len, write_len, Wire};

/// Upper bound on the wire size of a single transaction.
pub const MAX_TRANSACTION_BYTES: usize = 1 << 20;

/// An opaque transaction drawn from the pool into a block.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Transaction(Vec<u8>);

impl Transaction {
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn size_bytes(&self) -> usize {
        self.0.len()
    }
}

impl Wire for Transaction {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        write_len(w, self.0.len())?;
        w.write_all(&self.0)
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        let len = read_len(r)?;
        if len > MAX_TRANSACTION_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "transaction too large",
            ));
        }
        let mut bytes = vec![0; len];
        r.read_exact(&mut bytes)?;
        Ok(Self(bytes))
    }
}
