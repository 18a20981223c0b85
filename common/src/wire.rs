//! Deterministic binary encoding for protocol messages.
//!
//! Every message writes its fields in declared order, fixed-width where
//! possible, so that the same logical message yields byte-identical output
//! every time and signatures over it are reproducible.

use std::io;

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

/// Types with a deterministic wire encoding.
pub trait Wire: Sized {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()>;

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self>;

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        // Writing to a Vec cannot fail.
        #[allow(clippy::unwrap_used)]
        self.write_to(&mut bytes).unwrap();
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let mut r = bytes;
        let value = Self::read_from(&mut r)?;
        if !r.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "trailing bytes after message",
            ));
        }
        Ok(value)
    }
}

pub(crate) fn write_len<W: io::Write>(w: &mut W, len: usize) -> io::Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "sequence too long"))?;
    w.write_u32::<LE>(len)
}

pub(crate) fn read_len<R: io::Read>(r: &mut R) -> io::Result<usize> {
    Ok(r.read_u32::<LE>()? as usize)
}

pub(crate) fn write_seq<W: io::Write, T: Wire>(w: &mut W, items: &[T]) -> io::Result<()> {
    write_len(w, items.len())?;
    for item in items {
        item.write_to(w)?;
    }
    Ok(())
}

pub(crate) fn read_seq<R: io::Read, T: Wire>(r: &mut R) -> io::Result<Vec<T>> {
    let len = read_len(r)?;
    // Bound the pre-allocation, not the length: a malformed length will run
    // into EOF on its own.
    let mut items = Vec::with_capacity(len.min(1024));
    for _ in 0..len {
        items.push(T::read_from(r)?);
    }
    Ok(items)
}

pub(crate) fn write_option<W: io::Write, T: Wire>(w: &mut W, value: &Option<T>) -> io::Result<()> {
    match value {
        None => w.write_u8(0),
        Some(value) => {
            w.write_u8(1)?;
            value.write_to(w)
        }
    }
}

pub(crate) fn read_option<R: io::Read, T: Wire>(r: &mut R) -> io::Result<Option<T>> {
    match r.read_u8()? {
        0 => Ok(None),
        1 => T::read_from(r).map(Some),
        tag => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid option tag: {tag}"),
        )),
    }
}
