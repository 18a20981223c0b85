use core::fmt;
use std::io;

use sha3::{Digest, Sha3_256};

use crate::wire::{read_seq, write_seq, Wire};
use crate::{Hash, Height, Round, Signatory, Timestamp, Transaction};

/// A candidate block for one (height, round).
///
/// The header is a digest of the remaining fields; two blocks are equal iff
/// their headers are equal.
#[derive(Clone, Eq)]
pub struct Block {
    pub header: Hash,
    pub parent_header: Hash,
    pub height: Height,
    pub round: Round,
    pub time: Timestamp,
    pub proposer: Signatory,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Build a block and compute its header over the remaining fields.
    pub fn new(
        parent_header: Hash,
        height: Height,
        round: Round,
        time: Timestamp,
        proposer: Signatory,
        transactions: Vec<Transaction>,
    ) -> Self {
        let mut block = Self {
            header: Hash::zero(),
            parent_header,
            height,
            round,
            time,
            proposer,
            transactions,
        };
        block.header = block.computed_header();
        block
    }

    /// The header this block's contents hash to. Differs from `header` only
    /// if the block was forged or corrupted.
    pub fn computed_header(&self) -> Hash {
        let mut hasher = Sha3_256::new();
        hasher.update(self.parent_header.as_bytes());
        hasher.update(self.height.to_bytes());
        hasher.update(self.round.to_bytes());
        hasher.update(self.time.to_bytes());
        hasher.update(self.proposer.as_bytes());
        for transaction in &self.transactions {
            hasher.update(transaction.to_bytes());
        }
        Hash::new(hasher.finalize().into())
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("header", &self.header)
            .field("height", &self.height)
            .field("round", &self.round)
            .field("transactions", &self.transactions.len())
            .finish()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block(header={}, height={}, round={})",
            self.header, self.height, self.round
        )
    }
}

impl Wire for Block {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        self.header.write_to(w)?;
        self.parent_header.write_to(w)?;
        self.height.write_to(w)?;
        self.round.write_to(w)?;
        self.time.write_to(w)?;
        self.proposer.write_to(w)?;
        write_seq(w, &self.transactions)
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            header: Hash::read_from(r)?,
            parent_header: Hash::read_from(r)?,
            height: Height::read_from(r)?,
            round: Round::read_from(r)?,
            time: Timestamp::read_from(r)?,
            proposer: Signatory::read_from(r)?,
            transactions: read_seq(r)?,
        })
    }
}
