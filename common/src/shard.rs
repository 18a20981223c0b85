use core::fmt;

use crate::{Hash, Height, Round, Signatory};

/// One independent consensus instance: an identifier and its validator set.
///
/// The signatory order is fixed at construction and defines the proposer
/// rotation; every replica of the shard must hold the same order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shard {
    pub hash: Hash,
    signatories: Vec<Signatory>,
}

impl Shard {
    pub fn new(hash: Hash, signatories: impl IntoIterator<Item = Signatory>) -> Self {
        let mut unique = Vec::new();
        for signatory in signatories {
            if !unique.contains(&signatory) {
                unique.push(signatory);
            }
        }
        Self {
            hash,
            signatories: unique,
        }
    }

    pub fn signatories(&self) -> &[Signatory] {
        &self.signatories
    }

    pub fn size(&self) -> usize {
        self.signatories.len()
    }

    /// The smallest vote count strictly greater than two thirds of the
    /// shard size.
    pub fn threshold(&self) -> usize {
        2 * self.size() / 3 + 1
    }

    pub fn contains(&self, signatory: &Signatory) -> bool {
        self.signatories.contains(signatory)
    }

    /// The proposer at (height, round): round-robin over the validator set.
    pub fn proposer(&self, height: Height, round: Round) -> Option<&Signatory> {
        if self.signatories.is_empty() {
            return None;
        }
        let index = height.as_u64().wrapping_add(round.as_u64()) % self.size() as u64;
        self.signatories.get(index as usize)
    }
}

impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shard({}, size={})", self.hash, self.size())
    }
}
