use core::fmt;
use std::io;

use thiserror::Error;

use crate::polka::verify_quorum;
use crate::wire::{read_seq, write_seq, Wire};
use crate::{Height, Polka, PolkaError, Round, Shard, Signatory, Signature, Verifier};

/// Proof that +2/3 of a shard's validators pre-committed the same
/// (block?, height, round). A commit for a block finalizes that height; a
/// commit for nil only closes the round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub polka: Polka,
    pub signatures: Vec<Signature>,
    pub signatories: Vec<Signatory>,
}

impl Commit {
    /// The round the constituent pre-commits were cast in.
    pub fn round(&self) -> Round {
        self.polka.round
    }

    /// The height this commit is for.
    pub fn height(&self) -> Height {
        self.polka.height
    }

    /// Check that this commit is a genuine +2/3 pre-commit proof for its
    /// shard.
    pub fn verify<V: Verifier>(&self, verifier: &V, shard: &Shard) -> Result<(), CommitError> {
        if let Some(block) = &self.polka.block {
            if block.height != self.polka.height {
                return Err(CommitError::HeightMismatch {
                    commit: self.polka.height,
                    block: block.height,
                });
            }
        }

        verify_quorum(
            verifier,
            shard,
            &self.polka.precommit_sign_hash(),
            &self.signatures,
            &self.signatories,
        )
        .map_err(CommitError::Quorum)
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commit({}, votes={})", self.polka, self.signatures.len())
    }
}

impl Wire for Commit {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        self.polka.write_to(w)?;
        write_seq(w, &self.signatures)?;
        write_seq(w, &self.signatories)
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            polka: Polka::read_from(r)?,
            signatures: read_seq(r)?,
            signatories: read_seq(r)?,
        })
    }
}

/// Why a commit failed verification.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("commit height ({commit}) disagrees with block height ({block})")]
    HeightMismatch { commit: Height, block: Height },

    #[error(transparent)]
    Quorum(PolkaError),
}
