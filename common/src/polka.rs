use core::fmt;
use std::collections::BTreeSet;
use std::io;

use thiserror::Error;

use crate::prevote::PREVOTE_SIGN_TAG;
use crate::sig::sign_hash;
use crate::wire::{read_option, read_seq, write_option, write_seq, Wire};
use crate::{Block, Hash, Height, Round, Shard, Signatory, Signature, Verifier};

/// Proof that +2/3 of a shard's validators pre-voted for the same
/// (block?, height, round).
///
/// The signatures are over the constituent pre-votes; `signatures` and
/// `signatories` are index-aligned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polka {
    pub block: Option<Block>,
    pub height: Height,
    pub round: Round,
    pub signatures: Vec<Signature>,
    pub signatories: Vec<Signatory>,
}

impl Polka {
    /// The degenerate nil polka: the payload of a pre-commit emitted on a
    /// pre-vote timeout, before any quorum formed.
    pub fn nil(height: Height, round: Round) -> Self {
        Self {
            block: None,
            height,
            round,
            signatures: Vec::new(),
            signatories: Vec::new(),
        }
    }

    fn vote_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        // Writing to a Vec cannot fail.
        #[allow(clippy::unwrap_used)]
        {
            write_option(&mut bytes, &self.block).unwrap();
            self.height.write_to(&mut bytes).unwrap();
            self.round.write_to(&mut bytes).unwrap();
        }
        bytes
    }

    /// The hash each constituent pre-vote was signed over. Byte-identical to
    /// [`crate::PreVote::sign_hash`] for the same (block?, height, round).
    pub fn prevote_sign_hash(&self) -> Hash {
        sign_hash(PREVOTE_SIGN_TAG, &self.vote_bytes())
    }

    /// The hash a validator signs to pre-commit this polka.
    pub fn precommit_sign_hash(&self) -> Hash {
        sign_hash(crate::precommit::PRECOMMIT_SIGN_TAG, &self.vote_bytes())
    }

    /// Check that this polka is a genuine +2/3 pre-vote proof for its shard.
    ///
    /// The nil polka without signatures is accepted: it is not a quorum
    /// claim, only an explicit veto.
    pub fn verify<V: Verifier>(&self, verifier: &V, shard: &Shard) -> Result<(), PolkaError> {
        if let Some(block) = &self.block {
            if block.height != self.height {
                return Err(PolkaError::HeightMismatch {
                    polka: self.height,
                    block: block.height,
                });
            }
        }

        if self.block.is_none() && self.signatures.is_empty() && self.signatories.is_empty() {
            return Ok(());
        }

        verify_quorum(
            verifier,
            shard,
            &self.prevote_sign_hash(),
            &self.signatures,
            &self.signatories,
        )
    }
}

impl fmt::Display for Polka {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.block {
            Some(block) => write!(
                f,
                "Polka({}, height={}, round={}, votes={})",
                block.header,
                self.height,
                self.round,
                self.signatures.len()
            ),
            None => write!(
                f,
                "Polka(nil, height={}, round={}, votes={})",
                self.height,
                self.round,
                self.signatures.len()
            ),
        }
    }
}

impl Wire for Polka {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        write_option(w, &self.block)?;
        self.height.write_to(w)?;
        self.round.write_to(w)?;
        write_seq(w, &self.signatures)?;
        write_seq(w, &self.signatories)
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            block: read_option(r)?,
            height: Height::read_from(r)?,
            round: Round::read_from(r)?,
            signatures: read_seq(r)?,
            signatories: read_seq(r)?,
        })
    }
}

/// Why a polka failed verification.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PolkaError {
    #[error("polka height ({polka}) disagrees with block height ({block})")]
    HeightMismatch { polka: Height, block: Height },

    #[error("{signatures} signatures but {signatories} signatories")]
    Misaligned {
        signatures: usize,
        signatories: usize,
    },

    #[error("{got} votes, {want} required")]
    BelowThreshold { got: usize, want: usize },

    #[error("signatory {0} voted more than once")]
    DuplicateSignatory(Signatory),

    #[error("signatory {0} is not in the shard")]
    UnknownSignatory(Signatory),

    #[error("signature does not recover signatory {0}")]
    BadSignature(Signatory),
}

/// Shared quorum check for polkas and commits: aligned arrays, threshold,
/// distinct in-shard signatories, each signature recovering its signatory.
pub(crate) fn verify_quorum<V: Verifier>(
    verifier: &V,
    shard: &Shard,
    hash: &Hash,
    signatures: &[Signature],
    signatories: &[Signatory],
) -> Result<(), PolkaError> {
    if signatures.len() != signatories.len() {
        return Err(PolkaError::Misaligned {
            signatures: signatures.len(),
            signatories: signatories.len(),
        });
    }
    if signatures.len() < shard.threshold() {
        return Err(PolkaError::BelowThreshold {
            got: signatures.len(),
            want: shard.threshold(),
        });
    }

    let mut seen = BTreeSet::new();
    for (signature, signatory) in signatures.iter().zip(signatories.iter()) {
        if !shard.contains(signatory) {
            return Err(PolkaError::UnknownSignatory(*signatory));
        }
        if !seen.insert(*signatory) {
            return Err(PolkaError::DuplicateSignatory(*signatory));
        }
        let recovered = verifier
            .verify(hash, signature)
            .map_err(|_| PolkaError::BadSignature(*signatory))?;
        if recovered != *signatory {
            return Err(PolkaError::BadSignature(*signatory));
        }
    }

    Ok(())
}
