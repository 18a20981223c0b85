use core::fmt;
use std::io;

use crate::sig::sign_hash;
use crate::wire::{read_option, write_option, Wire};
use crate::{Block, Commit, Hash, Round, SigError, Signatory, Signature, Signer};

const PROPOSE_SIGN_TAG: u8 = 0x01;

/// A proposer's candidate block for a round, carrying the commit proof of
/// its parent. `last_commit` is absent only when the parent is the trusted
/// genesis head.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Propose {
    pub block: Block,
    pub round: Round,
    pub last_commit: Option<Commit>,
}

impl Propose {
    pub fn new(block: Block, round: Round, last_commit: Option<Commit>) -> Self {
        Self {
            block,
            round,
            last_commit,
        }
    }

    /// The hash the proposer signs to emit this proposal.
    pub fn sign_hash(&self) -> Hash {
        sign_hash(PROPOSE_SIGN_TAG, &self.to_bytes())
    }

    pub fn sign<S: Signer>(self, signer: &S) -> Result<SignedPropose, SigError> {
        let signature = signer.sign(&self.sign_hash())?;
        let signatory = signer.signatory();
        Ok(SignedPropose {
            propose: self,
            signature,
            signatory,
        })
    }
}

impl fmt::Display for Propose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Propose({}, round={})", self.block, self.round)
    }
}

impl Wire for Propose {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        self.block.write_to(w)?;
        self.round.write_to(w)?;
        write_option(w, &self.last_commit)
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            block: Block::read_from(r)?,
            round: Round::read_from(r)?,
            last_commit: read_option(r)?,
        })
    }
}

/// A [`Propose`] together with the signature and identity of its proposer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedPropose {
    pub propose: Propose,
    pub signature: Signature,
    pub signatory: Signatory,
}

impl fmt::Display for SignedPropose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signed({}, by={})", self.propose, self.signatory)
    }
}

impl Wire for SignedPropose {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        self.propose.write_to(w)?;
        self.signature.write_to(w)?;
        self.signatory.write_to(w)
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            propose: Propose::read_from(r)?,
            signature: Signature::read_from(r)?,
            signatory: Signatory::read_from(r)?,
        })
    }
}
