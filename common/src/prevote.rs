use core::fmt;
use std::io;

use crate::sig::sign_hash;
use crate::wire::{read_option, write_option, Wire};
use crate::{Block, Hash, Height, Round, SigError, Signatory, Signature, Signer};

pub(crate) const PREVOTE_SIGN_TAG: u8 = 0x02;

/// A vote that a block (or nothing) is acceptable at (height, round).
///
/// An absent block is a first-class vote for nil: an explicit veto of the
/// round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreVote {
    pub block: Option<Block>,
    pub height: Height,
    pub round: Round,
}

impl PreVote {
    pub fn new(block: Option<Block>, height: Height, round: Round) -> Self {
        Self {
            block,
            height,
            round,
        }
    }

    /// The hash a validator signs to emit this pre-vote.
    pub fn sign_hash(&self) -> Hash {
        sign_hash(PREVOTE_SIGN_TAG, &self.to_bytes())
    }

    pub fn sign<S: Signer>(self, signer: &S) -> Result<SignedPreVote, SigError> {
        let signature = signer.sign(&self.sign_hash())?;
        let signatory = signer.signatory();
        Ok(SignedPreVote {
            pre_vote: self,
            signature,
            signatory,
        })
    }
}

impl fmt::Display for PreVote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.block {
            Some(block) => write!(
                f,
                "PreVote({}, height={}, round={})",
                block.header, self.height, self.round
            ),
            None => write!(f, "PreVote(nil, height={}, round={})", self.height, self.round),
        }
    }
}

impl Wire for PreVote {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        write_option(w, &self.block)?;
        self.height.write_to(w)?;
        self.round.write_to(w)
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            block: read_option(r)?,
            height: Height::read_from(r)?,
            round: Round::read_from(r)?,
        })
    }
}

/// A [`PreVote`] together with the signature and identity of its emitter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedPreVote {
    pub pre_vote: PreVote,
    pub signature: Signature,
    pub signatory: Signatory,
}

impl fmt::Display for SignedPreVote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signed({}, by={})", self.pre_vote, self.signatory)
    }
}

impl Wire for SignedPreVote {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        self.pre_vote.write_to(w)?;
        self.signature.write_to(w)?;
        self.signatory.write_to(w)
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            pre_vote: PreVote::read_from(r)?,
            signature: Signature::read_from(r)?,
            signatory: Signatory::read_from(r)?,
        })
    }
}
