use core::fmt;
use std::io;

use crate::wire::Wire;
use crate::{Hash, Polka, SigError, Signatory, Signature, Signer};

pub(crate) const PRECOMMIT_SIGN_TAG: u8 = 0x03;

/// A vote to commit the outcome a polka proved at (height, round).
///
/// A pre-commit emitted on a pre-vote timeout wraps the degenerate nil
/// polka.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreCommit {
    pub polka: Polka,
}

impl PreCommit {
    pub fn new(polka: Polka) -> Self {
        Self { polka }
    }

    /// The hash a validator signs to emit this pre-commit. Covers only the
    /// polka's (block?, height, round), so pre-commits for the same outcome
    /// sign identical bytes regardless of which prevote signatures their
    /// polkas happen to carry.
    pub fn sign_hash(&self) -> Hash {
        self.polka.precommit_sign_hash()
    }

    pub fn sign<S: Signer>(self, signer: &S) -> Result<SignedPreCommit, SigError> {
        let signature = signer.sign(&self.sign_hash())?;
        let signatory = signer.signatory();
        Ok(SignedPreCommit {
            pre_commit: self,
            signature,
            signatory,
        })
    }
}

impl fmt::Display for PreCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PreCommit({})", self.polka)
    }
}

impl Wire for PreCommit {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        self.polka.write_to(w)
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            polka: Polka::read_from(r)?,
        })
    }
}

/// A [`PreCommit`] together with the signature and identity of its emitter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedPreCommit {
    pub pre_commit: PreCommit,
    pub signature: Signature,
    pub signatory: Signatory,
}

impl fmt::Display for SignedPreCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signed({}, by={})", self.pre_commit, self.signatory)
    }
}

impl Wire for SignedPreCommit {
    fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        self.pre_commit.write_to(w)?;
        self.signature.write_to(w)?;
        self.signatory.write_to(w)
    }

    fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            pre_commit: PreCommit::read_from(r)?,
            signature: Signature::read_from(r)?,
            signatory: Signatory::read_from(r)?,
        })
    }
}
