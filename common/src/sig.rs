use sha3::{Digest, Sha3_256};
use thiserror::Error;

use crate::{Hash, Signatory, Signature};

/// Error raised by a [`Signer`] or [`Verifier`] implementation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SigError {
    /// The signature bytes do not parse as a signature.
    #[error("malformed signature")]
    MalformedSignature,

    /// The signature does not recover any signatory.
    #[error("signature does not verify")]
    InvalidSignature,

    /// The signing backend failed.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// Produces signatures under this replica's validator identity.
pub trait Signer {
    fn sign(&self, hash: &Hash) -> Result<Signature, SigError>;

    /// The validator identity all signatures from this signer recover to.
    fn signatory(&self) -> Signatory;
}

/// Recovers the signatory that produced a signature over a hash.
pub trait Verifier {
    fn verify(&self, hash: &Hash, signature: &Signature) -> Result<Signatory, SigError>;
}

/// Both halves of the signature scheme, as held by a replica.
pub trait SignerVerifier: Signer + Verifier {}

impl<T: Signer + Verifier> SignerVerifier for T {}

/// Hash a message payload under a domain tag, so that e.g. a pre-vote
/// signature can never be replayed as a pre-commit.
pub(crate) fn sign_hash(tag: u8, payload: &[u8]) -> Hash {
    let mut hasher = Sha3_256::new();
    hasher.update([tag]);
    hasher.update(payload);
    Hash::new(hasher.finalize().into())
}
