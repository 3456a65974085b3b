// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

use signature::{Signer as _, Verifier as _};

use super::{Hs256Key, Hs384Key, Hs512Key, InvalidAlgorithm, signature::Signature};
use crate::JsonWebSignatureAlg;

/// A shared-secret key, usable for the HMAC family of algorithms.
#[derive(Clone)]
pub enum SymmetricKey {
    Hs256(Hs256Key),
    Hs384(Hs384Key),
    Hs512(Hs512Key),
}

impl SymmetricKey {
    /// Create a new key for the given algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm is not in the HMAC family.
    pub fn new_for_alg(key: Vec<u8>, alg: JsonWebSignatureAlg) -> Result<Self, InvalidAlgorithm> {
        match alg {
            JsonWebSignatureAlg::Hs256 => Ok(Self::Hs256(key.into())),
            JsonWebSignatureAlg::Hs384 => Ok(Self::Hs384(key.into())),
            JsonWebSignatureAlg::Hs512 => Ok(Self::Hs512(key.into())),
            alg => Err(InvalidAlgorithm { alg }),
        }
    }
}

impl signature::Signer<Signature> for SymmetricKey {
    fn try_sign(&self, msg: &[u8]) -> Result<Signature, signature::Error> {
        match self {
            Self::Hs256(key) => key.try_sign(msg),
            Self::Hs384(key) => key.try_sign(msg),
            Self::Hs512(key) => key.try_sign(msg),
        }
    }
}

impl signature::Verifier<Signature> for SymmetricKey {
    fn verify(&self, msg: &[u8], signature: &Signature) -> Result<(), signature::Error> {
        match self {
            Self::Hs256(key) => key.verify(msg, signature),
            Self::Hs384(key) => key.verify(msg, signature),
            Self::Hs512(key) => key.verify(msg, signature),
        }
    }
}
