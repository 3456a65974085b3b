// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1v15::{SigningKey, VerifyingKey},
};
use sha2::{Sha256, Sha384, Sha512};
use signature::{SignatureEncoding as _, Signer as _, Verifier as _};

use super::{InvalidAlgorithm, signature::Signature};
use crate::JsonWebSignatureAlg;

/// A private key usable for the RSASSA-PKCS1-v1_5 family of algorithms.
#[derive(Clone)]
pub enum AsymmetricSigningKey {
    Rs256(Box<SigningKey<Sha256>>),
    Rs384(Box<SigningKey<Sha384>>),
    Rs512(Box<SigningKey<Sha512>>),
}

impl AsymmetricSigningKey {
    /// Wrap an RSA private key for the given algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm is not in the RSASSA-PKCS1-v1_5
    /// family.
    pub fn from_rsa_key(
        key: RsaPrivateKey,
        alg: JsonWebSignatureAlg,
    ) -> Result<Self, InvalidAlgorithm> {
        match alg {
            JsonWebSignatureAlg::Rs256 => Ok(Self::Rs256(Box::new(SigningKey::new(key)))),
            JsonWebSignatureAlg::Rs384 => Ok(Self::Rs384(Box::new(SigningKey::new(key)))),
            JsonWebSignatureAlg::Rs512 => Ok(Self::Rs512(Box::new(SigningKey::new(key)))),
            alg => Err(InvalidAlgorithm { alg }),
        }
    }
}

impl signature::Signer<Signature> for AsymmetricSigningKey {
    fn try_sign(&self, msg: &[u8]) -> Result<Signature, signature::Error> {
        match self {
            Self::Rs256(key) => Ok(Signature::new(key.try_sign(msg)?.to_vec())),
            Self::Rs384(key) => Ok(Signature::new(key.try_sign(msg)?.to_vec())),
            Self::Rs512(key) => Ok(Signature::new(key.try_sign(msg)?.to_vec())),
        }
    }
}

/// A public key usable to verify RSASSA-PKCS1-v1_5 signatures.
#[derive(Clone)]
pub enum AsymmetricVerifyingKey {
    Rs256(Box<VerifyingKey<Sha256>>),
    Rs384(Box<VerifyingKey<Sha384>>),
    Rs512(Box<VerifyingKey<Sha512>>),
}

impl AsymmetricVerifyingKey {
    /// Wrap an RSA public key for the given algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm is not in the RSASSA-PKCS1-v1_5
    /// family.
    pub fn from_rsa_key(
        key: RsaPublicKey,
        alg: JsonWebSignatureAlg,
    ) -> Result<Self, InvalidAlgorithm> {
        match alg {
            JsonWebSignatureAlg::Rs256 => Ok(Self::Rs256(Box::new(VerifyingKey::new(key)))),
            JsonWebSignatureAlg::Rs384 => Ok(Self::Rs384(Box::new(VerifyingKey::new(key)))),
            JsonWebSignatureAlg::Rs512 => Ok(Self::Rs512(Box::new(VerifyingKey::new(key)))),
            alg => Err(InvalidAlgorithm { alg }),
        }
    }
}

impl signature::Verifier<Signature> for AsymmetricVerifyingKey {
    fn verify(&self, msg: &[u8], signature: &Signature) -> Result<(), signature::Error> {
        match self {
            Self::Rs256(key) => key.verify(msg, &decode_rsa_signature(signature)?),
            Self::Rs384(key) => key.verify(msg, &decode_rsa_signature(signature)?),
            Self::Rs512(key) => key.verify(msg, &decode_rsa_signature(signature)?),
        }
    }
}

fn decode_rsa_signature(
    signature: &Signature,
) -> Result<rsa::pkcs1v15::Signature, signature::Error> {
    rsa::pkcs1v15::Signature::try_from(signature.as_bytes()).map_err(|_| signature::Error::new())
}
