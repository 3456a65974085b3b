// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! Signing and verifying keys for the supported JWS algorithms: the HMAC
//! family over a shared secret, and RSASSA-PKCS1-v1_5 over RSA key pairs.

use sha2::{Sha256, Sha384, Sha512};

mod asymmetric;
pub(crate) mod hmac;
mod signature;
mod symmetric;

pub use self::{
    asymmetric::{AsymmetricSigningKey, AsymmetricVerifyingKey},
    signature::Signature,
    symmetric::SymmetricKey,
};

pub type Hs256Key = self::hmac::Hmac<Sha256>;
pub type Hs384Key = self::hmac::Hmac<Sha384>;
pub type Hs512Key = self::hmac::Hmac<Sha512>;

/// Error returned when a key cannot handle the requested algorithm.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unsupported algorithm {alg} for this key")]
pub struct InvalidAlgorithm {
    /// The algorithm that was requested.
    pub alg: crate::JsonWebSignatureAlg,
}
