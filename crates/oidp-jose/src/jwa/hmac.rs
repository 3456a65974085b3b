// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

use std::marker::PhantomData;

use digest::{Digest, core_api::BlockSizeUser};
use hmac::{Mac, SimpleHmac};

use super::signature::Signature;

/// A shared-secret MAC key, generic over the hash function.
#[derive(Clone)]
pub struct Hmac<D> {
    key: Vec<u8>,
    digest: PhantomData<D>,
}

impl<D> Hmac<D> {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            digest: PhantomData,
        }
    }
}

impl<D> From<Vec<u8>> for Hmac<D> {
    fn from(key: Vec<u8>) -> Self {
        Self::new(key)
    }
}

impl<D: Digest + BlockSizeUser> signature::Signer<Signature> for Hmac<D> {
    fn try_sign(&self, msg: &[u8]) -> Result<Signature, signature::Error> {
        let mut mac =
            SimpleHmac::<D>::new_from_slice(&self.key).map_err(signature::Error::from_source)?;
        mac.update(msg);
        let output = mac.finalize().into_bytes();
        Ok(Signature::new(output.to_vec()))
    }
}

impl<D: Digest + BlockSizeUser> signature::Verifier<Signature> for Hmac<D> {
    fn verify(&self, msg: &[u8], signature: &Signature) -> Result<(), signature::Error> {
        let mut mac =
            SimpleHmac::<D>::new_from_slice(&self.key).map_err(signature::Error::from_source)?;
        mac.update(msg);
        mac.verify_slice(signature.as_bytes())
            .map_err(signature::Error::from_source)
    }
}
