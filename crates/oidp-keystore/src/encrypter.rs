// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! Sealed envelopes for opaque token strings.
//!
//! An opaque token is a ticket sealed under a symmetric key: nobody but the
//! server can read it, and any modification fails authentication. The wire
//! form is URL-safe base64 over `nonce || ciphertext || tag`, so a sealed
//! value is self-contained and survives being carried in form bodies and
//! query strings.

use std::sync::Arc;

use aead::Aead;
use base64ct::{Base64UrlUnpadded, Encoding};
use chacha20poly1305::{ChaCha20Poly1305, KeyInit};
use generic_array::GenericArray;
use thiserror::Error;

const NONCE_LEN: usize = 12;

/// Error returned when a payload could not be sealed.
#[derive(Debug, Error)]
#[error("failed to seal the payload")]
pub struct SealError;

/// Error returned when a sealed payload could not be opened.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("the payload is not valid base64")]
    Encoding(#[from] base64ct::Error),

    #[error("the payload is too short to carry a nonce")]
    Truncated,

    #[error("the payload failed authentication")]
    Authentication,
}

/// Seals and opens opaque payloads under a configured symmetric key.
#[derive(Clone)]
pub struct Encrypter {
    aead: Arc<ChaCha20Poly1305>,
}

impl Encrypter {
    /// Create an encrypter from a 256-bit key.
    #[must_use]
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            aead: Arc::new(ChaCha20Poly1305::new(GenericArray::from_slice(key))),
        }
    }

    /// Seal a payload into a self-contained URL-safe string, under a fresh
    /// random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, SealError> {
        let nonce: [u8; NONCE_LEN] = rand::random();

        let mut sealed = self
            .aead
            .encrypt(GenericArray::from_slice(&nonce), plaintext)
            .map_err(|_| SealError)?;

        let mut payload = nonce.to_vec();
        payload.append(&mut sealed);

        Ok(Base64UrlUnpadded::encode_string(&payload))
    }

    /// Open a previously sealed string, returning the plaintext.
    pub fn open(&self, sealed: &str) -> Result<Vec<u8>, OpenError> {
        let payload = Base64UrlUnpadded::decode_vec(sealed)?;
        if payload.len() < NONCE_LEN {
            return Err(OpenError::Truncated);
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        self.aead
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| OpenError::Authentication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_and_open() {
        let encrypter = Encrypter::new(&[0x42; 32]);

        let sealed = encrypter.seal(b"an opaque ticket").unwrap();
        let opened = encrypter.open(&sealed).unwrap();
        assert_eq!(opened, b"an opaque ticket");

        // Nonces are fresh per call, so equal payloads seal differently.
        let again = encrypter.seal(b"an opaque ticket").unwrap();
        assert_ne!(sealed, again);
    }

    #[test]
    fn tampering_fails_authentication() {
        let encrypter = Encrypter::new(&[0x42; 32]);
        let sealed = encrypter.seal(b"an opaque ticket").unwrap();

        let mut tampered = sealed.into_bytes();
        let last = tampered.last_mut().unwrap();
        *last = if *last == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();

        encrypter.open(&tampered).unwrap_err();
    }

    #[test]
    fn other_keys_cannot_open() {
        let encrypter = Encrypter::new(&[0x42; 32]);
        let other = Encrypter::new(&[0x43; 32]);

        let sealed = encrypter.seal(b"an opaque ticket").unwrap();
        assert!(matches!(
            other.open(&sealed),
            Err(OpenError::Authentication)
        ));
    }

    #[test]
    fn truncated_payloads_are_rejected() {
        let encrypter = Encrypter::new(&[0x42; 32]);

        let short = Base64UrlUnpadded::encode_string(b"tiny");
        assert!(matches!(
            encrypter.open(&short),
            Err(OpenError::Truncated)
        ));

        assert!(matches!(
            encrypter.open("not-base64!"),
            Err(OpenError::Encoding(_))
        ));
    }
}
