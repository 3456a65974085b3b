// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! Signing key material for the provider core.
//!
//! A [`Keystore`] holds an ordered list of [`SigningCredential`]s, supplied
//! by configuration. Each credential wraps a private key, an optional
//! explicit key identifier and an optional X.509 certificate; the effective
//! `kid` and `x5t` header values are derived here.

#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

use base64ct::{Base64UrlUnpadded, Encoding};
use oidp_jose::{
    JsonWebSignatureAlg,
    jwa::{AsymmetricSigningKey, AsymmetricVerifyingKey, InvalidAlgorithm, Signature, SymmetricKey},
};
use rsa::{
    RsaPrivateKey,
    pkcs1::DecodeRsaPrivateKey,
    pkcs8::DecodePrivateKey,
    traits::PublicKeyParts,
};
use sha1::{Digest, Sha1};
use thiserror::Error;

mod encrypter;

pub use self::encrypter::{Encrypter, OpenError, SealError};

/// Error returned when key material could not be loaded.
#[derive(Debug, Error)]
pub enum KeyLoadError {
    #[error("failed to parse the PKCS#8 document")]
    Pkcs8(#[from] rsa::pkcs8::Error),

    #[error("failed to parse the PKCS#1 document")]
    Pkcs1(#[from] rsa::pkcs1::Error),
}

/// A private key usable to sign tokens.
#[derive(Clone)]
pub enum PrivateKey {
    /// An RSA private key.
    Rsa(Box<RsaPrivateKey>),

    /// A shared secret, for the HMAC family of algorithms.
    Symmetric(Vec<u8>),
}

impl PrivateKey {
    /// Load an RSA private key from a PEM document, in either PKCS#8 or
    /// PKCS#1 encoding.
    pub fn from_rsa_pem(pem: &str) -> Result<Self, KeyLoadError> {
        if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(pem) {
            return Ok(Self::Rsa(Box::new(key)));
        }

        let key = RsaPrivateKey::from_pkcs1_pem(pem)?;
        Ok(Self::Rsa(Box::new(key)))
    }

    /// Load an RSA private key from a DER document, in either PKCS#8 or
    /// PKCS#1 encoding.
    pub fn from_rsa_der(der: &[u8]) -> Result<Self, KeyLoadError> {
        if let Ok(key) = RsaPrivateKey::from_pkcs8_der(der) {
            return Ok(Self::Rsa(Box::new(key)));
        }

        let key = RsaPrivateKey::from_pkcs1_der(der)?;
        Ok(Self::Rsa(Box::new(key)))
    }

    /// Wrap an already-loaded RSA private key.
    #[must_use]
    pub fn from_rsa_key(key: RsaPrivateKey) -> Self {
        Self::Rsa(Box::new(key))
    }

    /// Wrap a shared secret.
    #[must_use]
    pub fn symmetric(secret: impl Into<Vec<u8>>) -> Self {
        Self::Symmetric(secret.into())
    }

    /// Whether this key can sign with the given algorithm.
    #[must_use]
    pub fn supports(&self, alg: JsonWebSignatureAlg) -> bool {
        match self {
            Self::Rsa(_) => !alg.is_symmetric(),
            Self::Symmetric(_) => alg.is_symmetric(),
        }
    }
}

/// An X.509 certificate, kept as its DER encoding.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Wrap a DER-encoded certificate.
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        Self { der }
    }

    /// The SHA-1 thumbprint of the certificate, as uppercase hex.
    #[must_use]
    pub fn thumbprint(&self) -> String {
        let hash = Sha1::digest(&self.der);
        hash.iter().map(|byte| format!("{byte:02X}")).collect()
    }

    /// The `x5t` header value: the base64url encoding of the certificate's
    /// SHA-1 hash.
    #[must_use]
    pub fn x5t(&self) -> String {
        let hash = Sha1::digest(&self.der);
        Base64UrlUnpadded::encode_string(&hash)
    }
}

/// A private key together with the metadata needed to advertise it.
#[derive(Clone)]
pub struct SigningCredential {
    key: PrivateKey,
    kid: Option<String>,
    certificate: Option<Certificate>,
}

impl SigningCredential {
    /// Create a credential around a private key.
    #[must_use]
    pub fn new(key: PrivateKey) -> Self {
        Self {
            key,
            kid: None,
            certificate: None,
        }
    }

    /// Set an explicit key identifier, overriding derivation.
    #[must_use]
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    /// Attach the certificate of this key.
    #[must_use]
    pub fn with_certificate(mut self, certificate: Certificate) -> Self {
        self.certificate = Some(certificate);
        self
    }

    /// The private key.
    #[must_use]
    pub fn key(&self) -> &PrivateKey {
        &self.key
    }

    /// The certificate, if one was configured.
    #[must_use]
    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    /// The effective key identifier.
    ///
    /// An explicitly configured identifier wins; otherwise the certificate
    /// thumbprint is used, then an identifier derived from the RSA modulus
    /// (the first 40 characters of its base64url encoding, uppercased).
    /// Symmetric keys have no derivable identifier.
    #[must_use]
    pub fn kid(&self) -> Option<String> {
        if let Some(kid) = &self.kid {
            return Some(kid.clone());
        }

        if let Some(certificate) = &self.certificate {
            return Some(certificate.thumbprint());
        }

        match &self.key {
            PrivateKey::Rsa(key) => {
                let modulus = key.n().to_bytes_be();
                let encoded = Base64UrlUnpadded::encode_string(&modulus);
                let truncated: String = encoded.chars().take(40).collect();
                Some(truncated.to_ascii_uppercase())
            }
            PrivateKey::Symmetric(_) => None,
        }
    }

    /// The `x5t` header value, when a certificate is configured.
    #[must_use]
    pub fn x5t(&self) -> Option<String> {
        self.certificate.as_ref().map(Certificate::x5t)
    }

    /// Whether this credential can sign with the given algorithm.
    #[must_use]
    pub fn supports(&self, alg: JsonWebSignatureAlg) -> bool {
        self.key.supports(alg)
    }

    /// A signing key for the given algorithm.
    pub fn signing_key(&self, alg: JsonWebSignatureAlg) -> Result<SigningKey, InvalidAlgorithm> {
        match &self.key {
            PrivateKey::Rsa(key) => Ok(SigningKey::Asymmetric(
                AsymmetricSigningKey::from_rsa_key((**key).clone(), alg)?,
            )),
            PrivateKey::Symmetric(secret) => Ok(SigningKey::Symmetric(SymmetricKey::new_for_alg(
                secret.clone(),
                alg,
            )?)),
        }
    }

    /// A verifying key for the given algorithm.
    pub fn verifying_key(&self, alg: JsonWebSignatureAlg) -> Result<VerifyingKey, InvalidAlgorithm> {
        match &self.key {
            PrivateKey::Rsa(key) => Ok(VerifyingKey::Asymmetric(
                AsymmetricVerifyingKey::from_rsa_key(key.to_public_key(), alg)?,
            )),
            PrivateKey::Symmetric(secret) => Ok(VerifyingKey::Symmetric(
                SymmetricKey::new_for_alg(secret.clone(), alg)?,
            )),
        }
    }
}

/// A ready-to-use signing key.
pub enum SigningKey {
    Symmetric(SymmetricKey),
    Asymmetric(AsymmetricSigningKey),
}

impl signature::Signer<Signature> for SigningKey {
    fn try_sign(&self, msg: &[u8]) -> Result<Signature, signature::Error> {
        match self {
            Self::Symmetric(key) => key.try_sign(msg),
            Self::Asymmetric(key) => key.try_sign(msg),
        }
    }
}

/// A ready-to-use verifying key.
pub enum VerifyingKey {
    Symmetric(SymmetricKey),
    Asymmetric(AsymmetricVerifyingKey),
}

impl signature::Verifier<Signature> for VerifyingKey {
    fn verify(&self, msg: &[u8], signature: &Signature) -> Result<(), signature::Error> {
        match self {
            Self::Symmetric(key) => key.verify(msg, signature),
            Self::Asymmetric(key) => key.verify(msg, signature),
        }
    }
}

/// An ordered collection of signing credentials.
#[derive(Clone, Default)]
pub struct Keystore {
    inner: Arc<Vec<SigningCredential>>,
}

impl Keystore {
    /// Create a keystore from an ordered credential list; earlier
    /// credentials are preferred for signing.
    #[must_use]
    pub fn new(credentials: Vec<SigningCredential>) -> Self {
        Self {
            inner: Arc::new(credentials),
        }
    }

    /// The first credential able to sign with the given algorithm.
    #[must_use]
    pub fn signing_credential_for_algorithm(
        &self,
        alg: JsonWebSignatureAlg,
    ) -> Option<&SigningCredential> {
        self.inner.iter().find(|credential| credential.supports(alg))
    }

    /// All credentials able to verify the given algorithm, in order.
    pub fn verifying_credentials_for_algorithm(
        &self,
        alg: JsonWebSignatureAlg,
    ) -> impl Iterator<Item = &SigningCredential> {
        self.inner
            .iter()
            .filter(move |credential| credential.supports(alg))
    }

    /// Whether the keystore holds no credentials.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use signature::{Signer as _, Verifier as _};

    use super::*;

    fn rsa_credential() -> SigningCredential {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(42);
        let key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        SigningCredential::new(PrivateKey::from_rsa_key(key))
    }

    #[test]
    fn explicit_kid_wins() {
        let credential = rsa_credential().with_kid("configured");
        assert_eq!(credential.kid().as_deref(), Some("configured"));
    }

    #[test]
    fn certificate_thumbprint_kid() {
        let credential =
            rsa_credential().with_certificate(Certificate::from_der(b"not-a-real-cert".to_vec()));

        let kid = credential.kid().unwrap();
        assert_eq!(kid.len(), 40);
        assert!(kid.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(kid, kid.to_ascii_uppercase());

        // x5t is the base64url form of the same 20-byte hash.
        let x5t = credential.x5t().unwrap();
        assert_eq!(x5t.len(), 27);
    }

    #[test]
    fn modulus_derived_kid() {
        let credential = rsa_credential();
        let kid = credential.kid().unwrap();
        assert_eq!(kid.len(), 40);
        assert_eq!(kid, kid.to_ascii_uppercase());

        // Derivation is stable for the same key.
        assert_eq!(credential.kid(), Some(kid));
    }

    #[test]
    fn symmetric_credentials_have_no_derived_kid() {
        let credential = SigningCredential::new(PrivateKey::symmetric(b"secret".to_vec()));
        assert_eq!(credential.kid(), None);
    }

    #[test]
    fn keystore_picks_by_algorithm() {
        let store = Keystore::new(vec![
            SigningCredential::new(PrivateKey::symmetric(b"secret".to_vec())),
            rsa_credential(),
        ]);

        let symmetric = store
            .signing_credential_for_algorithm(JsonWebSignatureAlg::Hs256)
            .unwrap();
        assert!(matches!(symmetric.key(), PrivateKey::Symmetric(_)));

        let asymmetric = store
            .signing_credential_for_algorithm(JsonWebSignatureAlg::Rs256)
            .unwrap();
        assert!(matches!(asymmetric.key(), PrivateKey::Rsa(_)));

        let signer = asymmetric.signing_key(JsonWebSignatureAlg::Rs256).unwrap();
        let verifier = asymmetric.verifying_key(JsonWebSignatureAlg::Rs256).unwrap();
        let signature = signer.try_sign(b"message").unwrap();
        verifier.verify(b"message", &signature).unwrap();
    }
}
