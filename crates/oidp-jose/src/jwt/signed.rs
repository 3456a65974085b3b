// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Serialize, de::DeserializeOwned};
use signature::{Signer, Verifier};
use thiserror::Error;

use super::{header::JsonWebSignatureHeader, raw};
use crate::jwa::Signature;

/// A decoded JWT in compact serialization: the raw string, its header and
/// its typed payload.
#[derive(Clone, PartialEq, Eq)]
pub struct Jwt<T> {
    raw: raw::RawJwt,
    header: JsonWebSignatureHeader,
    payload: T,
}

impl<T> std::fmt::Display for Jwt<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Jwt<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwt")
            .field("header", &self.header)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum JwtDecodeError {
    #[error(transparent)]
    RawDecode(#[from] raw::DecodeError),

    #[error("failed to decode a base64 part")]
    Base64(#[from] base64ct::Error),

    #[error("failed to decode a JSON part")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum JwtSignatureError {
    #[error("failed to serialize a part to JSON")]
    Json(#[from] serde_json::Error),

    #[error("failed to sign")]
    Signature(#[from] signature::Error),
}

#[derive(Debug, Error)]
pub enum JwtVerificationError {
    #[error("failed to decode the signature")]
    Base64(#[from] base64ct::Error),

    #[error("signature verification failed")]
    Signature(#[from] signature::Error),
}

impl<T> Jwt<T> {
    #[must_use]
    pub fn header(&self) -> &JsonWebSignatureHeader {
        &self.header
    }

    #[must_use]
    pub fn payload(&self) -> &T {
        &self.payload
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.raw.into()
    }

    #[must_use]
    pub fn into_parts(self) -> (JsonWebSignatureHeader, T) {
        (self.header, self.payload)
    }

    /// Verify the signature of this JWT with the given key.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not verify, or if it is not
    /// valid base64.
    pub fn verify<K>(&self, key: &K) -> Result<(), JwtVerificationError>
    where
        K: Verifier<Signature>,
    {
        let signature = Base64UrlUnpadded::decode_vec(self.raw.signature())?;
        let signature = Signature::new(signature);

        key.verify(self.raw.signed_part().as_bytes(), &signature)?;

        Ok(())
    }
}

impl<T: Serialize> Jwt<T> {
    /// Sign a payload with the given header and key, producing the compact
    /// serialization.
    ///
    /// # Errors
    ///
    /// Returns an error if a part could not be serialized, or if the signing
    /// operation failed.
    pub fn sign<K>(
        header: JsonWebSignatureHeader,
        payload: T,
        key: &K,
    ) -> Result<Self, JwtSignatureError>
    where
        K: Signer<Signature>,
    {
        let encoded_header = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header)?);
        let encoded_payload = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&payload)?);
        let signed_part = format!("{encoded_header}.{encoded_payload}");

        let signature = key.try_sign(signed_part.as_bytes())?;
        let encoded_signature = Base64UrlUnpadded::encode_string(signature.as_bytes());

        let raw = raw::RawJwt::new(format!("{signed_part}.{encoded_signature}"));

        Ok(Self {
            raw,
            header,
            payload,
        })
    }
}

impl<T: DeserializeOwned> TryFrom<&str> for Jwt<T> {
    type Error = JwtDecodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let raw = raw::RawJwt::try_from(value)?;

        let header = Base64UrlUnpadded::decode_vec(raw.header())?;
        let header = serde_json::from_slice(&header)?;

        let payload = Base64UrlUnpadded::decode_vec(raw.payload())?;
        let payload = serde_json::from_slice(&payload)?;

        Ok(Self {
            raw,
            header,
            payload,
        })
    }
}

impl<T: DeserializeOwned> TryFrom<String> for Jwt<T> {
    type Error = JwtDecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.as_str().try_into()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use serde_json::json;

    use super::*;
    use crate::{
        JsonWebSignatureAlg,
        jwa::{AsymmetricSigningKey, AsymmetricVerifyingKey, SymmetricKey},
    };

    #[test]
    fn hs256_sign_and_verify() {
        let key = SymmetricKey::new_for_alg(b"a-shared-secret".to_vec(), JsonWebSignatureAlg::Hs256)
            .unwrap();
        let header = JsonWebSignatureHeader::new(JsonWebSignatureAlg::Hs256)
            .with_typ("JWT")
            .with_kid("k1");

        let jwt = Jwt::sign(header, json!({"sub": "user-1"}), &key).unwrap();
        jwt.verify(&key).unwrap();

        let decoded: Jwt<serde_json::Value> = jwt.as_str().try_into().unwrap();
        assert_eq!(decoded.header().kid(), Some("k1"));
        assert_eq!(decoded.payload()["sub"], "user-1");

        let other =
            SymmetricKey::new_for_alg(b"another-secret".to_vec(), JsonWebSignatureAlg::Hs256)
                .unwrap();
        decoded.verify(&other).unwrap_err();
    }

    #[test]
    fn rs256_sign_and_verify() {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(42);
        let private_key = rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = private_key.to_public_key();

        let signing_key =
            AsymmetricSigningKey::from_rsa_key(private_key, JsonWebSignatureAlg::Rs256).unwrap();
        let verifying_key =
            AsymmetricVerifyingKey::from_rsa_key(public_key, JsonWebSignatureAlg::Rs256).unwrap();

        let header = JsonWebSignatureHeader::new(JsonWebSignatureAlg::Rs256).with_typ("JWT");
        let jwt = Jwt::sign(header, json!({"aud": ["a", "b"]}), &signing_key).unwrap();

        jwt.verify(&verifying_key).unwrap();
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for token in ["", "onlyonepart", "one.two", "a.b.c.d", "!.!.!"] {
            let result: Result<Jwt<serde_json::Value>, _> = token.try_into();
            assert!(result.is_err(), "token {token:?} should not decode");
        }
    }
}
