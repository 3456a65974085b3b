// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

use serde::{Deserialize, Serialize};

/// The JSON Web Signature algorithms supported by this crate, serialized as
/// their RFC 7518 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JsonWebSignatureAlg {
    /// HMAC using SHA-256
    #[serde(rename = "HS256")]
    Hs256,

    /// HMAC using SHA-384
    #[serde(rename = "HS384")]
    Hs384,

    /// HMAC using SHA-512
    #[serde(rename = "HS512")]
    Hs512,

    /// RSASSA-PKCS1-v1_5 using SHA-256
    #[serde(rename = "RS256")]
    Rs256,

    /// RSASSA-PKCS1-v1_5 using SHA-384
    #[serde(rename = "RS384")]
    Rs384,

    /// RSASSA-PKCS1-v1_5 using SHA-512
    #[serde(rename = "RS512")]
    Rs512,
}

impl JsonWebSignatureAlg {
    /// Whether the algorithm uses a shared secret.
    #[must_use]
    pub fn is_symmetric(self) -> bool {
        matches!(self, Self::Hs256 | Self::Hs384 | Self::Hs512)
    }

    /// The RFC 7518 name of the algorithm.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
        }
    }
}

impl std::fmt::Display for JsonWebSignatureAlg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
