// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

use serde::Serialize;
use serde_with::skip_serializing_none;

/// The parameters of a successful token response.
///
/// `expires_in` is a decimal string, matching the all-parameters-are-strings
/// convention of the protocol message encoding.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
    /// The serialized access token.
    pub access_token: Option<String>,

    /// The access token type, always `Bearer` when an access token is
    /// present.
    pub token_type: Option<String>,

    /// The access token lifetime, in seconds, as a decimal string.
    pub expires_in: Option<String>,

    /// The serialized identity token.
    pub id_token: Option<String>,

    /// The serialized refresh token.
    pub refresh_token: Option<String>,

    /// The granted scopes, space-joined.
    pub scope: Option<String>,

    /// The granted resource indicators, space-joined.
    pub resource: Option<String>,
}

impl TokenResponse {
    /// Convert to a JSON object for the response payload hook.
    ///
    /// # Panics
    ///
    /// Never panics: the struct always serializes to a JSON object.
    #[must_use]
    pub fn into_map(self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => unreachable!("a token response serializes to an object"),
        }
    }
}
