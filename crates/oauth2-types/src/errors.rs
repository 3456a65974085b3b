// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! Error codes and the JSON error body defined by [RFC 6749] and OpenID
//! Connect Core 1.0.
//!
//! [RFC 6749]: https://www.rfc-editor.org/rfc/rfc6749#section-5.2

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use url::Url;

/// Client errors returned by an authorization server.
///
/// The variants cover the error registry used by the token endpoint; each
/// one serializes as its canonical `snake_case` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientErrorCode {
    /// `invalid_request`
    ///
    /// The request is missing a required parameter, includes an invalid
    /// parameter value, includes a parameter more than once, or is otherwise
    /// malformed.
    InvalidRequest,

    /// `invalid_client`
    ///
    /// Client authentication failed (e.g., unknown client, no client
    /// authentication included, or unsupported authentication method).
    InvalidClient,

    /// `invalid_grant`
    ///
    /// The provided authorization grant (e.g., authorization code, resource
    /// owner credentials) or refresh token is invalid, expired, revoked, or
    /// was issued to another client.
    InvalidGrant,

    /// `unauthorized_client`
    ///
    /// The authenticated client is not authorized to use this authorization
    /// grant type.
    UnauthorizedClient,

    /// `unsupported_grant_type`
    ///
    /// The authorization grant type is not supported by the authorization
    /// server.
    UnsupportedGrantType,

    /// `unsupported_response_type`
    ///
    /// The authorization server does not support obtaining an authorization
    /// code using this method.
    UnsupportedResponseType,

    /// `invalid_scope`
    ///
    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,

    /// `server_error`
    ///
    /// The authorization server encountered an unexpected condition that
    /// prevented it from fulfilling the request.
    ServerError,

    /// `temporarily_unavailable`
    ///
    /// The authorization server is currently unable to handle the request
    /// because of a temporary overloading or maintenance of the server.
    TemporarilyUnavailable,
}

impl ClientErrorCode {
    /// Get the canonical string token of this error code.
    #[must_use]
    pub fn error(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
        }
    }

    /// Get the default description of this error code, used when the host
    /// did not supply one.
    #[must_use]
    pub fn default_description(self) -> &'static str {
        match self {
            Self::InvalidRequest => "The request is malformed",
            Self::InvalidClient => "Client authentication failed",
            Self::InvalidGrant => "The provided grant is invalid",
            Self::UnauthorizedClient => {
                "The client is not authorized to use this authorization grant type"
            }
            Self::UnsupportedGrantType => "The grant type is not supported",
            Self::UnsupportedResponseType => "The response type is not supported",
            Self::InvalidScope => "The requested scope is invalid",
            Self::ServerError => "The server encountered an unexpected condition",
            Self::TemporarilyUnavailable => "The server is temporarily unavailable",
        }
    }
}

impl std::fmt::Display for ClientErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.error())
    }
}

/// The JSON body used to convey a [`ClientErrorCode`] to the client.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientError {
    /// The error code.
    pub error: ClientErrorCode,

    /// A human-readable description of the error.
    pub error_description: Option<Cow<'static, str>>,

    /// A URI identifying a human-readable web page with information about
    /// the error.
    pub error_uri: Option<Url>,
}

impl ClientError {
    /// Create a new `ClientError` with a given error code and description.
    #[must_use]
    pub fn new(error: ClientErrorCode, error_description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            error,
            error_description: Some(error_description.into()),
            error_uri: None,
        }
    }

    /// Replace the description of this error.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.error_description = Some(description.into());
        self
    }

    /// Attach an error URI to this error.
    #[must_use]
    pub fn with_uri(mut self, uri: Url) -> Self {
        self.error_uri = Some(uri);
        self
    }
}

impl From<ClientErrorCode> for ClientError {
    fn from(error: ClientErrorCode) -> Self {
        Self {
            error,
            error_description: Some(Cow::Borrowed(error.default_description())),
            error_uri: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_serde_json;

    #[test]
    fn serialize_error_body() {
        let error = ClientError::from(ClientErrorCode::InvalidGrant);
        assert_serde_json(
            &error,
            serde_json::json!({
                "error": "invalid_grant",
                "error_description": "The provided grant is invalid",
            }),
        );

        let error = ClientError::new(ClientErrorCode::InvalidRequest, "grant_type is missing")
            .with_uri(Url::parse("https://op.example/errors/invalid_request").unwrap());
        assert_serde_json(
            &error,
            serde_json::json!({
                "error": "invalid_request",
                "error_description": "grant_type is missing",
                "error_uri": "https://op.example/errors/invalid_request",
            }),
        );
    }

    #[test]
    fn error_codes_round_trip() {
        for code in [
            ClientErrorCode::InvalidRequest,
            ClientErrorCode::InvalidClient,
            ClientErrorCode::InvalidGrant,
            ClientErrorCode::UnauthorizedClient,
            ClientErrorCode::UnsupportedGrantType,
            ClientErrorCode::UnsupportedResponseType,
            ClientErrorCode::InvalidScope,
            ClientErrorCode::ServerError,
            ClientErrorCode::TemporarilyUnavailable,
        ] {
            let serialized = serde_json::to_value(code).unwrap();
            assert_eq!(serialized, serde_json::Value::String(code.error().into()));
            let deserialized: ClientErrorCode = serde_json::from_value(serialized).unwrap();
            assert_eq!(deserialized, code);
        }
    }
}
