// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

use chrono::Duration;
use url::Url;

/// Site-wide configuration of the provider core.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// The issuer identifier, written to the `iss` claim of signed tokens.
    pub issuer: Url,

    /// Time-to-live of access tokens.
    pub access_token_ttl: Duration,

    /// Time-to-live of identity tokens.
    pub id_token_ttl: Duration,

    /// Time-to-live of refresh tokens.
    pub refresh_token_ttl: Duration,

    /// Whether a refreshed token receives a fresh lifetime window.
    ///
    /// When disabled, tokens issued by the refresh token grant never outlive
    /// the refresh token that produced them.
    pub use_sliding_refresh_expiration: bool,

    /// Whether signed tokens carry an `iat` claim.
    pub issue_issued_at_claim: bool,

    /// Whether the `response_type` parameter of a token request selects the
    /// kinds of tokens returned. This is a non-standard extension and is off
    /// by default.
    pub response_type_selection: bool,
}

impl SiteConfig {
    /// A configuration with one-hour access and identity tokens, two-week
    /// refresh tokens, sliding refresh expiration, and the non-standard
    /// extensions disabled.
    #[must_use]
    pub fn new(issuer: Url) -> Self {
        Self {
            issuer,
            access_token_ttl: Duration::hours(1),
            id_token_ttl: Duration::hours(1),
            refresh_token_ttl: Duration::days(14),
            use_sliding_refresh_expiration: true,
            issue_issued_at_claim: true,
            response_type_selection: false,
        }
    }
}
