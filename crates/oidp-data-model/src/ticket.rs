// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! The authentication ticket: a principal, a property envelope and a
//! validity window.
//!
//! Tickets are what the authorization endpoint issues, what authorization
//! codes and refresh tokens serialize, and what access and identity tokens
//! are minted from. The property envelope keeps the protocol-visible lists
//! (audiences, presenters, resources, scopes) as space-joined strings, the
//! exact representation used on the wire.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::principal::Principal;

/// Reserved property keys.
mod keys {
    pub const AUDIENCES: &str = ".audiences";
    pub const PRESENTERS: &str = ".presenters";
    pub const RESOURCES: &str = ".resources";
    pub const SCOPES: &str = ".scopes";
    pub const NONCE: &str = ".nonce";
    pub const USAGE: &str = ".usage";
    pub const CONFIDENTIAL: &str = ".confidential";
    pub const REDIRECT_URI: &str = ".redirect_uri";
}

/// Error returned when writing a list element containing a space.
///
/// List-valued properties are space-joined on the wire, so an element
/// containing a space cannot be represented.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("list elements must not contain spaces: {element:?}")]
pub struct InvalidListValueError {
    /// The offending element.
    pub element: String,
}

/// What a serialized ticket is used as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketUsage {
    /// An authorization code.
    AuthorizationCode,

    /// An access token.
    AccessToken,

    /// An identity token.
    IdentityToken,

    /// A refresh token.
    RefreshToken,
}

impl TicketUsage {
    /// The canonical wire string of this usage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "code",
            Self::AccessToken => "access_token",
            Self::IdentityToken => "id_token",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Parse a usage value. Matching is ASCII-case-insensitive.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        [
            Self::AuthorizationCode,
            Self::AccessToken,
            Self::IdentityToken,
            Self::RefreshToken,
        ]
        .into_iter()
        .find(|usage| value.eq_ignore_ascii_case(usage.as_str()))
    }
}

impl std::fmt::Display for TicketUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The string properties attached to a ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    items: BTreeMap<String, String>,
}

impl Properties {
    /// Get a property value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    /// Set a property value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.items.insert(key.into(), value.into());
    }

    /// Remove a property, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.items.remove(key)
    }

    /// Iterate over all properties.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    fn get_list(&self, key: &str) -> Vec<&str> {
        let mut parts: Vec<&str> = Vec::new();
        for part in self.get(key).unwrap_or_default().split(' ') {
            if !part.is_empty() && !parts.contains(&part) {
                parts.push(part);
            }
        }
        parts
    }

    fn set_list<I, V>(&mut self, key: &str, values: I) -> Result<(), InvalidListValueError>
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let mut parts: Vec<String> = Vec::new();
        for value in values {
            let value = value.into();
            if value.contains(' ') {
                return Err(InvalidListValueError { element: value });
            }
            if !value.is_empty() && !parts.contains(&value) {
                parts.push(value);
            }
        }
        self.set(key, parts.join(" "));
        Ok(())
    }

    fn has_list_value(&self, key: &str, value: &str) -> bool {
        self.get(key)
            .unwrap_or_default()
            .split(' ')
            .any(|part| part == value)
    }
}

/// A principal together with the authorization decision taken about it.
///
/// `Clone` deep-copies the property envelope and the timestamps while
/// sharing the principal, which is treated as immutable for the duration of
/// a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// The authenticated principal.
    pub principal: Arc<Principal>,

    /// The properties attached to the ticket.
    pub properties: Properties,

    /// When the ticket was issued.
    pub issued_at: Option<DateTime<Utc>>,

    /// When the ticket expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Create a ticket around a principal, with empty properties and no
    /// validity window.
    #[must_use]
    pub fn new(principal: Principal) -> Self {
        Self {
            principal: Arc::new(principal),
            properties: Properties::default(),
            issued_at: None,
            expires_at: None,
        }
    }

    /// Replace the principal of this ticket.
    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = Arc::new(principal);
    }

    /// The audiences of the ticket.
    #[must_use]
    pub fn audiences(&self) -> Vec<&str> {
        self.properties.get_list(keys::AUDIENCES)
    }

    /// Replace the audiences of the ticket.
    pub fn set_audiences<I, V>(&mut self, audiences: I) -> Result<(), InvalidListValueError>
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.properties.set_list(keys::AUDIENCES, audiences)
    }

    /// Whether the ticket lists the given audience.
    #[must_use]
    pub fn has_audience(&self, audience: &str) -> bool {
        self.properties.has_list_value(keys::AUDIENCES, audience)
    }

    /// The presenters of the ticket: the client identifiers allowed to
    /// present it.
    #[must_use]
    pub fn presenters(&self) -> Vec<&str> {
        self.properties.get_list(keys::PRESENTERS)
    }

    /// Replace the presenters of the ticket.
    pub fn set_presenters<I, V>(&mut self, presenters: I) -> Result<(), InvalidListValueError>
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.properties.set_list(keys::PRESENTERS, presenters)
    }

    /// Whether the ticket lists the given presenter.
    #[must_use]
    pub fn has_presenter(&self, presenter: &str) -> bool {
        self.properties.has_list_value(keys::PRESENTERS, presenter)
    }

    /// The resource indicators of the ticket.
    #[must_use]
    pub fn resources(&self) -> Vec<&str> {
        self.properties.get_list(keys::RESOURCES)
    }

    /// Replace the resource indicators of the ticket.
    pub fn set_resources<I, V>(&mut self, resources: I) -> Result<(), InvalidListValueError>
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.properties.set_list(keys::RESOURCES, resources)
    }

    /// Whether the ticket lists the given resource.
    #[must_use]
    pub fn has_resource(&self, resource: &str) -> bool {
        self.properties.has_list_value(keys::RESOURCES, resource)
    }

    /// The scopes of the ticket.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.properties.get_list(keys::SCOPES)
    }

    /// Replace the scopes of the ticket.
    pub fn set_scopes<I, V>(&mut self, scopes: I) -> Result<(), InvalidListValueError>
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.properties.set_list(keys::SCOPES, scopes)
    }

    /// Whether the ticket lists the given scope.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.properties.has_list_value(keys::SCOPES, scope)
    }

    /// Whether the ticket carries a scopes entry at all.
    #[must_use]
    pub fn has_scopes_entry(&self) -> bool {
        self.properties.get(keys::SCOPES).is_some()
    }

    /// The nonce attached to the ticket.
    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.properties.get(keys::NONCE)
    }

    /// Attach a nonce to the ticket.
    pub fn set_nonce(&mut self, nonce: impl Into<String>) {
        self.properties.set(keys::NONCE, nonce);
    }

    /// The redirect URI the ticket was bound to, if any.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.properties.get(keys::REDIRECT_URI)
    }

    /// Bind the ticket to a redirect URI.
    pub fn set_redirect_uri(&mut self, redirect_uri: impl Into<String>) {
        self.properties.set(keys::REDIRECT_URI, redirect_uri);
    }

    /// Remove the redirect URI binding, returning it.
    pub fn take_redirect_uri(&mut self) -> Option<String> {
        self.properties.remove(keys::REDIRECT_URI)
    }

    /// What this ticket is used as, when set to a recognized value.
    #[must_use]
    pub fn usage(&self) -> Option<TicketUsage> {
        self.properties.get(keys::USAGE).and_then(TicketUsage::parse)
    }

    /// Set the usage of this ticket.
    pub fn set_usage(&mut self, usage: TicketUsage) {
        self.properties.set(keys::USAGE, usage.as_str());
    }

    /// Whether this ticket is an authorization code.
    #[must_use]
    pub fn is_authorization_code(&self) -> bool {
        self.usage() == Some(TicketUsage::AuthorizationCode)
    }

    /// Whether this ticket is an access token.
    #[must_use]
    pub fn is_access_token(&self) -> bool {
        self.usage() == Some(TicketUsage::AccessToken)
    }

    /// Whether this ticket is an identity token.
    #[must_use]
    pub fn is_identity_token(&self) -> bool {
        self.usage() == Some(TicketUsage::IdentityToken)
    }

    /// Whether this ticket is a refresh token.
    #[must_use]
    pub fn is_refresh_token(&self) -> bool {
        self.usage() == Some(TicketUsage::RefreshToken)
    }

    /// Whether the ticket was issued to a client that authenticated itself.
    #[must_use]
    pub fn is_confidential(&self) -> bool {
        self.properties
            .get(keys::CONFIDENTIAL)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    /// Mark the ticket as issued to an authenticated client.
    pub fn set_confidential(&mut self) {
        self.properties.set(keys::CONFIDENTIAL, "true");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::{Claim, Identity, CLAIM_SUBJECT};

    fn sample_ticket() -> Ticket {
        Ticket::new(Principal::new(
            Identity::new().with_claim(Claim::new(CLAIM_SUBJECT, "user-1")),
        ))
    }

    #[test]
    fn list_round_trip_dedupes() {
        let mut ticket = sample_ticket();
        ticket
            .set_scopes(["openid", "profile", "openid", "email"])
            .unwrap();

        assert_eq!(
            ticket.properties.get(".scopes"),
            Some("openid profile email")
        );
        assert_eq!(ticket.scopes(), vec!["openid", "profile", "email"]);

        // Writing the read-back value is a fixed point.
        let scopes: Vec<String> = ticket.scopes().iter().map(ToString::to_string).collect();
        let mut other = sample_ticket();
        other.set_scopes(scopes).unwrap();
        assert_eq!(other.properties.get(".scopes"), ticket.properties.get(".scopes"));
    }

    #[test]
    fn list_elements_may_not_contain_spaces() {
        let mut ticket = sample_ticket();
        let err = ticket.set_audiences(["api-1", "bad audience"]).unwrap_err();
        assert_eq!(err.element, "bad audience");
    }

    #[test]
    fn membership_is_ordinal_and_without_dedup() {
        let mut ticket = sample_ticket();
        ticket.set_presenters(["client-1", "client-2"]).unwrap();

        assert!(ticket.has_presenter("client-1"));
        assert!(!ticket.has_presenter("Client-1"));
        assert!(!ticket.has_presenter("client-3"));
    }

    #[test]
    fn usage_comparison_is_case_insensitive() {
        let mut ticket = sample_ticket();
        ticket.properties.set(".usage", "Access_Token");

        assert!(ticket.is_access_token());
        assert!(!ticket.is_refresh_token());
        assert_eq!(ticket.usage(), Some(TicketUsage::AccessToken));

        ticket.set_usage(TicketUsage::RefreshToken);
        assert_eq!(ticket.properties.get(".usage"), Some("refresh_token"));
    }

    #[test]
    fn confidential_flag() {
        let mut ticket = sample_ticket();
        assert!(!ticket.is_confidential());

        ticket.properties.set(".confidential", "TRUE");
        assert!(ticket.is_confidential());

        ticket.properties.set(".confidential", "false");
        assert!(!ticket.is_confidential());

        ticket.set_confidential();
        assert!(ticket.is_confidential());
    }

    #[test]
    fn clone_shares_the_principal_and_copies_the_properties() {
        let mut ticket = sample_ticket();
        ticket.set_scopes(["openid"]).unwrap();

        let mut copy = ticket.clone();
        assert!(Arc::ptr_eq(&ticket.principal, &copy.principal));

        copy.set_scopes(["openid", "email"]).unwrap();
        copy.set_confidential();

        assert_eq!(ticket.scopes(), vec!["openid"]);
        assert!(!ticket.is_confidential());
    }

    #[test]
    fn serde_round_trip() {
        let mut ticket = sample_ticket();
        ticket.set_usage(TicketUsage::AuthorizationCode);
        ticket.set_scopes(["openid", "profile"]).unwrap();
        ticket.set_presenters(["client-1"]).unwrap();
        ticket.issued_at = Some(chrono::Utc::now());

        let encoded = serde_json::to_string(&ticket).unwrap();
        let decoded: Ticket = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, ticket);
    }
}
