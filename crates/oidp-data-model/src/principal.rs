// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! Authenticated identities and their claims.
//!
//! A [`Principal`] aggregates one or more [`Identity`] values; each identity
//! carries a flat list of [`Claim`]s and may delegate to another identity
//! through its actor chain (token-exchange style delegation). The chain is a
//! list, never a cycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The claim kind holding the subject identifier.
pub const CLAIM_SUBJECT: &str = "sub";

/// The claim property listing the token kinds a claim may be written to.
///
/// The value is a space-separated set; membership is tested ordinally.
pub const CLAIM_DESTINATION: &str = "destination";

/// A single claim: a kind, a value, and optional string properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// The claim kind, e.g. `sub` or `name`.
    pub kind: String,

    /// The claim value.
    pub value: String,

    /// Additional properties attached to the claim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Claim {
    /// Create a new claim with no properties.
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Attach a property to the claim.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Shorthand for setting the `destination` property.
    #[must_use]
    pub fn with_destinations<I, D>(self, destinations: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        let joined = destinations
            .into_iter()
            .map(Into::into)
            .collect::<Vec<_>>()
            .join(" ");
        self.with_property(CLAIM_DESTINATION, joined)
    }

    /// Whether the claim lists the given destination.
    ///
    /// Claims without a `destination` property have no destinations.
    #[must_use]
    pub fn has_destination(&self, destination: &str) -> bool {
        self.properties
            .get(CLAIM_DESTINATION)
            .is_some_and(|value| value.split(' ').any(|part| part == destination))
    }
}

/// An authenticated identity: a claim list, plus an optional actor identity
/// on whose behalf this one acts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The claims carried by this identity.
    pub claims: Vec<Claim>,

    /// The next link of the actor chain, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Box<Identity>>,
}

impl Identity {
    /// Create an empty identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a claim to the identity.
    #[must_use]
    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    /// Set the actor of this identity.
    #[must_use]
    pub fn with_actor(mut self, actor: Identity) -> Self {
        self.actor = Some(Box::new(actor));
        self
    }

    /// The value of the first claim of the given kind.
    #[must_use]
    pub fn claim(&self, kind: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|claim| claim.kind == kind)
            .map(|claim| claim.value.as_str())
    }

    /// The subject identifier of this identity.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claim(CLAIM_SUBJECT)
    }

    /// Clone this identity, keeping only the claims accepted by the filter.
    ///
    /// The filter is applied transitively through the actor chain. The
    /// returned identity is fully independent of the original.
    #[must_use]
    pub fn clone_filtered(&self, filter: &dyn Fn(&Claim) -> bool) -> Self {
        Self {
            claims: self
                .claims
                .iter()
                .filter(|claim| filter(claim))
                .cloned()
                .collect(),
            actor: self
                .actor
                .as_ref()
                .map(|actor| Box::new(actor.clone_filtered(filter))),
        }
    }
}

/// A principal: one or more identities, the first of which is primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    identities: Vec<Identity>,
}

impl Principal {
    /// Create a principal with a single identity.
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            identities: vec![identity],
        }
    }

    /// Add a secondary identity to the principal.
    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identities.push(identity);
        self
    }

    /// The primary identity.
    #[must_use]
    pub fn primary(&self) -> &Identity {
        &self.identities[0]
    }

    /// All identities, primary first.
    #[must_use]
    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    /// Clone this principal, keeping only the claims accepted by the
    /// filter; see [`Identity::clone_filtered`].
    #[must_use]
    pub fn clone_filtered(&self, filter: impl Fn(&Claim) -> bool) -> Self {
        Self {
            identities: self
                .identities
                .iter()
                .map(|identity| identity.clone_filtered(&filter))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_principal() -> Principal {
        let actor = Identity::new()
            .with_claim(Claim::new(CLAIM_SUBJECT, "service-1"))
            .with_claim(Claim::new("role", "relay").with_destinations(["access_token"]));

        let identity = Identity::new()
            .with_claim(Claim::new(CLAIM_SUBJECT, "user-1"))
            .with_claim(Claim::new("name", "Alice").with_destinations(["id_token"]))
            .with_claim(Claim::new("secret", "do-not-leak"))
            .with_actor(actor);

        Principal::new(identity)
    }

    #[test]
    fn destination_membership_is_ordinal() {
        let claim = Claim::new("name", "Alice").with_destinations(["id_token", "access_token"]);
        assert!(claim.has_destination("id_token"));
        assert!(claim.has_destination("access_token"));
        assert!(!claim.has_destination("ID_TOKEN"));
        assert!(!claim.has_destination("token"));

        let bare = Claim::new("name", "Alice");
        assert!(!bare.has_destination("id_token"));
    }

    #[test]
    fn filtered_clone_is_a_subset() {
        let principal = sample_principal();
        let clone = principal.clone_filtered(|claim| claim.has_destination("id_token"));

        for identity in clone.identities() {
            for claim in &identity.claims {
                assert!(principal
                    .primary()
                    .claims
                    .iter()
                    .any(|original| original == claim));
            }
        }

        assert_eq!(clone.primary().claims.len(), 1);
        assert_eq!(clone.primary().claim("name"), Some("Alice"));
    }

    #[test]
    fn filtered_clone_applies_through_the_actor_chain() {
        let principal = sample_principal();
        let clone = principal.clone_filtered(|claim| claim.has_destination("access_token"));

        let actor = clone.primary().actor.as_ref().unwrap();
        assert_eq!(actor.claim("role"), Some("relay"));
        assert_eq!(actor.claim(CLAIM_SUBJECT), None);
    }

    #[test]
    fn mutating_the_clone_leaves_the_original_intact() {
        let principal = sample_principal();
        let mut clone = principal.clone_filtered(|_| true);

        clone.identities[0].claims.clear();
        clone.identities[0].actor = None;

        assert_eq!(principal.primary().claims.len(), 3);
        assert!(principal.primary().actor.is_some());
    }
}
