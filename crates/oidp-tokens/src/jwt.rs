// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

use oidp_data_model::{CLAIM_SUBJECT, Claim, Identity, Principal, Ticket, TicketUsage};
use oidp_jose::{
    JsonWebSignatureAlg,
    jwt::{JsonWebSignatureHeader, Jwt},
};
use oidp_keystore::Keystore;
use serde_json::{Map, Value, json};
use url::Url;

use crate::{ProtectError, TicketFormat, UnprotectError};

/// Claim names with a dedicated mapping; everything else flattens into the
/// payload directly.
mod names {
    pub const ISS: &str = "iss";
    pub const SUB: &str = "sub";
    pub const AUD: &str = "aud";
    pub const NBF: &str = "nbf";
    pub const EXP: &str = "exp";
    pub const IAT: &str = "iat";
    pub const NONCE: &str = "nonce";
    pub const AZP: &str = "azp";
    pub const SCOPE: &str = "scope";
    pub const USAGE: &str = "usage";
    pub const ACT: &str = "act";
    pub const PROPS: &str = "props";

    pub const RESERVED: [&str; 12] = [
        ISS, SUB, AUD, NBF, EXP, IAT, NONCE, AZP, SCOPE, USAGE, ACT, PROPS,
    ];
}

/// Ticket properties carried by a dedicated claim instead of the `props`
/// object.
const MAPPED_PROPERTIES: [&str; 4] = [".usage", ".scopes", ".audiences", ".nonce"];

/// A signed JWT ticket encoding.
///
/// The payload carries the registered claims (`iss`, `sub`, `aud`, `nbf`,
/// `exp`, and `iat` when enabled), the ticket's scopes, nonce and usage, the
/// primary identity's remaining claims flattened, the actor chain as a
/// nested `act` claim, and the remaining ticket properties under a private
/// `props` claim so that the reverse path loses nothing.
pub struct JwtFormat {
    keystore: Keystore,
    alg: JsonWebSignatureAlg,
    issuer: Url,
    usage: TicketUsage,
    issue_issued_at_claim: bool,
}

impl JwtFormat {
    /// Create a format signing tickets of the given usage.
    #[must_use]
    pub fn new(
        keystore: Keystore,
        alg: JsonWebSignatureAlg,
        issuer: Url,
        usage: TicketUsage,
    ) -> Self {
        Self {
            keystore,
            alg,
            issuer,
            usage,
            issue_issued_at_claim: false,
        }
    }

    /// Also emit an `iat` claim mirroring `nbf`.
    #[must_use]
    pub fn with_issued_at_claim(mut self) -> Self {
        self.issue_issued_at_claim = true;
        self
    }
}

fn actor_claim(identity: &Identity) -> Value {
    let mut object = Map::new();

    for claim in &identity.claims {
        if !names::RESERVED.contains(&claim.kind.as_str()) || claim.kind == names::SUB {
            object
                .entry(claim.kind.clone())
                .or_insert_with(|| Value::String(claim.value.clone()));
        }
    }

    if let Some(actor) = &identity.actor {
        object.insert(names::ACT.to_owned(), actor_claim(actor));
    }

    Value::Object(object)
}

fn parse_actor(value: &Value) -> Result<Identity, UnprotectError> {
    let object = value.as_object().ok_or(UnprotectError::MalformedPayload)?;

    let mut identity = Identity::new();
    for (name, value) in object {
        if name == names::ACT {
            continue;
        }
        if let Value::String(value) = value {
            identity = identity.with_claim(Claim::new(name.as_str(), value.as_str()));
        }
    }

    if let Some(actor) = object.get(names::ACT) {
        identity = identity.with_actor(parse_actor(actor)?);
    }

    Ok(identity)
}

impl TicketFormat for JwtFormat {
    fn protect(&self, ticket: &Ticket) -> Result<String, ProtectError> {
        let credential = self
            .keystore
            .signing_credential_for_algorithm(self.alg)
            .ok_or(ProtectError::NoSigningCredential { alg: self.alg })?;

        let identity = ticket.principal.primary();
        let subject = identity.subject().ok_or(ProtectError::MissingSubject)?;

        let mut claims = Map::new();
        claims.insert(names::ISS.to_owned(), json!(self.issuer.as_str()));
        claims.insert(names::SUB.to_owned(), json!(subject));

        let audiences = ticket.audiences();
        match audiences.as_slice() {
            [] => {}
            [audience] => {
                claims.insert(names::AUD.to_owned(), json!(audience));
            }
            audiences => {
                claims.insert(names::AUD.to_owned(), json!(audiences));
            }
        }

        if let Some(issued_at) = ticket.issued_at {
            claims.insert(names::NBF.to_owned(), json!(issued_at.timestamp()));
            if self.issue_issued_at_claim {
                claims.insert(names::IAT.to_owned(), json!(issued_at.timestamp()));
            }
        }

        if let Some(expires_at) = ticket.expires_at {
            claims.insert(names::EXP.to_owned(), json!(expires_at.timestamp()));
        }

        claims.insert(names::USAGE.to_owned(), json!(self.usage.as_str()));

        if let Some(presenter) = ticket.presenters().first() {
            claims.insert(names::AZP.to_owned(), json!(presenter));
        }

        if ticket.has_scopes_entry() {
            claims.insert(names::SCOPE.to_owned(), json!(ticket.scopes().join(" ")));
        }

        if let Some(nonce) = ticket.nonce() {
            claims.insert(names::NONCE.to_owned(), json!(nonce));
        }

        for claim in &identity.claims {
            if names::RESERVED.contains(&claim.kind.as_str()) {
                continue;
            }
            claims
                .entry(claim.kind.clone())
                .or_insert_with(|| Value::String(claim.value.clone()));
        }

        if let Some(actor) = &identity.actor {
            claims.insert(names::ACT.to_owned(), actor_claim(actor));
        }

        let props: Map<String, Value> = ticket
            .properties
            .iter()
            .filter(|(key, _)| !MAPPED_PROPERTIES.contains(key))
            .map(|(key, value)| (key.to_owned(), Value::String(value.to_owned())))
            .collect();
        if !props.is_empty() {
            claims.insert(names::PROPS.to_owned(), Value::Object(props));
        }

        let mut header = JsonWebSignatureHeader::new(self.alg).with_typ("JWT");
        if let Some(kid) = credential.kid() {
            header = header.with_kid(kid);
        }
        if let Some(x5t) = credential.x5t() {
            header = header.with_x5t(x5t);
        }

        let key = credential
            .signing_key(self.alg)
            .map_err(|_| ProtectError::NoSigningCredential { alg: self.alg })?;
        let jwt = Jwt::sign(header, Value::Object(claims), &key)?;

        Ok(jwt.into_string())
    }

    fn unprotect(&self, value: &str) -> Result<Option<Ticket>, UnprotectError> {
        let jwt: Jwt<Map<String, Value>> = value.try_into()?;

        if *jwt.header().alg() != self.alg {
            return Err(UnprotectError::AlgorithmMismatch);
        }

        let verified = self
            .keystore
            .verifying_credentials_for_algorithm(self.alg)
            .filter_map(|credential| credential.verifying_key(self.alg).ok())
            .any(|key| jwt.verify(&key).is_ok());
        if !verified {
            return Err(UnprotectError::Signature);
        }

        let payload = jwt.payload();

        let usage = payload
            .get(names::USAGE)
            .and_then(Value::as_str)
            .and_then(TicketUsage::parse);
        if usage != Some(self.usage) {
            return Ok(None);
        }

        let subject = payload
            .get(names::SUB)
            .and_then(Value::as_str)
            .ok_or(UnprotectError::MalformedPayload)?;

        let mut identity = Identity::new().with_claim(Claim::new(CLAIM_SUBJECT, subject));
        for (name, value) in payload {
            if names::RESERVED.contains(&name.as_str()) {
                continue;
            }
            if let Value::String(value) = value {
                identity = identity.with_claim(Claim::new(name.as_str(), value.as_str()));
            }
        }
        if let Some(actor) = payload.get(names::ACT) {
            identity = identity.with_actor(parse_actor(actor)?);
        }

        let mut ticket = Ticket::new(Principal::new(identity));

        if let Some(Value::Object(props)) = payload.get(names::PROPS) {
            for (key, value) in props {
                if let Value::String(value) = value {
                    ticket.properties.set(key.as_str(), value.as_str());
                }
            }
        }

        ticket.set_usage(self.usage);

        if let Some(scope) = payload.get(names::SCOPE).and_then(Value::as_str) {
            ticket
                .set_scopes(scope.split(' ').filter(|part| !part.is_empty()))
                .map_err(|_| UnprotectError::MalformedPayload)?;
        }

        match payload.get(names::AUD) {
            None => {}
            Some(Value::String(audience)) => {
                ticket
                    .set_audiences([audience.as_str()])
                    .map_err(|_| UnprotectError::MalformedPayload)?;
            }
            Some(Value::Array(audiences)) => {
                let audiences: Vec<&str> = audiences.iter().filter_map(Value::as_str).collect();
                ticket
                    .set_audiences(audiences)
                    .map_err(|_| UnprotectError::MalformedPayload)?;
            }
            Some(_) => return Err(UnprotectError::MalformedPayload),
        }

        if let Some(nonce) = payload.get(names::NONCE).and_then(Value::as_str) {
            ticket.set_nonce(nonce);
        }

        if let Some(nbf) = payload.get(names::NBF).and_then(Value::as_i64) {
            ticket.issued_at = chrono::DateTime::from_timestamp(nbf, 0);
        }

        if let Some(exp) = payload.get(names::EXP).and_then(Value::as_i64) {
            ticket.expires_at = chrono::DateTime::from_timestamp(exp, 0);
        }

        Ok(Some(ticket))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use oidp_keystore::{PrivateKey, SigningCredential};
    use rand::SeedableRng;

    use super::*;

    fn symmetric_keystore() -> Keystore {
        Keystore::new(vec![
            SigningCredential::new(PrivateKey::symmetric(b"a-shared-secret".to_vec()))
                .with_kid("sym-1"),
        ])
    }

    fn format(keystore: Keystore, alg: JsonWebSignatureAlg, usage: TicketUsage) -> JwtFormat {
        JwtFormat::new(
            keystore,
            alg,
            Url::parse("https://op.example/").unwrap(),
            usage,
        )
    }

    fn sample_ticket() -> Ticket {
        let actor = Identity::new().with_claim(Claim::new(CLAIM_SUBJECT, "service-1"));
        let identity = Identity::new()
            .with_claim(Claim::new(CLAIM_SUBJECT, "user-1"))
            .with_claim(Claim::new("name", "Alice"))
            .with_actor(actor);

        let mut ticket = Ticket::new(Principal::new(identity));
        ticket.set_scopes(["openid", "profile"]).unwrap();
        ticket.set_presenters(["client-1"]).unwrap();
        ticket.set_resources(["api-1"]).unwrap();
        ticket.set_nonce("n-0S6_WzA2Mj");
        let issued = Utc.with_ymd_and_hms(2022, 1, 16, 14, 40, 0).unwrap();
        ticket.issued_at = Some(issued);
        ticket.expires_at = Some(issued + Duration::hours(1));
        ticket
    }

    #[test]
    fn payload_shape() {
        let format = format(
            symmetric_keystore(),
            JsonWebSignatureAlg::Hs256,
            TicketUsage::AccessToken,
        );

        let mut ticket = sample_ticket();
        ticket.set_audiences(["api-1"]).unwrap();

        let token = format.protect(&ticket).unwrap();
        let jwt: Jwt<Map<String, Value>> = token.as_str().try_into().unwrap();

        assert_eq!(jwt.header().typ(), Some("JWT"));
        assert_eq!(jwt.header().kid(), Some("sym-1"));

        let payload = jwt.payload();
        assert_eq!(payload["iss"], "https://op.example/");
        assert_eq!(payload["sub"], "user-1");
        // A single audience is a plain string.
        assert_eq!(payload["aud"], "api-1");
        assert_eq!(payload["usage"], "access_token");
        assert_eq!(payload["azp"], "client-1");
        assert_eq!(payload["scope"], "openid profile");
        assert_eq!(payload["nonce"], "n-0S6_WzA2Mj");
        assert_eq!(payload["name"], "Alice");
        assert_eq!(payload["act"]["sub"], "service-1");
        assert_eq!(payload["nbf"], 1_642_344_000);
        assert_eq!(payload["exp"], 1_642_344_000 + 3600);
        assert_eq!(payload["props"][".presenters"], "client-1");
        assert_eq!(payload["props"][".resources"], "api-1");
        assert!(payload.get("iat").is_none());
    }

    #[test]
    fn multiple_audiences_are_an_array() {
        let format = format(
            symmetric_keystore(),
            JsonWebSignatureAlg::Hs256,
            TicketUsage::AccessToken,
        );

        let mut ticket = sample_ticket();
        ticket.set_audiences(["api-1", "api-2"]).unwrap();

        let token = format.protect(&ticket).unwrap();
        let jwt: Jwt<Map<String, Value>> = token.as_str().try_into().unwrap();
        assert_eq!(jwt.payload()["aud"], json!(["api-1", "api-2"]));
    }

    #[test]
    fn iat_claim_is_opt_in() {
        let format = format(
            symmetric_keystore(),
            JsonWebSignatureAlg::Hs256,
            TicketUsage::AccessToken,
        )
        .with_issued_at_claim();

        let token = format.protect(&sample_ticket()).unwrap();
        let jwt: Jwt<Map<String, Value>> = token.as_str().try_into().unwrap();
        assert_eq!(jwt.payload()["iat"], jwt.payload()["nbf"]);
    }

    #[test]
    fn round_trip() {
        let format = format(
            symmetric_keystore(),
            JsonWebSignatureAlg::Hs256,
            TicketUsage::AccessToken,
        );

        let ticket = sample_ticket();
        let token = format.protect(&ticket).unwrap();
        let unprotected = format.unprotect(&token).unwrap().unwrap();

        assert_eq!(unprotected.principal.primary().subject(), Some("user-1"));
        assert_eq!(unprotected.principal.primary().claim("name"), Some("Alice"));
        let actor = unprotected.principal.primary().actor.as_ref().unwrap();
        assert_eq!(actor.subject(), Some("service-1"));

        assert_eq!(unprotected.scopes(), ticket.scopes());
        assert_eq!(unprotected.presenters(), ticket.presenters());
        assert_eq!(unprotected.resources(), ticket.resources());
        assert_eq!(unprotected.nonce(), ticket.nonce());
        assert_eq!(unprotected.issued_at, ticket.issued_at);
        assert_eq!(unprotected.expires_at, ticket.expires_at);
        assert!(unprotected.is_access_token());
    }

    #[test]
    fn usage_mismatch_yields_none() {
        let access = format(
            symmetric_keystore(),
            JsonWebSignatureAlg::Hs256,
            TicketUsage::AccessToken,
        );
        let identity = format(
            symmetric_keystore(),
            JsonWebSignatureAlg::Hs256,
            TicketUsage::IdentityToken,
        );

        let token = access.protect(&sample_ticket()).unwrap();
        assert!(identity.unprotect(&token).unwrap().is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let format_a = format(
            symmetric_keystore(),
            JsonWebSignatureAlg::Hs256,
            TicketUsage::AccessToken,
        );
        let format_b = JwtFormat::new(
            Keystore::new(vec![SigningCredential::new(PrivateKey::symmetric(
                b"another-secret".to_vec(),
            ))]),
            JsonWebSignatureAlg::Hs256,
            Url::parse("https://op.example/").unwrap(),
            TicketUsage::AccessToken,
        );

        let token = format_a.protect(&sample_ticket()).unwrap();
        assert!(matches!(
            format_b.unprotect(&token),
            Err(UnprotectError::Signature)
        ));
    }

    #[test]
    fn rs256_round_trip_with_derived_kid() {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(42);
        let key = rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let keystore = Keystore::new(vec![SigningCredential::new(PrivateKey::from_rsa_key(key))]);

        let format = format(
            keystore,
            JsonWebSignatureAlg::Rs256,
            TicketUsage::IdentityToken,
        );

        let token = format.protect(&sample_ticket()).unwrap();
        let jwt: Jwt<Map<String, Value>> = token.as_str().try_into().unwrap();
        let kid = jwt.header().kid().unwrap();
        assert_eq!(kid.len(), 40);

        let unprotected = format.unprotect(&token).unwrap().unwrap();
        assert!(unprotected.is_identity_token());
    }

    #[test]
    fn missing_subject_is_a_protect_error() {
        let format = format(
            symmetric_keystore(),
            JsonWebSignatureAlg::Hs256,
            TicketUsage::AccessToken,
        );

        let ticket = Ticket::new(Principal::new(
            Identity::new().with_claim(Claim::new("name", "Alice")),
        ));
        assert!(matches!(
            format.protect(&ticket),
            Err(ProtectError::MissingSubject)
        ));
    }
}
