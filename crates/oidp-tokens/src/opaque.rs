// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

use oidp_data_model::{Ticket, TicketUsage};
use oidp_keystore::Encrypter;

use crate::{ProtectError, TicketFormat, UnprotectError};

/// An encrypted, authenticated ticket encoding.
///
/// The whole ticket is serialized and protected with the configured
/// [`Encrypter`]; nothing about it is readable without the key. This is the
/// preferred format for authorization codes and refresh tokens, which only
/// the server itself reads back.
pub struct OpaqueFormat {
    encrypter: Encrypter,
    usage: TicketUsage,
}

impl OpaqueFormat {
    /// Create a format protecting tickets of the given usage.
    #[must_use]
    pub fn new(encrypter: Encrypter, usage: TicketUsage) -> Self {
        Self { encrypter, usage }
    }
}

impl TicketFormat for OpaqueFormat {
    fn protect(&self, ticket: &Ticket) -> Result<String, ProtectError> {
        let mut ticket = ticket.clone();
        ticket.set_usage(self.usage);

        let serialized = serde_json::to_vec(&ticket)?;
        Ok(self.encrypter.seal(&serialized)?)
    }

    fn unprotect(&self, value: &str) -> Result<Option<Ticket>, UnprotectError> {
        let opened = self.encrypter.open(value)?;
        let ticket: Ticket = serde_json::from_slice(&opened)?;

        if ticket.usage() != Some(self.usage) {
            return Ok(None);
        }

        Ok(Some(ticket))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use oidp_data_model::{Claim, Identity, Principal, CLAIM_SUBJECT};

    use super::*;

    fn sample_ticket() -> Ticket {
        let mut ticket = Ticket::new(Principal::new(
            Identity::new().with_claim(Claim::new(CLAIM_SUBJECT, "user-1")),
        ));
        ticket.set_scopes(["openid", "profile"]).unwrap();
        ticket.set_presenters(["client-1"]).unwrap();
        ticket.set_redirect_uri("https://app/cb");
        let issued = Utc.with_ymd_and_hms(2022, 1, 16, 14, 40, 0).unwrap();
        ticket.issued_at = Some(issued);
        ticket.expires_at = Some(issued + Duration::minutes(5));
        ticket
    }

    #[test]
    fn round_trip() {
        let format = OpaqueFormat::new(
            Encrypter::new(&[0x42; 32]),
            TicketUsage::AuthorizationCode,
        );

        let ticket = sample_ticket();
        let protected = format.protect(&ticket).unwrap();
        let unprotected = format.unprotect(&protected).unwrap().unwrap();

        assert_eq!(unprotected.scopes(), ticket.scopes());
        assert_eq!(unprotected.presenters(), ticket.presenters());
        assert_eq!(unprotected.redirect_uri(), ticket.redirect_uri());
        assert_eq!(unprotected.issued_at, ticket.issued_at);
        assert_eq!(unprotected.expires_at, ticket.expires_at);
        assert_eq!(
            unprotected.principal.primary().subject(),
            Some("user-1")
        );
        assert!(unprotected.is_authorization_code());
    }

    #[test]
    fn usage_mismatch_yields_none() {
        let encrypter = Encrypter::new(&[0x42; 32]);
        let code_format = OpaqueFormat::new(encrypter.clone(), TicketUsage::AuthorizationCode);
        let refresh_format = OpaqueFormat::new(encrypter, TicketUsage::RefreshToken);

        let protected = code_format.protect(&sample_ticket()).unwrap();
        assert!(refresh_format.unprotect(&protected).unwrap().is_none());
    }

    #[test]
    fn garbage_is_an_error() {
        let format = OpaqueFormat::new(Encrypter::new(&[0x42; 32]), TicketUsage::RefreshToken);
        format.unprotect("not-a-token").unwrap_err();
    }

    #[test]
    fn principal_is_shared_until_serialized() {
        let ticket = sample_ticket();
        let copy = ticket.clone();
        assert!(Arc::ptr_eq(&ticket.principal, &copy.principal));
    }
}
