// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! Ticket serialization.
//!
//! Authorization codes, access tokens, identity tokens and refresh tokens
//! are all serialized [`Ticket`]s. The [`TicketFormat`] capability turns a
//! ticket into a wire string and back; the endpoint is configured with four
//! instances of it, one per token kind. Two implementations exist: an
//! encrypted [`OpaqueFormat`] for server-consumed tokens, and a signed
//! [`JwtFormat`] for tokens consumed by third parties.
//!
//! Every serialized ticket is stamped with the usage it was produced for; a
//! string presented as the wrong kind deserializes to `None` rather than to
//! a ticket.

#![allow(clippy::module_name_repetitions)]

use oidp_data_model::Ticket;
use oidp_jose::{JsonWebSignatureAlg, jwt::JwtDecodeError, jwt::JwtSignatureError};
use oidp_keystore::{OpenError, SealError};
use thiserror::Error;

mod jwt;
mod opaque;

pub use self::{jwt::JwtFormat, opaque::OpaqueFormat};

/// Error returned when a ticket could not be serialized.
#[derive(Debug, Error)]
pub enum ProtectError {
    #[error("the ticket's primary identity has no subject claim")]
    MissingSubject,

    #[error("no signing credential available for {alg}")]
    NoSigningCredential { alg: JsonWebSignatureAlg },

    #[error("failed to sign the token")]
    Signature(#[from] JwtSignatureError),

    #[error("failed to serialize the ticket")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to seal the ticket")]
    Seal(#[from] SealError),
}

/// Error returned when a wire string could not be read back.
///
/// A structurally valid token of the wrong usage is not an error; it
/// deserializes to `None`.
#[derive(Debug, Error)]
pub enum UnprotectError {
    #[error("failed to decode the token")]
    Decode(#[from] JwtDecodeError),

    #[error("the token was signed with an unexpected algorithm")]
    AlgorithmMismatch,

    #[error("the token signature could not be verified")]
    Signature,

    #[error("the token payload is malformed")]
    MalformedPayload,

    #[error("failed to open the token")]
    Open(#[from] OpenError),

    #[error("failed to deserialize the ticket")]
    Deserialization(#[from] serde_json::Error),
}

/// Serializes tickets to wire strings and back.
pub trait TicketFormat: Send + Sync {
    /// Serialize a ticket, stamping it with this format's usage.
    fn protect(&self, ticket: &Ticket) -> Result<String, ProtectError>;

    /// Deserialize a wire string.
    ///
    /// Returns `Ok(None)` when the string is a valid token of another
    /// usage.
    fn unprotect(&self, value: &str) -> Result<Option<Ticket>, UnprotectError>;
}
