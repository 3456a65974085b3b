// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! The extension protocol between the endpoint driver and the host
//! application.
//!
//! Each extension point is an async method of the [`Provider`] trait,
//! invoked in a fixed, observable order. A handler expresses its outcome by
//! returning a tagged variant; a [`Rejection`] without an explicit error
//! code resolves to the extension point's default code. The default method
//! bodies are secure by default: authentication and validation reject,
//! the reconstruction grants pass the incoming ticket through unchanged,
//! and the remaining grants decline to handle the request.

use std::borrow::Cow;

use async_trait::async_trait;
use bytes::Bytes;
use oauth2_types::{ClientError, ClientErrorCode, OidcMessage};
use oidp_data_model::Ticket;
use serde_json::{Map, Value};
use url::Url;

/// A structured rejection carried by an extension point outcome.
#[derive(Debug, Clone, Default)]
pub struct Rejection {
    /// The error code; the extension point's default applies when absent.
    pub error: Option<ClientErrorCode>,

    /// A human-readable description of the error.
    pub description: Option<Cow<'static, str>>,

    /// A URI identifying a page with information about the error.
    pub uri: Option<Url>,
}

impl Rejection {
    /// Create a rejection with an explicit error code.
    #[must_use]
    pub fn new(error: ClientErrorCode) -> Self {
        Self {
            error: Some(error),
            description: None,
            uri: None,
        }
    }

    /// Attach a description to the rejection.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach an error URI to the rejection.
    #[must_use]
    pub fn with_uri(mut self, uri: Url) -> Self {
        self.uri = Some(uri);
        self
    }

    /// Resolve this rejection to a wire error, falling back to the given
    /// default code.
    #[must_use]
    pub fn into_client_error(self, default: ClientErrorCode) -> ClientError {
        let mut error = ClientError::from(self.error.unwrap_or(default));
        if let Some(description) = self.description {
            error = error.with_description(description);
        }
        if let Some(uri) = self.uri {
            error = error.with_uri(uri);
        }
        error
    }
}

/// Outcome of the client authentication extension point.
#[derive(Debug)]
pub enum ClientAuthentication {
    /// The client authenticated successfully.
    ///
    /// When `client_id` is `None`, the `client_id` of the request is used;
    /// a request without one then fails with `server_error`.
    Validated {
        /// The authenticated client identifier.
        client_id: Option<String>,
    },

    /// The client is public; the request proceeds unauthenticated.
    Skipped,

    /// Authentication failed. Defaults to `invalid_client`.
    Rejected(Rejection),
}

/// Outcome of the token request validation extension point.
#[derive(Debug)]
pub enum RequestValidation {
    /// The request is acceptable.
    Validated,

    /// The request is not acceptable. Defaults to `invalid_request`.
    Rejected(Rejection),
}

/// Outcome of a grant extension point.
#[derive(Debug)]
pub enum GrantOutcome {
    /// A ticket was produced; it becomes authoritative for the rest of the
    /// request.
    Granted(Ticket),

    /// The handler declined; the extension point's default error applies.
    Skipped,

    /// The grant was refused.
    Rejected(Rejection),
}

/// The event dispatched after a ticket was granted, before tokens are
/// minted from it.
///
/// The host may inspect or replace the ticket, or take over the response
/// entirely with [`TokenEndpointEvent::handle_response`].
pub struct TokenEndpointEvent {
    /// The ticket tokens will be minted from. Clearing it fails the request
    /// with `server_error`.
    pub ticket: Option<Ticket>,

    response: Option<http::Response<Bytes>>,
}

impl TokenEndpointEvent {
    pub(crate) fn new(ticket: Ticket) -> Self {
        Self {
            ticket: Some(ticket),
            response: None,
        }
    }

    /// Take over the request: the given response is written as-is and no
    /// tokens are minted.
    pub fn handle_response(&mut self, response: http::Response<Bytes>) {
        self.response = Some(response);
    }

    pub(crate) fn into_parts(self) -> (Option<Ticket>, Option<http::Response<Bytes>>) {
        (self.ticket, self.response)
    }
}

/// The host-supplied extension handlers of the token endpoint.
///
/// Within one request the extension points are invoked in this order:
/// client authentication, request validation, exactly one grant, the
/// post-grant [`TokenEndpointEvent`], and finally the response payload
/// hook. Handlers may suspend; the driver never reorders them.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Authenticate the client making the request.
    ///
    /// The driver resolves HTTP Basic credentials into the message's
    /// `client_id` and `client_secret` parameters before this is invoked.
    async fn validate_client_authentication(
        &self,
        request: &OidcMessage,
    ) -> ClientAuthentication {
        let _ = request;
        ClientAuthentication::Rejected(Rejection::default())
    }

    /// Validate the token request.
    ///
    /// For grants reconstructing a prior ticket (authorization code and
    /// refresh token), `ticket` carries the reconstructed ticket and the
    /// cross-checks have already run; for the other grants this is invoked
    /// before grant dispatch with no ticket.
    async fn validate_token_request(
        &self,
        request: &OidcMessage,
        ticket: Option<&Ticket>,
    ) -> RequestValidation {
        let _ = (request, ticket);
        RequestValidation::Rejected(Rejection::default())
    }

    /// Handle an `authorization_code` grant. The ticket is a copy of the
    /// one reconstructed from the code; the returned ticket becomes
    /// authoritative. Defaults to passing the ticket through.
    async fn grant_authorization_code(
        &self,
        request: &OidcMessage,
        ticket: Ticket,
    ) -> GrantOutcome {
        let _ = request;
        GrantOutcome::Granted(ticket)
    }

    /// Handle a `refresh_token` grant; see
    /// [`grant_authorization_code`](Provider::grant_authorization_code).
    async fn grant_refresh_token(&self, request: &OidcMessage, ticket: Ticket) -> GrantOutcome {
        let _ = request;
        GrantOutcome::Granted(ticket)
    }

    /// Handle a `password` grant by authenticating the resource owner and
    /// producing a ticket. Defaults to `invalid_grant`.
    async fn grant_resource_owner_credentials(&self, request: &OidcMessage) -> GrantOutcome {
        let _ = request;
        GrantOutcome::Skipped
    }

    /// Handle a `client_credentials` grant. Defaults to
    /// `unauthorized_client`.
    async fn grant_client_credentials(&self, request: &OidcMessage) -> GrantOutcome {
        let _ = request;
        GrantOutcome::Skipped
    }

    /// Handle a custom grant type. Defaults to `unsupported_grant_type`.
    async fn grant_custom_extension(&self, request: &OidcMessage) -> GrantOutcome {
        let _ = request;
        GrantOutcome::Skipped
    }

    /// Inspect or replace the granted ticket, or take over the response.
    async fn token_endpoint(&self, request: &OidcMessage, event: &mut TokenEndpointEvent) {
        let _ = (request, event);
    }

    /// Inspect or rewrite the JSON payload before it is written.
    async fn token_endpoint_response(
        &self,
        request: &OidcMessage,
        payload: &mut Map<String, Value>,
    ) {
        let _ = (request, payload);
    }
}
