// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! The token endpoint driver.
//!
//! Implements POST `/token` for the OAuth 2.0 grant types:
//! - `authorization_code`
//! - `refresh_token`
//! - `password`
//! - `client_credentials`
//! - custom extension grants, dispatched to the host

use std::sync::Arc;

use base64ct::{Base64, Encoding};
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use headers::{CacheControl, HeaderMapExt, Pragma};
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, header};
use oauth2_types::{ClientError, ClientErrorCode, OidcMessage};
use oidp_data_model::{CLAIM_SUBJECT, Clock, SiteConfig, Ticket, TicketUsage};
use oidp_tokens::{ProtectError, TicketFormat};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    events::{ClientAuthentication, GrantOutcome, Provider, RequestValidation, TokenEndpointEvent},
    response::TokenResponse,
};

#[derive(Debug, Error)]
enum RouteError {
    #[error("the request method is not POST")]
    InvalidMethod,

    #[error("the request body is not form-encoded")]
    InvalidContentType,

    #[error("grant_type is missing")]
    MissingGrantType,

    #[error("code is missing")]
    MissingCode,

    #[error("refresh_token is missing")]
    MissingRefreshToken,

    #[error("username or password is missing")]
    MissingResourceOwnerCredentials,

    #[error("client authentication was rejected")]
    ClientAuthenticationRejected(ClientError),

    #[error("client authentication is mandatory for the client_credentials grant")]
    ClientAuthenticationRequired,

    #[error("the client was validated but no client_id was provided")]
    MissingValidatedClientId,

    #[error("the presented ticket could not be read")]
    InvalidTicket,

    #[error("the presented ticket is expired")]
    ExpiredTicket,

    #[error("a confidential ticket cannot be refreshed without client authentication")]
    ConfidentialTicketRequiresClientAuthentication,

    #[error("the authorization code carries no presenters")]
    MissingPresenters,

    #[error("client_id is missing")]
    MissingClientId,

    #[error("the ticket was issued to another client")]
    PresenterMismatch,

    #[error("redirect_uri is missing")]
    MissingRedirectUri,

    #[error("redirect_uri does not match the one of the authorization code")]
    RedirectUriMismatch,

    #[error("the ticket carries no resources to narrow")]
    ResourceNotNarrowable,

    #[error("the requested resources exceed the ticket's")]
    ResourceWidening,

    #[error("the ticket carries no scopes to narrow")]
    ScopeNotNarrowable,

    #[error("the requested scopes exceed the ticket's")]
    ScopeWidening,

    #[error("the token request was rejected")]
    RequestRejected(ClientError),

    #[error("the grant was rejected")]
    GrantRejected(ClientError),

    #[error("the host cleared the ticket")]
    MissingTicket,

    #[error("failed to serialize an outbound token")]
    Protect(#[from] ProtectError),

    #[error("internal error")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl RouteError {
    fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::MissingValidatedClientId
                | Self::MissingPresenters
                | Self::MissingTicket
                | Self::Protect(_)
                | Self::Internal(_)
        )
    }

    fn client_error(self) -> ClientError {
        match self {
            Self::InvalidMethod => ClientError::new(
                ClientErrorCode::InvalidRequest,
                "The token request must use the POST method",
            ),

            Self::InvalidContentType => ClientError::new(
                ClientErrorCode::InvalidRequest,
                "The token request must carry an application/x-www-form-urlencoded body",
            ),

            Self::MissingGrantType => ClientError::new(
                ClientErrorCode::InvalidRequest,
                "The mandatory 'grant_type' parameter is missing",
            ),

            Self::MissingCode => ClientError::new(
                ClientErrorCode::InvalidRequest,
                "The mandatory 'code' parameter is missing",
            ),

            Self::MissingRefreshToken => ClientError::new(
                ClientErrorCode::InvalidRequest,
                "The mandatory 'refresh_token' parameter is missing",
            ),

            Self::MissingResourceOwnerCredentials => ClientError::new(
                ClientErrorCode::InvalidRequest,
                "The mandatory 'username' and 'password' parameters are missing",
            ),

            Self::ClientAuthenticationRejected(error)
            | Self::RequestRejected(error)
            | Self::GrantRejected(error) => error,

            Self::ClientAuthenticationRequired => ClientError::new(
                ClientErrorCode::InvalidGrant,
                "client authentication is required when using client_credentials",
            ),

            Self::InvalidTicket => {
                ClientError::new(ClientErrorCode::InvalidGrant, "Invalid ticket")
            }

            Self::ExpiredTicket => {
                ClientError::new(ClientErrorCode::InvalidGrant, "Expired ticket")
            }

            Self::ConfidentialTicketRequiresClientAuthentication => ClientError::new(
                ClientErrorCode::InvalidGrant,
                "Client authentication is required to refresh this ticket",
            ),

            Self::MissingClientId => ClientError::new(
                ClientErrorCode::InvalidRequest,
                "The mandatory 'client_id' parameter is missing",
            ),

            Self::PresenterMismatch => ClientError::new(
                ClientErrorCode::InvalidGrant,
                "Ticket does not contain matching client_id",
            ),

            Self::MissingRedirectUri => ClientError::new(
                ClientErrorCode::InvalidRequest,
                "The mandatory 'redirect_uri' parameter is missing",
            ),

            Self::RedirectUriMismatch => ClientError::new(
                ClientErrorCode::InvalidGrant,
                "Authorization code does not contain matching redirect_uri",
            ),

            Self::ResourceNotNarrowable => ClientError::new(
                ClientErrorCode::InvalidGrant,
                "Token request cannot contain a resource parameter if the authorization request didn't contain one",
            ),

            Self::ResourceWidening => ClientError::new(
                ClientErrorCode::InvalidGrant,
                "Token request doesn't contain a valid resource parameter",
            ),

            Self::ScopeNotNarrowable => ClientError::new(
                ClientErrorCode::InvalidGrant,
                "Token request cannot contain a scope parameter if the authorization request didn't contain one",
            ),

            Self::ScopeWidening => ClientError::new(
                ClientErrorCode::InvalidGrant,
                "Token request doesn't contain a valid scope parameter",
            ),

            Self::MissingValidatedClientId
            | Self::MissingPresenters
            | Self::MissingTicket
            | Self::Protect(_)
            | Self::Internal(_) => ClientError::from(ClientErrorCode::ServerError),
        }
    }

    fn into_response(self) -> Response<Bytes> {
        if self.is_server_error() {
            warn!(error = %self, "token request failed");
        } else {
            debug!(error = %self, "token request rejected");
        }

        let error = self.client_error();
        let status = match error.error {
            ClientErrorCode::InvalidClient => StatusCode::UNAUTHORIZED,
            ClientErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };

        json_response(status, &error)
    }
}

/// The four codec instances the endpoint serializes tickets with.
#[derive(Clone)]
pub struct TokenFormats {
    /// Codec for access tokens.
    pub access_token: Arc<dyn TicketFormat>,

    /// Codec for identity tokens.
    pub identity_token: Arc<dyn TicketFormat>,

    /// Codec for refresh tokens.
    pub refresh_token: Arc<dyn TicketFormat>,

    /// Codec for authorization codes.
    pub authorization_code: Arc<dyn TicketFormat>,
}

/// The outcome of grant dispatch, carrying what the response stage needs.
struct GrantedExchange {
    ticket: Ticket,

    /// The expiry of the reconstructed refresh token, used to clamp
    /// outbound lifetimes when sliding expiration is disabled.
    refresh_expires_at: Option<DateTime<Utc>>,

    echo_scope: bool,
    echo_resource: bool,
}

/// The token endpoint.
///
/// One long-lived value serves concurrent requests; each request runs the
/// protocol state machine sequentially, suspending at body reads, extension
/// dispatches and token signing. Dropping the future returned by
/// [`TokenEndpoint::handle`] aborts the request without writing a response.
pub struct TokenEndpoint<P> {
    config: SiteConfig,
    clock: Arc<dyn Clock>,
    formats: TokenFormats,
    provider: P,
}

impl<P: Provider> TokenEndpoint<P> {
    /// Assemble an endpoint from its configuration, clock, codecs and
    /// extension provider.
    pub fn new(
        config: SiteConfig,
        clock: Arc<dyn Clock>,
        formats: TokenFormats,
        provider: P,
    ) -> Self {
        Self {
            config,
            clock,
            formats,
            provider,
        }
    }

    /// Handle a token request.
    #[tracing::instrument(name = "oidp.oauth2.token.post", skip_all)]
    pub async fn handle(&self, request: Request<Bytes>) -> Response<Bytes> {
        match self.process(request).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    async fn process(&self, request: Request<Bytes>) -> Result<Response<Bytes>, RouteError> {
        if request.method() != Method::POST {
            return Err(RouteError::InvalidMethod);
        }

        if !has_form_content_type(request.headers()) {
            return Err(RouteError::InvalidContentType);
        }

        let mut message = OidcMessage::from_form_urlencoded(request.body());

        if message.grant_type().is_none() {
            return Err(RouteError::MissingGrantType);
        }

        if message.is_authorization_code_grant_type() && message.code().is_none() {
            return Err(RouteError::MissingCode);
        }

        if message.is_refresh_token_grant_type() && message.refresh_token().is_none() {
            return Err(RouteError::MissingRefreshToken);
        }

        if message.is_password_grant_type()
            && (message.username().is_none() || message.password().is_none())
        {
            return Err(RouteError::MissingResourceOwnerCredentials);
        }

        // Fall back to HTTP Basic when the body carries no credentials. A
        // malformed header is not fatal: the request proceeds
        // unauthenticated and the host decides its fate.
        if message.client_id().is_none() && message.client_secret().is_none() {
            if let Some((client_id, client_secret)) = basic_credentials(request.headers()) {
                message.set_client_id(client_id);
                message.set_client_secret(client_secret);
            }
        }

        let client_validated = match self.provider.validate_client_authentication(&message).await
        {
            ClientAuthentication::Rejected(rejection) => {
                return Err(RouteError::ClientAuthenticationRejected(
                    rejection.into_client_error(ClientErrorCode::InvalidClient),
                ));
            }

            ClientAuthentication::Skipped => {
                // This grant must not be used by unauthenticated clients.
                if message.is_client_credentials_grant_type() {
                    return Err(RouteError::ClientAuthenticationRequired);
                }

                false
            }

            ClientAuthentication::Validated { client_id } => {
                let resolved =
                    client_id.or_else(|| message.client_id().map(ToOwned::to_owned));
                let Some(resolved) = resolved else {
                    return Err(RouteError::MissingValidatedClientId);
                };
                message.set_client_id(resolved);
                true
            }
        };

        let reconstructs = message.is_authorization_code_grant_type()
            || message.is_refresh_token_grant_type();

        let exchange = if reconstructs {
            self.exchange_reconstructed(&message, client_validated).await?
        } else {
            match self.provider.validate_token_request(&message, None).await {
                RequestValidation::Validated => {}
                RequestValidation::Rejected(rejection) => {
                    return Err(RouteError::RequestRejected(
                        rejection.into_client_error(ClientErrorCode::InvalidRequest),
                    ));
                }
            }

            let (outcome, default_error) = if message.is_password_grant_type() {
                (
                    self.provider.grant_resource_owner_credentials(&message).await,
                    ClientErrorCode::InvalidGrant,
                )
            } else if message.is_client_credentials_grant_type() {
                (
                    self.provider.grant_client_credentials(&message).await,
                    ClientErrorCode::UnauthorizedClient,
                )
            } else {
                (
                    self.provider.grant_custom_extension(&message).await,
                    ClientErrorCode::UnsupportedGrantType,
                )
            };

            GrantedExchange {
                ticket: resolve_grant(outcome, default_error)?,
                refresh_expires_at: None,
                echo_scope: true,
                echo_resource: true,
            }
        };

        let mut event = TokenEndpointEvent::new(exchange.ticket);
        self.provider.token_endpoint(&message, &mut event).await;
        let (ticket, handled) = event.into_parts();
        if let Some(response) = handled {
            debug!("the host handled the token response itself");
            return Ok(response);
        }
        let mut ticket = ticket.ok_or(RouteError::MissingTicket)?;

        if client_validated {
            ticket.set_confidential();
        }

        if !ticket.has_scopes_entry() && message.has_scope("openid") {
            ticket
                .set_scopes(["openid"])
                .map_err(|e| RouteError::Internal(Box::new(e)))?;
        }

        let now = self.clock.now();
        let not_after = if self.config.use_sliding_refresh_expiration {
            None
        } else {
            exchange.refresh_expires_at
        };

        let selector = if self.config.response_type_selection {
            message.response_type()
        } else {
            None
        };
        let selected = |kind: &str| {
            selector.map_or(true, |response_type| {
                response_type.split(' ').any(|part| part == kind)
            })
        };

        let mut response = TokenResponse::default();

        if selected("token") {
            let (outbound, expires_at) = self.prepare_outbound(
                &ticket,
                TicketUsage::AccessToken,
                self.config.access_token_ttl,
                now,
                not_after,
            );
            response.access_token = Some(self.formats.access_token.protect(&outbound)?);
            response.token_type = Some("Bearer".to_owned());
            response.expires_in = Some(format_expires_in(expires_at - now));
        }

        if ticket.has_scope("openid") && selected("id_token") {
            let (outbound, _) = self.prepare_outbound(
                &ticket,
                TicketUsage::IdentityToken,
                self.config.id_token_ttl,
                now,
                not_after,
            );
            response.id_token = Some(self.formats.identity_token.protect(&outbound)?);
        }

        if ticket.has_scope("offline_access") && selected("refresh_token") {
            let (outbound, _) = self.prepare_outbound(
                &ticket,
                TicketUsage::RefreshToken,
                self.config.refresh_token_ttl,
                now,
                not_after,
            );
            response.refresh_token = Some(self.formats.refresh_token.protect(&outbound)?);
        }

        if exchange.echo_scope && ticket.has_scopes_entry() {
            response.scope = Some(ticket.scopes().join(" "));
        }

        if exchange.echo_resource && !ticket.resources().is_empty() {
            response.resource = Some(ticket.resources().join(" "));
        }

        let mut payload = response.into_map();
        self.provider.token_endpoint_response(&message, &mut payload).await;

        Ok(json_response(StatusCode::OK, &payload))
    }

    /// The authorization code and refresh token path: reconstruct the prior
    /// ticket and cross-check it against the request.
    async fn exchange_reconstructed(
        &self,
        message: &OidcMessage,
        client_validated: bool,
    ) -> Result<GrantedExchange, RouteError> {
        let is_code = message.is_authorization_code_grant_type();

        let serialized = if is_code {
            message.code().ok_or(RouteError::MissingCode)?
        } else {
            message.refresh_token().ok_or(RouteError::MissingRefreshToken)?
        };

        let format = if is_code {
            &self.formats.authorization_code
        } else {
            &self.formats.refresh_token
        };

        let mut ticket = match format.unprotect(serialized) {
            Ok(Some(ticket)) => ticket,
            Ok(None) => {
                debug!("the presented ticket has the wrong usage");
                return Err(RouteError::InvalidTicket);
            }
            Err(err) => {
                debug!(error = %err, "the presented ticket could not be deserialized");
                return Err(RouteError::InvalidTicket);
            }
        };

        // An expiry equal to the current instant is already expired.
        let now = self.clock.now();
        match ticket.expires_at {
            Some(expires_at) if expires_at > now => {}
            _ => return Err(RouteError::ExpiredTicket),
        }

        if !is_code && !client_validated && ticket.is_confidential() {
            return Err(RouteError::ConfidentialTicketRequiresClientAuthentication);
        }

        // Refresh tokens issued to public clients may carry no presenters;
        // authorization codes always name the client they were issued to.
        let presenters_empty = ticket.presenters().is_empty();
        if presenters_empty && is_code {
            return Err(RouteError::MissingPresenters);
        }

        let client_id = message.client_id();
        if is_code && client_id.is_none() {
            return Err(RouteError::MissingClientId);
        }

        if let Some(client_id) = client_id {
            if !presenters_empty && !ticket.has_presenter(client_id) {
                return Err(RouteError::PresenterMismatch);
            }
        }

        if is_code {
            if let Some(stored) = ticket.take_redirect_uri() {
                match message.redirect_uri() {
                    None => return Err(RouteError::MissingRedirectUri),
                    Some(requested) if requested != stored => {
                        return Err(RouteError::RedirectUriMismatch);
                    }
                    Some(_) => {}
                }
            }
        }

        let mut echo_resource = is_code;
        if message.resource().is_some() {
            let requested = message.resources();
            if ticket.resources().is_empty() {
                return Err(RouteError::ResourceNotNarrowable);
            }
            if !requested.iter().all(|resource| ticket.has_resource(resource)) {
                return Err(RouteError::ResourceWidening);
            }

            if !is_code {
                echo_resource = !same_set(&requested, &ticket.resources());
            }

            let requested: Vec<String> =
                requested.into_iter().map(ToOwned::to_owned).collect();
            ticket
                .set_resources(requested)
                .map_err(|e| RouteError::Internal(Box::new(e)))?;
        }

        let mut echo_scope = is_code;
        if message.scope().is_some() {
            let requested = message.scopes();
            if ticket.scopes().is_empty() {
                return Err(RouteError::ScopeNotNarrowable);
            }
            if !requested.iter().all(|scope| ticket.has_scope(scope)) {
                return Err(RouteError::ScopeWidening);
            }

            if !is_code {
                echo_scope = !same_set(&requested, &ticket.scopes());
            }

            let requested: Vec<String> =
                requested.into_iter().map(ToOwned::to_owned).collect();
            ticket
                .set_scopes(requested)
                .map_err(|e| RouteError::Internal(Box::new(e)))?;
        }

        match self.provider.validate_token_request(message, Some(&ticket)).await {
            RequestValidation::Validated => {}
            RequestValidation::Rejected(rejection) => {
                return Err(RouteError::RequestRejected(
                    rejection.into_client_error(ClientErrorCode::InvalidRequest),
                ));
            }
        }

        // The grant handler gets a copy: its mutations must not observe
        // through to the stored ticket.
        let original_issued_at = ticket.issued_at;
        let original_expires_at = ticket.expires_at;
        let refresh_expires_at = (!is_code).then_some(ticket.expires_at).flatten();

        let outcome = if is_code {
            self.provider
                .grant_authorization_code(message, ticket.clone())
                .await
        } else {
            self.provider.grant_refresh_token(message, ticket.clone()).await
        };

        let mut granted = resolve_grant(outcome, ClientErrorCode::InvalidGrant)?;

        // A handler that left the validity window untouched anchored
        // nothing to it: outbound lifetimes are recomputed from
        // configuration instead of inheriting the code's or refresh
        // token's.
        if granted.issued_at == original_issued_at && granted.expires_at == original_expires_at {
            granted.issued_at = None;
            granted.expires_at = None;
        }

        Ok(GrantedExchange {
            ticket: granted,
            refresh_expires_at,
            echo_scope,
            echo_resource,
        })
    }

    /// Derive the outbound ticket for one token kind: filter the principal
    /// by claim destination, settle the validity window, apply the
    /// expiration clamp.
    fn prepare_outbound(
        &self,
        ticket: &Ticket,
        usage: TicketUsage,
        lifetime: Duration,
        now: DateTime<Utc>,
        not_after: Option<DateTime<Utc>>,
    ) -> (Ticket, DateTime<Utc>) {
        let mut outbound = ticket.clone();
        outbound.set_usage(usage);

        // Only claims destined for a wire token may leave the server.
        if matches!(usage, TicketUsage::AccessToken | TicketUsage::IdentityToken) {
            let destination = usage.as_str();
            outbound.set_principal(ticket.principal.clone_filtered(|claim| {
                claim.kind == CLAIM_SUBJECT || claim.has_destination(destination)
            }));
        }

        let issued_at = outbound.issued_at.unwrap_or(now);
        outbound.issued_at = Some(issued_at);

        let mut expires_at = outbound.expires_at.unwrap_or(issued_at + lifetime);
        if let Some(not_after) = not_after {
            expires_at = expires_at.min(not_after);
        }
        outbound.expires_at = Some(expires_at);

        (outbound, expires_at)
    }
}

fn resolve_grant(outcome: GrantOutcome, default: ClientErrorCode) -> Result<Ticket, RouteError> {
    match outcome {
        GrantOutcome::Granted(ticket) => Ok(ticket),
        GrantOutcome::Skipped => Err(RouteError::GrantRejected(ClientError::from(default))),
        GrantOutcome::Rejected(rejection) => Err(RouteError::GrantRejected(
            rejection.into_client_error(default),
        )),
    }
}

/// Whether the request body is declared as a form, allowing parameters
/// after the media type (`; charset=utf-8`).
fn has_form_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(header::CONTENT_TYPE) else {
        return false;
    };
    let Ok(content_type) = content_type.to_str() else {
        return false;
    };
    let Ok(mime) = content_type.parse::<mime::Mime>() else {
        return false;
    };

    mime.type_() == mime::APPLICATION && mime.subtype() == mime::WWW_FORM_URLENCODED
}

/// Decode HTTP Basic credentials, splitting on the first colon. Any
/// malformation yields `None`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let header = headers.get(header::AUTHORIZATION)?;
    let bytes = header.as_bytes();
    if bytes.len() < 6 || !bytes[..6].eq_ignore_ascii_case(b"Basic ") {
        return None;
    }

    let encoded = std::str::from_utf8(&bytes[6..]).ok()?;
    let decoded = Base64::decode_vec(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;

    let (client_id, client_secret) = decoded.split_once(':')?;
    Some((client_id.to_owned(), client_secret.to_owned()))
}

/// Ordinal set equality over space-split parameter values.
fn same_set(a: &[&str], b: &[&str]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// The response's `expires_in` parameter, as a decimal string.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn format_expires_in(lifetime: Duration) -> String {
    let seconds = lifetime.num_milliseconds() as f64 / 1000.0;
    let rounded = (seconds + 0.5).round_ties_even() as i64;
    rounded.to_string()
}

fn json_response(status: StatusCode, body: &impl serde::Serialize) -> Response<Bytes> {
    let body = serde_json::to_vec(body).unwrap_or_default();

    let mut response = Response::new(Bytes::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json;charset=UTF-8"),
    );
    response
        .headers_mut()
        .typed_insert(CacheControl::new().with_no_cache());
    response.headers_mut().typed_insert(Pragma::no_cache());
    response
        .headers_mut()
        .insert(header::EXPIRES, HeaderValue::from_static("-1"));

    response
}
