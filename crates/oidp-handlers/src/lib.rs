// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! The token endpoint of the provider core.
//!
//! The endpoint is framework-agnostic: it consumes an
//! [`http::Request`] and produces an [`http::Response`], which both axum
//! and hyper speak natively. Host applications participate through the
//! [`Provider`] extension protocol: they authenticate clients, validate
//! requests, grant tickets and may override the issued response.

#![allow(clippy::module_name_repetitions)]

pub mod events;
mod response;
pub mod token;

pub use self::{
    events::{
        ClientAuthentication, GrantOutcome, Provider, Rejection, RequestValidation,
        TokenEndpointEvent,
    },
    response::TokenResponse,
    token::{TokenEndpoint, TokenFormats},
};
