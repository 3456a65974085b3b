// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! [OAuth 2.0] and [OpenID Connect] message types.
//!
//! This crate holds the request-side building blocks of the provider core:
//! the [`OidcMessage`] parameter bag with its flow and grant classifiers,
//! and the protocol error vocabulary shared by every endpoint.
//!
//! [OAuth 2.0]: https://oauth.net/2/
//! [OpenID Connect]: https://openid.net/connect/

#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod errors;
pub mod message;

pub use self::{
    errors::{ClientError, ClientErrorCode},
    message::OidcMessage,
};

#[cfg(test)]
mod test_utils;
