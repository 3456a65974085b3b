// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! JSON Web Signature primitives: compact serialization, signing and
//! verification for the algorithms used by the provider core.

#![deny(rustdoc::broken_intra_doc_links)]
#![allow(clippy::module_name_repetitions)]

mod alg;
pub mod jwa;
pub mod jwt;

pub use self::alg::JsonWebSignatureAlg;
