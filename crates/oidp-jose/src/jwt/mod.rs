// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

mod header;
mod raw;
mod signed;

pub use self::{
    header::JsonWebSignatureHeader,
    raw::DecodeError as RawDecodeError,
    signed::{Jwt, JwtDecodeError, JwtSignatureError, JwtVerificationError},
};
