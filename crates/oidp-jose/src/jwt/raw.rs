// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

use std::ops::Deref;

use thiserror::Error;

/// Error returned when a string does not have the three-part compact JWT
/// shape.
#[derive(Debug, Error)]
#[error("a compact JWT has exactly three dot-separated parts, found {parts}")]
pub struct DecodeError {
    /// How many dot-separated parts the string actually had.
    pub parts: usize,
}

/// A JWT in compact serialization.
///
/// Construction checks the three-part shape once; the individual parts are
/// re-sliced out of the string on access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawJwt {
    inner: String,
}

impl RawJwt {
    /// Wrap a string the caller already knows to be `header.payload.sig`.
    pub(super) fn new(inner: String) -> Self {
        Self { inner }
    }

    /// The three dot-separated parts, in order.
    fn parts(&self) -> (&str, &str, &str) {
        // The shape was checked at construction, so the fallbacks are
        // never taken.
        let Some((header, rest)) = self.inner.split_once('.') else {
            return (&self.inner, "", "");
        };
        let Some((payload, signature)) = rest.split_once('.') else {
            return (header, rest, "");
        };
        (header, payload, signature)
    }

    pub fn header(&self) -> &str {
        self.parts().0
    }

    pub fn payload(&self) -> &str {
        self.parts().1
    }

    pub fn signature(&self) -> &str {
        self.parts().2
    }

    /// Everything the signature covers: the header and payload parts,
    /// including the dot between them.
    pub fn signed_part(&self) -> &str {
        self.inner
            .rsplit_once('.')
            .map_or(self.inner.as_str(), |(signed, _)| signed)
    }
}

impl std::fmt::Display for RawJwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner)
    }
}

impl Deref for RawJwt {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<RawJwt> for String {
    fn from(val: RawJwt) -> Self {
        val.inner
    }
}

impl TryFrom<String> for RawJwt {
    type Error = DecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let parts = value.split('.').count();
        if parts != 3 {
            return Err(DecodeError { parts });
        }

        Ok(Self { inner: value })
    }
}

impl TryFrom<&str> for RawJwt {
    type Error = DecodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.to_owned().try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_the_three_parts() {
        let raw = RawJwt::try_from("aGVhZGVy.cGF5bG9hZA.c2ln").unwrap();
        assert_eq!(raw.header(), "aGVhZGVy");
        assert_eq!(raw.payload(), "cGF5bG9hZA");
        assert_eq!(raw.signature(), "c2ln");
        assert_eq!(raw.signed_part(), "aGVhZGVy.cGF5bG9hZA");
        assert_eq!(raw.to_string(), "aGVhZGVy.cGF5bG9hZA.c2ln");
    }

    #[test]
    fn rejects_other_shapes() {
        for (value, parts) in [("", 1), ("a", 1), ("a.b", 2), ("a.b.c.d", 4)] {
            let err = RawJwt::try_from(value).unwrap_err();
            assert_eq!(err.parts, parts, "value {value:?}");
        }
    }
}
