// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! A typed view over an OAuth 2.0 / OpenID Connect parameter bag.
//!
//! Requests and responses of the protocol endpoints are flat collections of
//! string parameters. [`OidcMessage`] keeps every parameter it was given,
//! including extension parameters it knows nothing about, and layers typed
//! accessors and flow classifiers on top.

/// Well-known parameter names, as registered for OAuth 2.0 and OpenID
/// Connect.
mod names {
    pub const GRANT_TYPE: &str = "grant_type";
    pub const RESPONSE_TYPE: &str = "response_type";
    pub const RESPONSE_MODE: &str = "response_mode";
    pub const SCOPE: &str = "scope";
    pub const RESOURCE: &str = "resource";
    pub const CODE: &str = "code";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const REDIRECT_URI: &str = "redirect_uri";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const CLIENT_ID: &str = "client_id";
    pub const CLIENT_SECRET: &str = "client_secret";
    pub const ERROR: &str = "error";
    pub const ERROR_DESCRIPTION: &str = "error_description";
    pub const ERROR_URI: &str = "error_uri";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const ID_TOKEN: &str = "id_token";
    pub const TOKEN_TYPE: &str = "token_type";
    pub const EXPIRES_IN: &str = "expires_in";
}

/// Grant type and response type tokens are case-sensitive protocol
/// constants.
mod tokens {
    pub const AUTHORIZATION_CODE: &str = "authorization_code";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const PASSWORD: &str = "password";
    pub const CLIENT_CREDENTIALS: &str = "client_credentials";

    pub const CODE: &str = "code";
    pub const NONE: &str = "none";
    pub const ID_TOKEN: &str = "id_token";
    pub const TOKEN: &str = "token";

    pub const QUERY: &str = "query";
    pub const FRAGMENT: &str = "fragment";
    pub const FORM_POST: &str = "form_post";
}

/// An OpenID Connect message: an ordered bag of string parameters.
///
/// Parameter names are matched ASCII-case-insensitively; the spelling and
/// order of the parameters as they were received are preserved. Multi-valued
/// parameters (`scope`, `resource`, `response_type`) are space-separated
/// strings, split on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OidcMessage {
    entries: Vec<(String, String)>,
}

impl OidcMessage {
    /// Create an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a message from an `application/x-www-form-urlencoded` body.
    ///
    /// Repeated parameters keep their first value, matching the common
    /// server-side treatment of duplicate form fields.
    #[must_use]
    pub fn from_form_urlencoded(body: &[u8]) -> Self {
        let mut message = Self::new();
        for (name, value) in url::form_urlencoded::parse(body) {
            if message.get(&name).is_none() {
                message.entries.push((name.into_owned(), value.into_owned()));
            }
        }
        message
    }

    /// Serialize this message back to an `application/x-www-form-urlencoded`
    /// string.
    #[must_use]
    pub fn to_form_urlencoded(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.entries {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }

    /// Whether the message carries no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the parameters in the order they were inserted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Get a parameter by name, matching ASCII-case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set a parameter, replacing an existing case-insensitive match.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Remove a parameter, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self
            .entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(index).1)
    }

    /// The `grant_type` parameter.
    #[must_use]
    pub fn grant_type(&self) -> Option<&str> {
        self.get(names::GRANT_TYPE)
    }

    /// The `response_type` parameter.
    #[must_use]
    pub fn response_type(&self) -> Option<&str> {
        self.get(names::RESPONSE_TYPE)
    }

    /// The `response_mode` parameter.
    #[must_use]
    pub fn response_mode(&self) -> Option<&str> {
        self.get(names::RESPONSE_MODE)
    }

    /// The raw `scope` parameter.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.get(names::SCOPE)
    }

    /// The raw `resource` parameter.
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.get(names::RESOURCE)
    }

    /// The `code` parameter.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.get(names::CODE)
    }

    /// The `refresh_token` parameter.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.get(names::REFRESH_TOKEN)
    }

    /// The `redirect_uri` parameter.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.get(names::REDIRECT_URI)
    }

    /// The `username` parameter.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.get(names::USERNAME)
    }

    /// The `password` parameter.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.get(names::PASSWORD)
    }

    /// The `client_id` parameter.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.get(names::CLIENT_ID)
    }

    /// The `client_secret` parameter.
    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        self.get(names::CLIENT_SECRET)
    }

    /// Set the `client_id` parameter.
    pub fn set_client_id(&mut self, client_id: impl Into<String>) {
        self.set(names::CLIENT_ID, client_id);
    }

    /// Set the `client_secret` parameter.
    pub fn set_client_secret(&mut self, client_secret: impl Into<String>) {
        self.set(names::CLIENT_SECRET, client_secret);
    }

    /// The `error` parameter.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.get(names::ERROR)
    }

    /// The `error_description` parameter.
    #[must_use]
    pub fn error_description(&self) -> Option<&str> {
        self.get(names::ERROR_DESCRIPTION)
    }

    /// The `error_uri` parameter.
    #[must_use]
    pub fn error_uri(&self) -> Option<&str> {
        self.get(names::ERROR_URI)
    }

    /// The `access_token` parameter.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.get(names::ACCESS_TOKEN)
    }

    /// The `id_token` parameter.
    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.get(names::ID_TOKEN)
    }

    /// The `token_type` parameter.
    #[must_use]
    pub fn token_type(&self) -> Option<&str> {
        self.get(names::TOKEN_TYPE)
    }

    /// The `expires_in` parameter.
    #[must_use]
    pub fn expires_in(&self) -> Option<&str> {
        self.get(names::EXPIRES_IN)
    }

    /// The individual scope tokens of the `scope` parameter, deduplicated,
    /// in first-occurrence order. Empty when the parameter is absent.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        split_unique(self.scope())
    }

    /// The individual resource indicators of the `resource` parameter,
    /// deduplicated, in first-occurrence order. Empty when the parameter is
    /// absent.
    #[must_use]
    pub fn resources(&self) -> Vec<&str> {
        split_unique(self.resource())
    }

    /// Whether `scope` contains the given token (ordinal comparison).
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        contains_token(self.scope(), scope)
    }

    /// Whether `response_type` contains the given token (ordinal
    /// comparison).
    #[must_use]
    pub fn has_response_type(&self, response_type: &str) -> bool {
        contains_token(self.response_type(), response_type)
    }

    /// Whether this request uses the authorization code flow:
    /// `response_type` is exactly `code`.
    #[must_use]
    pub fn is_authorization_code_flow(&self) -> bool {
        self.response_type() == Some(tokens::CODE)
    }

    /// Whether this request uses the `none` flow: `response_type` is
    /// exactly `none`.
    #[must_use]
    pub fn is_none_flow(&self) -> bool {
        self.response_type() == Some(tokens::NONE)
    }

    /// Whether this request uses the implicit flow: the `response_type` set
    /// is exactly one of `{id_token}`, `{token}` or `{id_token, token}`.
    #[must_use]
    pub fn is_implicit_flow(&self) -> bool {
        let parts = split_unique(self.response_type());
        !parts.is_empty()
            && parts
                .iter()
                .all(|part| *part == tokens::ID_TOKEN || *part == tokens::TOKEN)
    }

    /// Whether this request uses the hybrid flow: the `response_type` set is
    /// exactly one of `{code, id_token}`, `{code, token}` or
    /// `{code, id_token, token}`.
    #[must_use]
    pub fn is_hybrid_flow(&self) -> bool {
        let parts = split_unique(self.response_type());
        parts.len() >= 2
            && parts.contains(&tokens::CODE)
            && parts.iter().all(|part| {
                *part == tokens::CODE || *part == tokens::ID_TOKEN || *part == tokens::TOKEN
            })
    }

    /// Whether the response should be returned in the URI fragment.
    ///
    /// True when `response_mode` is `fragment`, or when `response_mode` is
    /// absent and the flow defaults to the fragment (implicit and hybrid).
    /// An explicit non-fragment mode is never overridden.
    #[must_use]
    pub fn is_fragment_response_mode(&self) -> bool {
        match self.response_mode() {
            Some(mode) => mode == tokens::FRAGMENT,
            None => self.is_implicit_flow() || self.is_hybrid_flow(),
        }
    }

    /// Whether the response should be returned in the query string.
    ///
    /// True when `response_mode` is `query`, or when `response_mode` is
    /// absent and the flow defaults to the query (code and `none`). An
    /// explicit non-query mode is never overridden.
    #[must_use]
    pub fn is_query_response_mode(&self) -> bool {
        match self.response_mode() {
            Some(mode) => mode == tokens::QUERY,
            None => self.is_authorization_code_flow() || self.is_none_flow(),
        }
    }

    /// Whether the response should be returned via form post:
    /// `response_mode` is exactly `form_post`.
    #[must_use]
    pub fn is_form_post_response_mode(&self) -> bool {
        self.response_mode() == Some(tokens::FORM_POST)
    }

    /// Whether `grant_type` is `authorization_code`.
    #[must_use]
    pub fn is_authorization_code_grant_type(&self) -> bool {
        self.grant_type() == Some(tokens::AUTHORIZATION_CODE)
    }

    /// Whether `grant_type` is `refresh_token`.
    #[must_use]
    pub fn is_refresh_token_grant_type(&self) -> bool {
        self.grant_type() == Some(tokens::REFRESH_TOKEN)
    }

    /// Whether `grant_type` is `password`.
    #[must_use]
    pub fn is_password_grant_type(&self) -> bool {
        self.grant_type() == Some(tokens::PASSWORD)
    }

    /// Whether `grant_type` is `client_credentials`.
    #[must_use]
    pub fn is_client_credentials_grant_type(&self) -> bool {
        self.grant_type() == Some(tokens::CLIENT_CREDENTIALS)
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for OidcMessage {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut message = Self::new();
        for (name, value) in iter {
            message.set(name, value);
        }
        message
    }
}

/// Split a space-separated parameter into unique tokens, in first-occurrence
/// order.
fn split_unique(value: Option<&str>) -> Vec<&str> {
    let mut parts: Vec<&str> = Vec::new();
    for part in value.unwrap_or_default().split(' ') {
        if !part.is_empty() && !parts.contains(&part) {
            parts.push(part);
        }
    }
    parts
}

/// Ordinal membership in a space-separated parameter, without
/// deduplication.
fn contains_token(value: Option<&str>, token: &str) -> bool {
    value
        .unwrap_or_default()
        .split(' ')
        .any(|part| part == token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup_preserves_spelling() {
        let mut message = OidcMessage::new();
        message.set("X-Custom-Param", "kept");

        assert_eq!(message.get("x-custom-param"), Some("kept"));
        assert_eq!(message.iter().next(), Some(("X-Custom-Param", "kept")));

        message.set("x-custom-param", "replaced");
        assert_eq!(message.get("X-CUSTOM-PARAM"), Some("replaced"));
        assert_eq!(message.iter().count(), 1);
    }

    #[test]
    fn form_round_trip() {
        let message = OidcMessage::from_form_urlencoded(
            b"grant_type=authorization_code&code=abc&redirect_uri=https%3A%2F%2Fapp%2Fcb&ext=1",
        );

        assert_eq!(message.grant_type(), Some("authorization_code"));
        assert_eq!(message.code(), Some("abc"));
        assert_eq!(message.redirect_uri(), Some("https://app/cb"));
        assert_eq!(message.get("ext"), Some("1"));

        let reparsed = OidcMessage::from_form_urlencoded(message.to_form_urlencoded().as_bytes());
        assert_eq!(reparsed, message);
    }

    #[test]
    fn duplicate_parameters_keep_first_value() {
        let message = OidcMessage::from_form_urlencoded(b"scope=openid&scope=email");
        assert_eq!(message.scope(), Some("openid"));
    }

    #[test]
    fn scope_splitting_dedupes_ordinally() {
        let message = OidcMessage::from_iter([("scope", "openid profile openid Profile")]);
        assert_eq!(message.scopes(), vec!["openid", "profile", "Profile"]);
        assert!(message.has_scope("openid"));
        assert!(message.has_scope("Profile"));
        assert!(!message.has_scope("OPENID"));
    }

    #[test]
    fn flow_predicates_are_mutually_exclusive() {
        let cases = [
            ("code", (true, false, false, false)),
            ("none", (false, true, false, false)),
            ("id_token", (false, false, true, false)),
            ("token", (false, false, true, false)),
            ("id_token token", (false, false, true, false)),
            ("token id_token", (false, false, true, false)),
            ("code id_token", (false, false, false, true)),
            ("code token", (false, false, false, true)),
            ("code id_token token", (false, false, false, true)),
            ("code unknown", (false, false, false, false)),
            ("Code", (false, false, false, false)),
        ];

        for (response_type, (code, none, implicit, hybrid)) in cases {
            let message = OidcMessage::from_iter([("response_type", response_type)]);
            assert_eq!(
                message.is_authorization_code_flow(),
                code,
                "response_type={response_type:?}"
            );
            assert_eq!(message.is_none_flow(), none, "response_type={response_type:?}");
            assert_eq!(
                message.is_implicit_flow(),
                implicit,
                "response_type={response_type:?}"
            );
            assert_eq!(
                message.is_hybrid_flow(),
                hybrid,
                "response_type={response_type:?}"
            );
        }
    }

    #[test]
    fn response_mode_inference() {
        let implicit = OidcMessage::from_iter([("response_type", "id_token token")]);
        assert!(implicit.is_fragment_response_mode());
        assert!(!implicit.is_query_response_mode());

        let code = OidcMessage::from_iter([("response_type", "code")]);
        assert!(code.is_query_response_mode());
        assert!(!code.is_fragment_response_mode());

        // An explicit mode suppresses the flow-based default.
        let explicit = OidcMessage::from_iter([
            ("response_type", "id_token token"),
            ("response_mode", "form_post"),
        ]);
        assert!(!explicit.is_fragment_response_mode());
        assert!(!explicit.is_query_response_mode());
        assert!(explicit.is_form_post_response_mode());

        let fragment_code = OidcMessage::from_iter([
            ("response_type", "code"),
            ("response_mode", "fragment"),
        ]);
        assert!(fragment_code.is_fragment_response_mode());
        assert!(!fragment_code.is_query_response_mode());
    }

    #[test]
    fn grant_type_predicates_are_ordinal() {
        let message = OidcMessage::from_iter([("grant_type", "authorization_code")]);
        assert!(message.is_authorization_code_grant_type());
        assert!(!message.is_refresh_token_grant_type());

        let uppercase = OidcMessage::from_iter([("grant_type", "Authorization_Code")]);
        assert!(!uppercase.is_authorization_code_grant_type());
    }
}
