//! Optional `Authorization` header for outbound requests
//!
//! Each endpoint family reads a token variable and an optional scheme
//! variable. The scheme defaults to `Bearer`; an explicitly blank scheme
//! sends the bare token.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

const DEFAULT_SCHEME: &str = "Bearer";

/// Environment variables for the LLM endpoint credentials
pub const LLM_AUTH: AuthEnv = AuthEnv {
    token_var: "SIGMA_LLM_AUTH_TOKEN",
    scheme_var: "SIGMA_LLM_AUTH_SCHEME",
};

/// Environment variables for the Whisper endpoint credentials
pub const WHISPER_AUTH: AuthEnv = AuthEnv {
    token_var: "SIGMA_WHISPER_AUTH_TOKEN",
    scheme_var: "SIGMA_WHISPER_AUTH_SCHEME",
};

/// A pair of environment variables holding a token and its scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthEnv {
    pub token_var: &'static str,
    pub scheme_var: &'static str,
}

impl AuthEnv {
    /// Build the header value from the current environment
    ///
    /// # Errors
    ///
    /// Returns error if the token variable is set but blank
    pub fn header(&self) -> Result<Option<AuthHeader>> {
        let token = std::env::var(self.token_var).ok();
        let scheme = std::env::var(self.scheme_var).ok();
        authorization_value(self.token_var, token.as_deref(), scheme.as_deref())
    }
}

/// An `Authorization` header value kept out of debug output
#[derive(Clone)]
pub struct AuthHeader(SecretString);

impl AuthHeader {
    /// Wrap a complete header value
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Header value to place on the wire
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthHeader([REDACTED])")
    }
}

/// Combine a token and scheme into a header value
///
/// `token_var` names the variable the token came from, for error messages.
///
/// # Errors
///
/// Returns error if the token is present but blank
pub fn authorization_value(
    token_var: &str,
    token: Option<&str>,
    scheme: Option<&str>,
) -> Result<Option<AuthHeader>> {
    let Some(token) = token else {
        return Ok(None);
    };

    let token = token.trim();
    if token.is_empty() {
        return Err(Error::Config(format!(
            "Environment variable {token_var} is set but empty after stripping."
        )));
    }

    let value = match scheme.map(str::trim) {
        None => format!("{DEFAULT_SCHEME} {token}"),
        Some("") => token.to_string(),
        Some(scheme) => format!("{scheme} {token}"),
    };
    Ok(Some(AuthHeader::new(value)))
}

/// Where a client takes its credentials from
#[derive(Debug, Clone)]
pub enum AuthSource {
    /// Read the variables at request time
    Env(AuthEnv),
    /// Use a fixed header, or none
    Fixed(Option<AuthHeader>),
}

impl AuthSource {
    /// Resolve to a concrete header
    ///
    /// # Errors
    ///
    /// Returns error if the environment holds a blank token
    pub fn resolve(&self) -> Result<Option<AuthHeader>> {
        match self {
            Self::Env(env) => env.header(),
            Self::Fixed(header) => Ok(header.clone()),
        }
    }
}
