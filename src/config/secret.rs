//! Secure credential handling using the secrecy crate
//!
//! Connection strings and URLs that may embed passwords are held as
//! [`SecretString`]: the memory is zeroed on drop, `Debug` output is redacted and
//! the value is only reachable through `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use ehr2row::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let url = secret_string("redis://:password@localhost:6379".to_string());
//! assert_eq!(url.expose_secret().as_str(), "redis://:password@localhost:6379");
//! assert!(!format!("{url:?}").contains("password"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret};
use serde::{Deserialize, Deserializer};
use zeroize::Zeroize;

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl SecretValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// A string secret that is zeroed on drop and redacted in `Debug` output
pub type SecretString = Secret<SecretValue>;

/// Wraps a String as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Host part of a URL-like secret, for log output
///
/// Strips the scheme, any `user:password@` credentials and the path, so the
/// result can be logged.
pub fn redacted_host(secret: &SecretString) -> String {
    use secrecy::ExposeSecret;

    let value = secret.expose_secret().as_str();
    let without_scheme = value.split_once("://").map_or(value, |(_, rest)| rest);
    let without_credentials = without_scheme
        .rsplit_once('@')
        .map_or(without_scheme, |(_, host)| host);
    without_credentials
        .split(['/', '?'])
        .next()
        .unwrap_or_default()
        .to_string()
}
