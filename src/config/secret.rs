//! Credential handling
//!
//! Access keys, bearer tokens and connection strings are held in `secrecy`
//! containers. Memory is zeroed when they are dropped and `Debug` output is
//! redacted, so a logged config never leaks them.
//!
//! # Example
//!
//! ```rust
//! use sluice::config::{secret_string, SecretString};
//! use secrecy::ExposeSecret;
//!
//! let token: SecretString = secret_string("ya29.token".to_string());
//! assert_eq!(token.expose_secret().as_str(), "ya29.token");
//! assert!(!format!("{token:?}").contains("ya29"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, ExposeSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;
use zeroize::Zeroize;

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    pub fn parse<F: std::str::FromStr>(&self) -> Result<F, F::Err> {
        self.0.parse()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
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

/// Zeroized, redacted string
pub type SecretString = Secret<SecretValue>;

/// Wraps a plain string
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// `Authorization` header value for an optional bearer token
pub fn bearer_header(token: Option<&SecretString>) -> Option<String> {
    token
        .map(|t| t.expose_secret().as_str().trim().to_string())
        .filter(|t| !t.is_empty())
        .map(|t| format!("Bearer {t}"))
}

/// Connection string with the password removed, for logs
///
/// Anything that does not parse as a URL is fully redacted.
pub fn redact_connection_string(secret: &SecretString) -> String {
    match Url::parse(secret.expose_secret().as_str()) {
        Ok(mut url) => {
            if url.password().is_some() {
                // Only fails for cannot-be-a-base URLs, which carry no password
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
