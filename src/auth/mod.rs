//! Credential providers.
//!
//! A [`CredentialProvider`] produces the authentication headers for one
//! request attempt and refreshes itself when its credential has expired. The
//! executor calls [`CredentialProvider::headers`] on every attempt, so a retry
//! after an expired token picks up the refreshed one.
//!
//! | Provider            | Header                              | Refresh              |
//! |---------------------|-------------------------------------|----------------------|
//! | [`ApiKeyAuth`]      | `X-API-Key: <key>` (name is configurable) | no-op          |
//! | [`BearerTokenAuth`] | `Authorization: Bearer <token>`     | no-op                |
//! | [`OAuth2Auth`]      | `Authorization: <type> <token>`     | token endpoint call  |

mod oauth2;
mod static_key;

pub use oauth2::{OAuth2Auth, OAuth2Token, TOKEN_EXPIRY_SKEW};
pub use static_key::{ApiKeyAuth, BearerTokenAuth};

use crate::Result;
use async_trait::async_trait;
use keyring::Entry;
use reqwest::header::HeaderMap;
use secrecy::SecretString;
use std::env;
use std::fmt;

/// Keyring service under which the API key may be stored.
pub const KEYRING_SERVICE: &str = "dataapi";
/// Keyring user/account name for the API key entry.
pub const KEYRING_USER: &str = "api_key";
/// Environment variable consulted last when resolving the API key.
pub const API_KEY_ENV: &str = "DATAAPI_API_KEY";

/// Source of authentication headers.
///
/// Implementations are shared by every façade and by both executor modes
/// through an `Arc<dyn CredentialProvider>`.
#[async_trait]
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Headers to attach to the next request attempt.
    ///
    /// Fails with [`crate::Error::Authentication`] when no valid credential is
    /// available and none can be obtained.
    async fn headers(&self) -> Result<HeaderMap>;

    /// Refreshes the credential if it is missing or expired. Idempotent.
    async fn refresh_if_needed(&self) -> Result<()>;
}

/// Resolves an API key: the explicit value first, then the OS keyring
/// (service [`KEYRING_SERVICE`]), then the [`API_KEY_ENV`] environment variable.
///
/// Blank values are skipped at every step.
pub fn resolve_api_key(explicit: Option<&str>) -> Option<SecretString> {
    if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
        return Some(SecretString::from(key.to_string()));
    }

    if let Ok(entry) = Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        if let Ok(key) = entry.get_password() {
            let key = key.trim();
            if !key.is_empty() {
                return Some(SecretString::from(key.to_string()));
            }
        }
    }

    env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .map(SecretString::from)
}
