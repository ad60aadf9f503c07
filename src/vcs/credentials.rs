// ABOUTME: Credentials for authenticated git remotes.
// ABOUTME: Splices username and token into a URL authority, preserving scheme, host and path.

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::VcsError;

/// Username and token for an HTTPS git remote.
#[derive(Debug, Clone)]
pub struct RemoteCredentials {
    username: String,
    token: SecretString,
}

impl RemoteCredentials {
    pub fn new(username: impl Into<String>, token: SecretString) -> Self {
        Self {
            username: username.into(),
            token,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// URL with `username:token@` in the authority. Any userinfo already on
    /// the URL is replaced. The result must never be logged.
    pub(crate) fn inject(&self, url: &Url) -> Result<SecretString, VcsError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(VcsError::InvalidRemote(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let mut authed = url.clone();
        authed
            .set_username(&self.username)
            .map_err(|()| VcsError::InvalidRemote("URL has no host".to_string()))?;
        authed
            .set_password(Some(self.token.expose_secret()))
            .map_err(|()| VcsError::InvalidRemote("URL has no host".to_string()))?;

        Ok(SecretString::from(authed.to_string()))
    }
}
