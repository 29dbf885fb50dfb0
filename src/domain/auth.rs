//! Typed credentials handed to exporters and importers
//!
//! Auth data is serialized to JSON, encrypted by the crypto module and only
//! then attached to a job. Workers decrypt it back into [`AuthData`]; the
//! core never performs an OAuth handshake itself.

use crate::config::{secret_string, SecretString};
use crate::domain::errors::PortaError;
use crate::domain::result::Result;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Credentials for one side of a transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthData {
    /// OAuth-style access token with optional refresh token and endpoint
    TokensAndUrl {
        access_token: SecretString,
        #[serde(default)]
        refresh_token: Option<SecretString>,
        #[serde(default)]
        token_server_encoded_url: Option<String>,
    },

    /// A single bearer token or API key
    Token { token: SecretString },
}

impl AuthData {
    /// Creates token-and-url auth data
    pub fn tokens_and_url(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        token_server_encoded_url: Option<String>,
    ) -> Self {
        AuthData::TokensAndUrl {
            access_token: secret_string(access_token.into()),
            refresh_token: refresh_token.map(secret_string),
            token_server_encoded_url,
        }
    }

    /// Creates single-token auth data
    pub fn token(token: impl Into<String>) -> Self {
        AuthData::Token {
            token: secret_string(token.into()),
        }
    }

    /// The token to present as a bearer credential
    pub fn bearer_token(&self) -> &str {
        match self {
            AuthData::TokensAndUrl { access_token, .. } => access_token.expose_secret().as_ref(),
            AuthData::Token { token } => token.expose_secret().as_ref(),
        }
    }

    /// Serializes the credentials for encryption
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses decrypted credential bytes
    ///
    /// # Errors
    ///
    /// Returns `PortaError::Validation` if the payload is not valid auth data
    /// or carries an empty token.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let auth: AuthData = serde_json::from_slice(bytes)
            .map_err(|e| PortaError::Validation(format!("Malformed auth data: {e}")))?;
        if auth.bearer_token().trim().is_empty() {
            return Err(PortaError::Validation(
                "Auth data carries an empty token".to_string(),
            ));
        }
        Ok(auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_and_url_roundtrip() {
        let auth = AuthData::tokens_and_url(
            "access",
            Some("refresh".to_string()),
            Some("https://oauth2.example.com/token".to_string()),
        );
        let bytes = auth.to_bytes().unwrap();
        let back = AuthData::from_bytes(&bytes).unwrap();

        assert_eq!(back.bearer_token(), "access");
        match back {
            AuthData::TokensAndUrl {
                refresh_token,
                token_server_encoded_url,
                ..
            } => {
                assert_eq!(refresh_token.unwrap().expose_secret(), "refresh");
                assert_eq!(
                    token_server_encoded_url.as_deref(),
                    Some("https://oauth2.example.com/token")
                );
            }
            AuthData::Token { .. } => panic!("expected tokens and url"),
        }
    }

    #[test]
    fn test_token_tagging() {
        let json = String::from_utf8(AuthData::token("k").to_bytes().unwrap()).unwrap();
        assert!(json.contains("\"type\":\"token\""));
    }

    #[test]
    fn test_from_bytes_rejects_garbage_and_empty_tokens() {
        assert!(AuthData::from_bytes(b"not json").is_err());
        assert!(AuthData::from_bytes(br#"{"type":"token","token":"  "}"#).is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let auth = AuthData::token("super-secret");
        assert!(!format!("{auth:?}").contains("super-secret"));
    }
}
