//! Bearer-token storage for the material client

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Access and refresh token pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl AuthTokens {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

/// Body of `POST /auth/refresh`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response of `POST /auth/refresh`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Current tokens of one client instance
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: RwLock<Option<AuthTokens>>,
}

impl TokenStore {
    pub fn new(tokens: Option<AuthTokens>) -> Self {
        Self {
            tokens: RwLock::new(tokens),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens.read().as_ref().map(|t| t.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.tokens.read().as_ref().and_then(|t| t.refresh_token.clone())
    }

    pub fn set(&self, tokens: AuthTokens) {
        *self.tokens.write() = Some(tokens);
    }

    /// Store a refreshed access token; keeps the old refresh token when none is returned
    pub(crate) fn apply_refresh(&self, response: RefreshResponse) {
        let mut guard = self.tokens.write();
        let refresh_token = response
            .refresh_token
            .or_else(|| guard.as_ref().and_then(|t| t.refresh_token.clone()));
        *guard = Some(AuthTokens {
            access_token: response.access_token,
            refresh_token,
        });
    }

    pub fn clear(&self) {
        *self.tokens.write() = None;
    }
}
