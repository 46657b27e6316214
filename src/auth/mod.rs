//! Bearer-token authentication and scope authorization.
//!
//! A request passes when, in order: it carries `Authorization: Bearer <jwt>`,
//! the token's signature and expiry check out, the token is not on the
//! denylist, and the route's required scope is among the token's scopes.

use std::sync::Arc;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

pub mod credentials;
pub mod denylist;
pub mod jwt;
pub mod scopes;

use credentials::CredentialStore;
use denylist::RevocationStore;
use jwt::{Claims, JwtManager};
use scopes::ScopeTable;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("token has been revoked")]
    Revoked,

    #[error("no scope rule for {0}")]
    NoRule(String),

    #[error("token lacks scope {0}")]
    ScopeNotGranted(String),

    #[error("revocation store unavailable: {0}")]
    Store(#[source] anyhow::Error),
}

/// Body of `POST /v1/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255))]
    pub client_id: String,
    #[validate(length(min = 1, max = 255))]
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub scopes: Vec<String>,
    pub expires_in: i64,
}

/// Extract the token from an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[derive(Clone)]
pub struct Authenticator {
    jwt: JwtManager,
    scopes: ScopeTable,
    denylist: Arc<dyn RevocationStore>,
    credentials: Arc<dyn CredentialStore>,
}

impl Authenticator {
    pub fn new(
        jwt: JwtManager,
        scopes: ScopeTable,
        denylist: Arc<dyn RevocationStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            jwt,
            scopes,
            denylist,
            credentials,
        }
    }

    /// Decide whether a request may proceed.
    pub async fn authorize(
        &self,
        header: Option<&str>,
        method: &Method,
        path: &str,
    ) -> Result<Claims, AuthError> {
        let token = bearer_token(header).ok_or(AuthError::MissingToken)?;
        let claims = self.jwt.validate(token)?;

        if self
            .denylist
            .is_revoked(token)
            .await
            .map_err(AuthError::Store)?
        {
            return Err(AuthError::Revoked);
        }

        let scope = self
            .scopes
            .required_scope(method, path)
            .ok_or_else(|| AuthError::NoRule(format!("{} {}", method, path)))?;
        if !claims.has_scope(scope) {
            return Err(AuthError::ScopeNotGranted(scope.to_string()));
        }
        Ok(claims)
    }

    /// Exchange client credentials for an access token.
    pub async fn login(&self, request: &LoginRequest) -> anyhow::Result<Option<LoginResponse>> {
        let Some(grant) = self
            .credentials
            .verify(&request.client_id, &request.client_secret)
            .await?
        else {
            return Ok(None);
        };

        let access_token = self.jwt.issue(&grant.client_id, &grant.scopes)?;
        tracing::info!(client_id = %grant.client_id, "issued access token");
        Ok(Some(LoginResponse {
            access_token,
            scopes: grant.scopes,
            expires_in: self.jwt.ttl_secs(),
        }))
    }

    /// Denylist the presented token for the rest of its lifetime.
    /// Returns `false` when no valid token was presented.
    pub async fn logout(&self, header: Option<&str>) -> anyhow::Result<bool> {
        let Some(token) = bearer_token(header) else {
            tracing::warn!("logout attempted without a bearer token");
            return Ok(false);
        };
        let claims = match self.jwt.validate(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(error = %e, "logout attempted with an invalid token");
                return Ok(false);
            }
        };

        self.denylist.revoke(token, claims.remaining_secs()).await?;
        tracing::info!(client_id = %claims.client_id, jti = %claims.jti, "token revoked");
        Ok(true)
    }
}
