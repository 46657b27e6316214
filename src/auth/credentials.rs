use std::path::Path;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a successfully authenticated client is entitled to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientGrant {
    pub client_id: String,
    pub scopes: Vec<String>,
}

/// Source of client credentials used by the login endpoint.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` for an unknown client or a wrong secret.
    async fn verify(&self, client_id: &str, secret: &str) -> anyhow::Result<Option<ClientGrant>>;
}

/// One entry of the clients file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub client_id: String,
    /// argon2id PHC string, as printed by `listings-api hash-secret`.
    pub secret_hash: String,
    pub scopes: Vec<String>,
}

/// Hash a client secret with argon2id and a random salt.
pub fn hash_secret(secret: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash secret: {}", e))?;
    Ok(hash.to_string())
}

/// Fixed client list, loaded once at start-up.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    clients: Vec<ClientRecord>,
}

impl StaticCredentialStore {
    /// Fails if any record's `secretHash` is not a PHC string.
    pub fn new(clients: Vec<ClientRecord>) -> anyhow::Result<Self> {
        for client in &clients {
            PasswordHash::new(&client.secret_hash).map_err(|e| {
                anyhow::anyhow!("client {}: secretHash is not a PHC string: {}", client.client_id, e)
            })?;
        }
        Ok(Self { clients })
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let clients: Vec<ClientRecord> = serde_json::from_str(&raw)?;
        Self::new(clients)
    }

    /// Register a client by its plaintext secret.
    pub fn with_client(
        mut self,
        client_id: &str,
        secret: &str,
        scopes: &[&str],
    ) -> anyhow::Result<Self> {
        self.clients.push(ClientRecord {
            client_id: client_id.to_string(),
            secret_hash: hash_secret(secret)?,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn verify(&self, client_id: &str, secret: &str) -> anyhow::Result<Option<ClientGrant>> {
        let Some(client) = self.clients.iter().find(|c| c.client_id == client_id) else {
            tracing::warn!("login attempted with unknown clientId");
            return Ok(None);
        };

        let stored = PasswordHash::new(&client.secret_hash)
            .map_err(|e| anyhow::anyhow!("stored hash for {} is invalid: {}", client_id, e))?;
        if Argon2::default()
            .verify_password(secret.as_bytes(), &stored)
            .is_err()
        {
            tracing::warn!(client_id, "login attempted with invalid clientSecret");
            return Ok(None);
        }

        Ok(Some(ClientGrant {
            client_id: client.client_id.clone(),
            scopes: client.scopes.clone(),
        }))
    }
}
