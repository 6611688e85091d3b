/*
 * Responsibility
 * - access token の永続化契約 (TokenStore)
 * - (owner_id, name) と secret_digest の一意性は store 側が原子的に保証する
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::repos::error::RepoResult;

/// A persisted access token.
///
/// Only the SHA-256 digest of the secret is kept; the plaintext exists once,
/// in the issuance response.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AccessToken {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub secret_digest: Vec<u8>,
    /// Epoch milliseconds.
    pub expires_at: i64,
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    /// A token is still usable at exactly `expires_at`.
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.expires_at < now_millis
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccessToken {
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub secret_digest: Vec<u8>,
    pub expires_at: i64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    // Returns the stored record, or `RepoError::Conflict` when (owner_id, name)
    // or the secret digest is already taken.
    async fn insert(&self, token: NewAccessToken) -> RepoResult<AccessToken>;

    async fn find_by_owner_and_name(
        &self,
        owner_id: i64,
        name: &str,
    ) -> RepoResult<Option<AccessToken>>;

    async fn find_by_secret_digest(&self, digest: &[u8]) -> RepoResult<Option<AccessToken>>;

    // Insertion order.
    async fn list_by_owner(&self, owner_id: i64) -> RepoResult<Vec<AccessToken>>;

    // `Ok(false)` when the row was already gone.
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}
