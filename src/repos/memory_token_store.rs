//! In-memory token store.
//!
//! Used for development (`TOKEN_STORE=memory`) and tests. All uniqueness checks
//! and the insert happen under one write lock, so the store gives the same
//! atomic guarantees as the unique constraints of the Postgres schema.
//!
//! Data is not persisted; everything is lost when the process exits.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::repos::error::{RepoError, RepoResult};
use crate::repos::token_store::{AccessToken, NewAccessToken, TokenStore};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    // Ordered by id, which doubles as insertion order.
    by_id: BTreeMap<i64, AccessToken>,
    by_owner_and_name: HashMap<(i64, String), i64>,
    by_digest: HashMap<Vec<u8>, i64>,
}

/// Cheaply cloneable; all clones share the same tables.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, token: NewAccessToken) -> RepoResult<AccessToken> {
        let mut tables = self.tables.write();

        let owner_key = (token.owner_id, token.name.clone());
        if tables.by_owner_and_name.contains_key(&owner_key)
            || tables.by_digest.contains_key(&token.secret_digest)
        {
            return Err(RepoError::Conflict);
        }

        tables.next_id += 1;
        let id = tables.next_id;

        let row = AccessToken {
            id,
            owner_id: token.owner_id,
            name: token.name,
            description: token.description,
            secret_digest: token.secret_digest,
            expires_at: token.expires_at,
            created_at: Utc::now(),
        };

        tables.by_owner_and_name.insert(owner_key, id);
        tables.by_digest.insert(row.secret_digest.clone(), id);
        tables.by_id.insert(id, row.clone());

        Ok(row)
    }

    async fn find_by_owner_and_name(
        &self,
        owner_id: i64,
        name: &str,
    ) -> RepoResult<Option<AccessToken>> {
        let tables = self.tables.read();

        Ok(tables
            .by_owner_and_name
            .get(&(owner_id, name.to_string()))
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn find_by_secret_digest(&self, digest: &[u8]) -> RepoResult<Option<AccessToken>> {
        let tables = self.tables.read();

        Ok(tables
            .by_digest
            .get(digest)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn list_by_owner(&self, owner_id: i64) -> RepoResult<Vec<AccessToken>> {
        let tables = self.tables.read();

        Ok(tables
            .by_id
            .values()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.tables.write();

        let Some(row) = tables.by_id.remove(&id) else {
            return Ok(false);
        };

        tables.by_owner_and_name.remove(&(row.owner_id, row.name));
        tables.by_digest.remove(&row.secret_digest);

        Ok(true)
    }
}
