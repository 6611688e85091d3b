/*
 * Responsibility
 * - user id → (enabled, authorities) を解決する契約 (UserDirectory)
 * - memory 実装 (開発用 / テスト用)
 */
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use crate::repos::error::RepoError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub enabled: bool,
    pub authorities: BTreeSet<String>,
}

impl DirectoryUser {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            display_name: name.clone(),
            name,
            enabled: true,
            authorities: BTreeSet::new(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authorities.insert(authority.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user with id '{0}' does not exist")]
    UnknownUser(i64),
    #[error("user directory unavailable: {0}")]
    Backend(#[from] RepoError),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn load(&self, user_id: i64) -> Result<DirectoryUser, DirectoryError>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryUserDirectory {
    users: Arc<RwLock<HashMap<i64, DirectoryUser>>>,
}

impl MemoryUserDirectory {
    pub fn new(users: impl IntoIterator<Item = DirectoryUser>) -> Self {
        let users = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }

    #[cfg(test)]
    pub fn upsert(&self, user: DirectoryUser) {
        self.users.write().insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn load(&self, user_id: i64) -> Result<DirectoryUser, DirectoryError> {
        self.users
            .read()
            .get(&user_id)
            .cloned()
            .ok_or(DirectoryError::UnknownUser(user_id))
    }
}
