/*
 * Responsibility
 * - users テーブル向け SQLx 操作 (UserDirectory の Postgres 実装)
 * - roles 列をそのまま authority として返す
 */
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoError;
use crate::repos::user_directory::{DirectoryError, DirectoryUser, UserDirectory};

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub display_name: Option<String>,
    pub enabled: bool,
    pub roles: Vec<String>,
}

impl From<UserRow> for DirectoryUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name.unwrap_or_else(|| row.name.clone()),
            name: row.name,
            enabled: row.enabled,
            authorities: row.roles.into_iter().collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for UserRepo {
    async fn load(&self, user_id: i64) -> Result<DirectoryUser, DirectoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, display_name, enabled, roles
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from)?;

        row.map(DirectoryUser::from)
            .ok_or(DirectoryError::UnknownUser(user_id))
    }
}
