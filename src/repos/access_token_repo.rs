use async_trait::async_trait;
use sqlx::PgPool;

use crate::repos::error::{RepoError, RepoResult};
use crate::repos::token_store::{AccessToken, NewAccessToken, TokenStore};

/// Postgres-backed token store.
///
/// Schema (see `migrations/`):
/// - access_tokens.id (bigserial)
/// - access_tokens.owner_id (bigint, FK users.id)
/// - access_tokens.name (varchar 255), UNIQUE (owner_id, name)
/// - access_tokens.description (varchar 512, nullable)
/// - access_tokens.secret_digest (bytea), UNIQUE
/// - access_tokens.expires_at (bigint, epoch millis)
/// - access_tokens.created_at (timestamptz)
#[derive(Clone, Debug)]
pub struct AccessTokenRepo {
    pool: PgPool,
}

impl AccessTokenRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for AccessTokenRepo {
    async fn insert(&self, token: NewAccessToken) -> RepoResult<AccessToken> {
        let row = sqlx::query_as::<_, AccessToken>(
            r#"
            INSERT INTO access_tokens (owner_id, name, description, secret_digest, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING
                id, owner_id, name, description, secret_digest, expires_at, created_at
            "#,
        )
        .bind(token.owner_id)
        .bind(&token.name)
        .bind(&token.description)
        .bind(&token.secret_digest)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(row)
    }

    async fn find_by_owner_and_name(
        &self,
        owner_id: i64,
        name: &str,
    ) -> RepoResult<Option<AccessToken>> {
        let row = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT
                id, owner_id, name, description, secret_digest, expires_at, created_at
            FROM access_tokens
            WHERE owner_id = $1 AND name = $2
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_secret_digest(&self, digest: &[u8]) -> RepoResult<Option<AccessToken>> {
        let row = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT
                id, owner_id, name, description, secret_digest, expires_at, created_at
            FROM access_tokens
            WHERE secret_digest = $1
            "#,
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_by_owner(&self, owner_id: i64) -> RepoResult<Vec<AccessToken>> {
        let rows = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT
                id, owner_id, name, description, secret_digest, expires_at, created_at
            FROM access_tokens
            WHERE owner_id = $1
            ORDER BY id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM access_tokens
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
