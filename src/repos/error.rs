/**
 * Responsibility
 * - repo が上位に伝える意味の定義
 * - unique / foreign key 違反は sqlx::Error のまま返さず、意味を付けて返す
 */
use thiserror::Error;

// Postgres SQLSTATE codes
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict")]
    Conflict,
    #[error("owner does not exist")]
    UnknownOwner,
}

impl RepoError {
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(dbe) = &e {
            match dbe.code().as_deref() {
                Some(UNIQUE_VIOLATION) => return RepoError::Conflict,
                Some(FOREIGN_KEY_VIOLATION) => return RepoError::UnknownOwner,
                _ => {}
            }
        }
        RepoError::Db(e)
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_stay_db_errors() {
        let err = RepoError::from_sqlx(sqlx::Error::PoolTimedOut);

        assert!(matches!(err, RepoError::Db(sqlx::Error::PoolTimedOut)));
    }
}
