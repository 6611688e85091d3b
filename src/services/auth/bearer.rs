//! Bearer token authentication.
//!
//! One decision per request, no state carried between requests:
//! - enforcement disabled / no header / other scheme / unknown token → pass through
//! - expired token / disabled owner / collaborator failure / timeout → deny
//! - otherwise → authenticated
//!
//! Pass-through leaves the decision to later mechanisms (or anonymous access
//! policy). A recognised but unusable credential is always denied outright.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, header};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::repos::token_store::AccessToken;
use crate::repos::user_directory::{DirectoryError, DirectoryUser, UserDirectory};
use crate::services::access_token::{AccessTokenService, TokenError};
use crate::services::clock::Clock;

const BEARER_PREFIX: &str = "bearer ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassThrough {
    Disabled,
    NoCredentials,
    OtherScheme,
    UnknownToken,
}

#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("Specified token is expired")]
    Expired,
    #[error("User for the token is disabled by admin")]
    DisabledUser,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("Timed out while authenticating the access token")]
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct AuthenticatedToken {
    pub user: DirectoryUser,
    pub token_id: i64,
    pub token_name: String,
}

#[derive(Debug)]
pub enum BearerOutcome {
    PassThrough(PassThrough),
    Denied(AuthFailure),
    Authenticated(AuthenticatedToken),
}

#[derive(Clone)]
pub struct BearerAuthenticator {
    tokens: AccessTokenService,
    directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    enabled: bool,
    lookup_timeout: Duration,
}

impl std::fmt::Debug for BearerAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuthenticator")
            .field("enabled", &self.enabled)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish_non_exhaustive()
    }
}

impl BearerAuthenticator {
    pub fn new(
        tokens: AccessTokenService,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        enabled: bool,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            directory,
            clock,
            enabled,
            lookup_timeout,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> BearerOutcome {
        if !self.enabled {
            return BearerOutcome::PassThrough(PassThrough::Disabled);
        }

        let Some(value) = headers.get(header::AUTHORIZATION) else {
            debug!("token auth credentials are not provided in request");
            return BearerOutcome::PassThrough(PassThrough::NoCredentials);
        };

        let Ok(value) = value.to_str() else {
            return BearerOutcome::PassThrough(PassThrough::OtherScheme);
        };

        if value.trim().is_empty() {
            debug!("token auth credentials are not provided in request");
            return BearerOutcome::PassThrough(PassThrough::NoCredentials);
        }

        let Some(secret) = extract_bearer(value) else {
            debug!("authorization header does not carry a bearer token");
            return BearerOutcome::PassThrough(PassThrough::OtherScheme);
        };

        match tokio::time::timeout(self.lookup_timeout, self.verify(secret)).await {
            Ok(Ok(Some(authenticated))) => BearerOutcome::Authenticated(authenticated),
            Ok(Ok(None)) => {
                debug!("specified token was invalid");
                BearerOutcome::PassThrough(PassThrough::UnknownToken)
            }
            Ok(Err(failure)) => BearerOutcome::Denied(failure),
            Err(_) => {
                warn!(
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "token authentication timed out"
                );
                BearerOutcome::Denied(AuthFailure::TimedOut)
            }
        }
    }

    async fn verify(&self, secret: &str) -> Result<Option<AuthenticatedToken>, AuthFailure> {
        let Some(token) = self.tokens.resolve_by_secret(secret).await? else {
            return Ok(None);
        };

        let now = self.clock.now_millis();
        if token.is_expired_at(now) {
            info!(
                owner_id = token.owner_id,
                token_name = %token.name,
                expires_at = token.expires_at,
                "specified token is expired"
            );
            return Err(AuthFailure::Expired);
        }

        let user = self.directory.load(token.owner_id).await.map_err(|e| {
            warn!(owner_id = token.owner_id, error = %e, "failed to load token owner");
            e
        })?;

        if !user.enabled {
            info!(
                owner_id = token.owner_id,
                "user account associated with the token is disabled by admin"
            );
            return Err(AuthFailure::DisabledUser);
        }

        Ok(Some(authenticated(user, token)))
    }
}

fn authenticated(user: DirectoryUser, token: AccessToken) -> AuthenticatedToken {
    AuthenticatedToken {
        user,
        token_id: token.id,
        token_name: token.name,
    }
}

/// `Bearer <token>`: scheme compared case-insensitively, token taken verbatim.
pub fn extract_bearer(value: &str) -> Option<&str> {
    let scheme = value.get(..BEARER_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }

    value
        .get(BEARER_PREFIX.len()..)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use testresult::TestResult;

    use super::*;
    use crate::repos::error::RepoError;
    use crate::repos::memory_token_store::MemoryTokenStore;
    use crate::repos::token_store::MockTokenStore;
    use crate::repos::user_directory::{MemoryUserDirectory, MockUserDirectory};
    use crate::services::clock::TestClock;

    const T: i64 = 1_700_000_000_000;
    const TIMEOUT: Duration = Duration::from_secs(2);

    struct Fixture {
        tokens: AccessTokenService,
        directory: MemoryUserDirectory,
        clock: Arc<TestClock>,
        auth: BearerAuthenticator,
    }

    fn fixture() -> Fixture {
        let tokens = AccessTokenService::new(Arc::new(MemoryTokenStore::new()));
        let directory = MemoryUserDirectory::new([
            DirectoryUser::new(1, "alice").with_authority("ROLE_USER"),
            DirectoryUser::new(2, "bob"),
        ]);
        let clock = Arc::new(TestClock::at(T));
        let auth = BearerAuthenticator::new(
            tokens.clone(),
            Arc::new(directory.clone()),
            clock.clone(),
            true,
            TIMEOUT,
        );

        Fixture {
            tokens,
            directory,
            clock,
            auth,
        }
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(value) {
            headers.insert(header::AUTHORIZATION, v);
        }
        headers
    }

    #[test]
    fn extracts_bearer_scheme_case_insensitively() {
        assert_eq!(extract_bearer("Bearer ABC"), Some("ABC"));
        assert_eq!(extract_bearer("bearer ABC"), Some("ABC"));
        assert_eq!(extract_bearer("BEARER abc"), Some("abc"));
        assert_eq!(extract_bearer("Bearer  ABC"), Some(" ABC"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract_bearer("BearerABC"), None);
        assert_eq!(extract_bearer("Bear"), None);
        assert_eq!(extract_bearer("Bearé ABC"), None);
    }

    #[tokio::test]
    async fn issued_token_authenticates_until_it_expires() -> TestResult {
        let f = fixture();

        let secret = f
            .tokens
            .issue(1, "ci-token", Some("build bot"), T + 3_600_000)
            .await?;
        let headers = bearer(&format!("Bearer {}", secret.as_str()));

        f.clock.set(T + 1_000);
        match f.auth.authenticate(&headers).await {
            BearerOutcome::Authenticated(a) => {
                assert_eq!(a.user.id, 1);
                assert_eq!(a.token_name, "ci-token");
                assert!(a.user.authorities.contains("ROLE_USER"));
            }
            other => panic!("expected authenticated, got {other:?}"),
        }

        f.clock.set(T + 3_600_000);
        assert!(matches!(
            f.auth.authenticate(&headers).await,
            BearerOutcome::Authenticated(_)
        ));

        f.clock.set(T + 3_600_001);
        match f.auth.authenticate(&headers).await {
            BearerOutcome::Denied(failure @ AuthFailure::Expired) => {
                assert_eq!(failure.to_string(), "Specified token is expired")
            }
            other => panic!("expected expiry denial, got {other:?}"),
        }

        Ok(())
    }

    #[tokio::test]
    async fn missing_blank_and_foreign_headers_pass_through() {
        let f = fixture();

        let cases = [
            (HeaderMap::new(), PassThrough::NoCredentials),
            (bearer("   "), PassThrough::NoCredentials),
            (bearer("Basic dXNlcjpwYXNz"), PassThrough::OtherScheme),
            (bearer("Bearer "), PassThrough::OtherScheme),
        ];

        for (headers, expected) in cases {
            match f.auth.authenticate(&headers).await {
                BearerOutcome::PassThrough(reason) => assert_eq!(reason, expected),
                other => panic!("expected pass-through, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn non_utf8_header_passes_through() -> TestResult {
        let f = fixture();

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xff")?);

        assert!(matches!(
            f.auth.authenticate(&headers).await,
            BearerOutcome::PassThrough(PassThrough::OtherScheme)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn unknown_token_passes_through() {
        let f = fixture();

        assert!(matches!(
            f.auth
                .authenticate(&bearer("Bearer 0123456789ABCDEF0123456789ABCDEF"))
                .await,
            BearerOutcome::PassThrough(PassThrough::UnknownToken)
        ));
    }

    #[tokio::test]
    async fn disabled_enforcement_skips_all_checks() {
        let mut store = MockTokenStore::new();
        store.expect_find_by_secret_digest().never();
        let mut directory = MockUserDirectory::new();
        directory.expect_load().never();

        let auth = BearerAuthenticator::new(
            AccessTokenService::new(Arc::new(store)),
            Arc::new(directory),
            Arc::new(TestClock::at(T)),
            false,
            TIMEOUT,
        );

        assert!(matches!(
            auth.authenticate(&bearer("Bearer ABC")).await,
            BearerOutcome::PassThrough(PassThrough::Disabled)
        ));
    }

    #[tokio::test]
    async fn disabled_owner_is_denied_even_when_unexpired() -> TestResult {
        let f = fixture();

        let secret = f.tokens.issue(2, "bot", None, T + 10_000).await?;
        f.directory.upsert(DirectoryUser::new(2, "bob").disabled());

        match f
            .auth
            .authenticate(&bearer(&format!("Bearer {}", secret.as_str())))
            .await
        {
            BearerOutcome::Denied(failure @ AuthFailure::DisabledUser) => assert_eq!(
                failure.to_string(),
                "User for the token is disabled by admin"
            ),
            other => panic!("expected disabled denial, got {other:?}"),
        }

        Ok(())
    }

    #[tokio::test]
    async fn expiry_is_checked_before_the_directory() -> TestResult {
        let tokens = AccessTokenService::new(Arc::new(MemoryTokenStore::new()));
        let secret = tokens.issue(1, "old", None, T - 1).await?;

        let mut directory = MockUserDirectory::new();
        directory.expect_load().never();

        let auth = BearerAuthenticator::new(
            tokens,
            Arc::new(directory),
            Arc::new(TestClock::at(T)),
            true,
            TIMEOUT,
        );

        assert!(matches!(
            auth.authenticate(&bearer(&format!("Bearer {}", secret.as_str())))
                .await,
            BearerOutcome::Denied(AuthFailure::Expired)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn revoked_token_passes_through() -> TestResult {
        let f = fixture();

        let secret = f.tokens.issue(1, "ci", None, T + 10_000).await?;
        f.tokens.revoke(1, "ci").await?;

        assert!(matches!(
            f.auth
                .authenticate(&bearer(&format!("Bearer {}", secret.as_str())))
                .await,
            BearerOutcome::PassThrough(PassThrough::UnknownToken)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn owner_missing_from_directory_is_denied() -> TestResult {
        let f = fixture();

        let secret = f.tokens.issue(99, "orphan", None, T + 10_000).await?;

        match f
            .auth
            .authenticate(&bearer(&format!("Bearer {}", secret.as_str())))
            .await
        {
            BearerOutcome::Denied(failure @ AuthFailure::Directory(_)) => {
                assert!(failure.to_string().contains("99"))
            }
            other => panic!("expected directory denial, got {other:?}"),
        }

        Ok(())
    }

    #[tokio::test]
    async fn store_failure_is_denied() {
        let mut store = MockTokenStore::new();
        store
            .expect_find_by_secret_digest()
            .once()
            .returning(|_| Err(RepoError::Db(sqlx::Error::PoolTimedOut)));

        let auth = BearerAuthenticator::new(
            AccessTokenService::new(Arc::new(store)),
            Arc::new(MemoryUserDirectory::default()),
            Arc::new(TestClock::at(T)),
            true,
            TIMEOUT,
        );

        assert!(matches!(
            auth.authenticate(&bearer("Bearer ABC")).await,
            BearerOutcome::Denied(AuthFailure::Token(TokenError::Store(_)))
        ));
    }

    struct HangingDirectory;

    #[async_trait]
    impl UserDirectory for HangingDirectory {
        async fn load(&self, _user_id: i64) -> Result<DirectoryUser, DirectoryError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(DirectoryError::UnknownUser(0))
        }
    }

    #[tokio::test]
    async fn slow_directory_times_out_into_a_denial() -> TestResult {
        let tokens = AccessTokenService::new(Arc::new(MemoryTokenStore::new()));
        let secret = tokens.issue(1, "ci", None, T + 10_000).await?;

        let auth = BearerAuthenticator::new(
            tokens,
            Arc::new(HangingDirectory),
            Arc::new(TestClock::at(T)),
            true,
            Duration::from_millis(20),
        );

        assert!(matches!(
            auth.authenticate(&bearer(&format!("Bearer {}", secret.as_str())))
                .await,
            BearerOutcome::Denied(AuthFailure::TimedOut)
        ));

        Ok(())
    }
}
