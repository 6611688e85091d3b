//! Shared fixtures for router and middleware tests.

use std::sync::Arc;
use std::time::Duration;

use crate::repos::memory_token_store::MemoryTokenStore;
use crate::repos::user_directory::{DirectoryUser, MemoryUserDirectory};
use crate::services::access_token::AccessTokenService;
use crate::services::auth::BearerAuthenticator;
use crate::services::clock::TestClock;
use crate::state::AppState;

pub const T: i64 = 1_700_000_000_000;

pub struct TestApp {
    pub state: AppState,
    pub directory: MemoryUserDirectory,
    pub clock: Arc<TestClock>,
}

impl TestApp {
    /// Users 1 (alice) and 2 (bob), both enabled; clock frozen at `T`.
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Same fixture with bearer authentication switched off.
    pub fn with_auth_disabled() -> Self {
        Self::build(false)
    }

    fn build(auth_enabled: bool) -> Self {
        let tokens = AccessTokenService::new(Arc::new(MemoryTokenStore::new()));
        let directory = MemoryUserDirectory::new([
            DirectoryUser::new(1, "alice").with_authority("ROLE_USER"),
            DirectoryUser::new(2, "bob").with_authority("ROLE_USER"),
        ]);
        let clock = Arc::new(TestClock::at(T));

        let bearer = BearerAuthenticator::new(
            tokens.clone(),
            Arc::new(directory.clone()),
            clock.clone(),
            auth_enabled,
            Duration::from_secs(2),
        );

        Self {
            state: AppState::new(tokens, Arc::new(bearer), clock.clone()),
            directory,
            clock,
        }
    }

    pub fn tokens(&self) -> &AccessTokenService {
        &self.state.tokens
    }
}
