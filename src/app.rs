/*
 * Responsibility
 * - Config読み込み → 依存生成 (token store / user directory / bearer filter) → Router 組み立て
 * - DEV_TOKENS の seed 発行 (最初の token は HTTP からは作れないため)
 * - Middleware の適用 (bearer → http の順で外側へ)
 * - axum::serve() で起動
 */
use std::time::Duration;
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    api::v1::handlers::health::health,
    config::{Config, SeedToken, StoreConfig},
    middleware,
    repos::{
        access_token_repo::AccessTokenRepo, memory_token_store::MemoryTokenStore,
        token_store::TokenStore, user_directory::MemoryUserDirectory,
        user_directory::UserDirectory, user_repo::UserRepo,
    },
    services::{
        access_token::{AccessTokenService, TokenError, TokenSecret},
        auth::BearerAuthenticator,
        clock::{Clock, SystemClock, hours_after},
    },
    state::AppState,
};

fn init_tracing() {
    // RUST_LOG=info,access_tokens=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development fails fast; production keeps serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting access token API in {:?} mode on {}",
        config.app_env,
        config.addr
    );
    if !config.auth_enabled {
        tracing::warn!("bearer token authentication is disabled");
    }

    let state = build_state(&config).await?;
    let app = build_router(state, config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let (store, directory): (Arc<dyn TokenStore>, Arc<dyn UserDirectory>) = match &config.store {
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let pool = PgPoolOptions::new()
                .max_connections(*max_connections)
                .connect(database_url)
                .await
                .context("failed to connect to postgres")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("failed to run migrations")?;

            (
                Arc::new(AccessTokenRepo::new(pool.clone())),
                Arc::new(UserRepo::new(pool)),
            )
        }
        StoreConfig::Memory { users } => {
            tracing::warn!(users = users.len(), "using in-memory token store");
            (
                Arc::new(MemoryTokenStore::new()),
                Arc::new(MemoryUserDirectory::new(users.iter().cloned())),
            )
        }
    };

    let clock = Arc::new(SystemClock);
    let tokens = AccessTokenService::new(store);
    seed_tokens(&tokens, clock.as_ref(), &config.seed_tokens).await?;

    let bearer = BearerAuthenticator::new(
        tokens.clone(),
        directory,
        clock.clone(),
        config.auth_enabled,
        config.auth_lookup_timeout,
    );

    Ok(AppState::new(tokens, Arc::new(bearer), clock))
}

/// Issue the `DEV_TOKENS` seeds and log each secret once.
///
/// A name the owner already has (restart against Postgres) is skipped.
async fn seed_tokens(
    tokens: &AccessTokenService,
    clock: &dyn Clock,
    seeds: &[SeedToken],
) -> Result<Vec<TokenSecret>> {
    let mut issued = Vec::with_capacity(seeds.len());

    for seed in seeds {
        let expires_at = hours_after(clock.now_millis(), seed.expires_in_hours)
            .with_context(|| format!("lifetime of seed token '{}' is too large", seed.name))?;

        match tokens
            .issue(seed.owner_id, &seed.name, None, expires_at)
            .await
        {
            Ok(secret) => {
                tracing::warn!(
                    owner_id = seed.owner_id,
                    token_name = %seed.name,
                    token = secret.as_str(),
                    expires_at,
                    "seeded access token; the secret is not shown again"
                );
                issued.push(secret);
            }
            Err(TokenError::Duplicate { .. }) => {
                tracing::info!(
                    owner_id = seed.owner_id,
                    token_name = %seed.name,
                    "seed token already exists, skipping"
                );
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to seed access token '{}'", seed.name));
            }
        }
    }

    Ok(issued)
}

pub(crate) fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let router = Router::new()
        .route("/health", axum::routing::get(health))
        .nest("/api/v1", api::v1::routes());

    let router = middleware::auth::access::apply(router, state.clone()).with_state(state);
    middleware::http::apply(router, request_timeout)
}
