/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, token store 種別, 認証設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::repos::user_directory::DirectoryUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where tokens and users live.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    // Development only: nothing survives a restart.
    Memory { users: Vec<DirectoryUser> },
}

/// `DEV_TOKENS` entry: a token issued at startup so the management API can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedToken {
    pub owner_id: i64,
    pub name: String,
    pub expires_in_hours: i64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub store: StoreConfig,

    // When false, the bearer filter lets every request through untouched.
    pub auth_enabled: bool,
    pub auth_lookup_timeout: Duration,

    pub request_timeout: Duration,

    pub seed_tokens: Vec<SeedToken>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = env_or("PORT", 3000)?;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let app_env = AppEnv::from_env();

        let store = match std::env::var("TOKEN_STORE")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" => {
                let database_url = std::env::var("DATABASE_URL")
                    .map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
                let max_connections = non_zero(
                    "DATABASE_MAX_CONNECTIONS",
                    env_or("DATABASE_MAX_CONNECTIONS", 10u32)?,
                )?;

                StoreConfig::Postgres {
                    database_url,
                    max_connections,
                }
            }
            "memory" => StoreConfig::Memory {
                users: parse_dev_users(&std::env::var("DEV_USERS").unwrap_or_default())?,
            },
            _ => return Err(ConfigError::Invalid("TOKEN_STORE")),
        };

        let auth_enabled = match std::env::var("AUTH_ENABLED") {
            Ok(v) => parse_bool(&v).ok_or(ConfigError::Invalid("AUTH_ENABLED"))?,
            Err(_) => true,
        };

        let auth_lookup_timeout = Duration::from_millis(non_zero(
            "AUTH_LOOKUP_TIMEOUT_MS",
            env_or("AUTH_LOOKUP_TIMEOUT_MS", 2_000u64)?,
        )?);

        let request_timeout = Duration::from_secs(non_zero(
            "REQUEST_TIMEOUT_SECONDS",
            env_or("REQUEST_TIMEOUT_SECONDS", 30u64)?,
        )?);

        let seed_tokens =
            parse_dev_tokens(&std::env::var("DEV_TOKENS").unwrap_or_default(), app_env)?;

        Ok(Self {
            addr,
            app_env,
            store,
            auth_enabled,
            auth_lookup_timeout,
            request_timeout,
            seed_tokens,
        })
    }
}

/// Unset → `default`; set but unparsable → `Invalid(key)`.
fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    parse_or(key, std::env::var(key).ok().as_deref(), default)
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<&str>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid(key)),
    }
}

fn non_zero<T: Default + PartialEq>(key: &'static str, value: T) -> Result<T, ConfigError> {
    if value == T::default() {
        return Err(ConfigError::Invalid(key));
    }
    Ok(value)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `DEV_USERS=1:alice,2:bob:disabled`
fn parse_dev_users(raw: &str) -> Result<Vec<DirectoryUser>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let mut parts = entry.split(':');
            let id = parts
                .next()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|id| *id > 0)
                .ok_or(ConfigError::Invalid("DEV_USERS"))?;
            let name = parts
                .next()
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Invalid("DEV_USERS"))?;

            let user = DirectoryUser::new(id, name).with_authority("ROLE_USER");
            match parts.next() {
                None => Ok(user),
                Some("disabled") => Ok(user.disabled()),
                Some(_) => Err(ConfigError::Invalid("DEV_USERS")),
            }
        })
        .collect()
}

/// `DEV_TOKENS=1:bootstrap:24` (owner id, token name, lifetime in hours).
///
/// Seeded secrets are written to the log, so production refuses them.
fn parse_dev_tokens(raw: &str, app_env: AppEnv) -> Result<Vec<SeedToken>, ConfigError> {
    let seeds = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split(':').collect();
            let [owner_id, name, hours] = parts.as_slice() else {
                return Err(ConfigError::Invalid("DEV_TOKENS"));
            };

            let owner_id = owner_id
                .parse::<i64>()
                .ok()
                .filter(|id| *id > 0)
                .ok_or(ConfigError::Invalid("DEV_TOKENS"))?;
            let expires_in_hours = hours
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or(ConfigError::Invalid("DEV_TOKENS"))?;
            if name.is_empty() {
                return Err(ConfigError::Invalid("DEV_TOKENS"));
            }

            Ok(SeedToken {
                owner_id,
                name: name.to_string(),
                expires_in_hours,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if !seeds.is_empty() && app_env.is_production() {
        return Err(ConfigError::Invalid("DEV_TOKENS"));
    }
    Ok(seeds)
}
