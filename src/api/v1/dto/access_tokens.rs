/*
 * Responsibility
 * - access token 管理 API の request/response DTO
 * - secret は発行レスポンス (IssuedAccessTokenResponse) にだけ載せる
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repos::token_store::AccessToken;
use crate::services::clock::hours_after;

#[derive(Debug, Deserialize)]
pub struct CreateAccessTokenRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub expires_in_hours: i64,
}

impl CreateAccessTokenRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("name is required");
        }
        if self.expires_in_hours <= 0 {
            return Err("expires_in_hours must be a positive number of hours");
        }
        Ok(())
    }

    /// Absolute expiry (epoch millis) relative to `now_millis`.
    pub fn expires_at(&self, now_millis: i64) -> Option<i64> {
        hours_after(now_millis, self.expires_in_hours)
    }
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub name: String,
    pub description: Option<String>,
    pub expires_at: i64,
    pub created_at: DateTime<Utc>,
}

impl From<AccessToken> for AccessTokenResponse {
    fn from(token: AccessToken) -> Self {
        Self {
            name: token.name,
            description: token.description,
            expires_at: token.expires_at,
            created_at: token.created_at,
        }
    }
}

/// Returned once, by the create endpoint. `token` cannot be retrieved again.
#[derive(Debug, Serialize)]
pub struct IssuedAccessTokenResponse {
    pub name: String,
    pub description: Option<String>,
    pub expires_at: i64,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
