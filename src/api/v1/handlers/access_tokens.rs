/*
 * Responsibility
 * - /access_tokens 系 handler (一覧 / 取得 / 発行 / 失効)
 * - 呼び出し元の AuthCtx.user_id を owner として扱う (他人の token は見えない)
 * - DTO validation → AccessTokenService 呼び出し → AppError へ変換
 */
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    api::v1::{
        dto::access_tokens::{
            AccessTokenResponse, CreateAccessTokenRequest, IssuedAccessTokenResponse,
            MessageResponse,
        },
        extractors::AuthCtxExtractor,
    },
    error::AppError,
    services::access_token::TokenError,
    state::AppState,
};

pub async fn list_access_tokens(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> Result<Json<Vec<AccessTokenResponse>>, AppError> {
    let rows = state.tokens.list(ctx.user_id).await?;

    Ok(Json(rows.into_iter().map(AccessTokenResponse::from).collect()))
}

pub async fn get_access_token(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Path(name): Path<String>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let row = state
        .tokens
        .find(ctx.user_id, &name)
        .await?
        .ok_or_else(|| TokenError::not_found(name))?;

    Ok(Json(row.into()))
}

pub async fn create_access_token(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Json(req): Json<CreateAccessTokenRequest>,
) -> Result<(StatusCode, Json<IssuedAccessTokenResponse>), AppError> {
    req.validate()
        .map_err(|message| AppError::bad_request("VALIDATION_ERROR", message))?;

    let expires_at = req.expires_at(state.clock.now_millis()).ok_or_else(|| {
        AppError::bad_request("VALIDATION_ERROR", "expires_in_hours is too large")
    })?;

    let secret = state
        .tokens
        .issue(ctx.user_id, &req.name, req.description.as_deref(), expires_at)
        .await?;

    tracing::info!(
        user_id = ctx.user_id,
        token_name = %req.name,
        expires_at,
        "access token issued"
    );

    Ok((
        StatusCode::CREATED,
        Json(IssuedAccessTokenResponse {
            name: req.name,
            description: req.description,
            expires_at,
            token: secret.into_string(),
        }),
    ))
}

pub async fn delete_access_token(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.tokens.revoke(ctx.user_id, &name).await?;

    tracing::info!(user_id = ctx.user_id, token_name = %name, "access token revoked");

    Ok(Json(MessageResponse {
        message: format!("The token '{}' was successfully deleted.", name),
    }))
}
