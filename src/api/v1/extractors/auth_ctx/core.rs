use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

use super::AuthCtx;

/// Handler で、 AuthCtx を受け取るための extractor
/// bearer middleware が AuthCtx を request.extensions() に insert 済みである前提
/// 見つからない場合は 401 を返す（匿名リクエスト・他の認証方式に委ねられたリクエスト）
/// 認証自体が無効 (AUTH_ENABLED=false) なら credential を送っても意味がないので 403
pub struct AuthCtxExtractor(pub AuthCtx);

impl FromRequestParts<AppState> for AuthCtxExtractor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !state.bearer.is_enabled() {
            return Err(AppError::Forbidden(
                "Authentication must be enabled to manage access tokens".to_string(),
            ));
        }

        parts
            .extensions
            .get::<AuthCtx>()
            .cloned()
            .map(AuthCtxExtractor)
            .ok_or_else(|| AppError::unauthorized("Authentication is required"))
    }
}
