/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health, /access_tokens, /access_tokens/{name}
 * - 認証は app 側で全体に掛ける bearer middleware と、handler の AuthCtxExtractor で行う
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::v1::handlers::{
    access_tokens::{
        create_access_token, delete_access_token, get_access_token, list_access_tokens,
    },
    health::health,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/access_tokens",
            get(list_access_tokens).post(create_access_token),
        )
        .route(
            "/access_tokens/{name}",
            get(get_access_token).delete(delete_access_token),
        )
}
