/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - tokens: 発行/一覧/取得/失効, bearer: 認証フィルタ, clock: 有効期限の計算
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::access_token::AccessTokenService;
use crate::services::auth::BearerAuthenticator;
use crate::services::clock::Clock;

#[derive(Clone)]
pub struct AppState {
    pub tokens: AccessTokenService,
    pub bearer: Arc<BearerAuthenticator>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        tokens: AccessTokenService,
        bearer: Arc<BearerAuthenticator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens,
            bearer,
            clock,
        }
    }
}
