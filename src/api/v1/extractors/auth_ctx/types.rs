/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - token の解決 / 期限 / アカウント状態の検証は middleware/services 側の責務
 */
use std::collections::BTreeSet;

use uuid::Uuid;

use crate::services::auth::AuthenticatedToken;

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `user_id` は token の owner
/// - `authorities` は user directory が返した権限
/// - `session_id` は認証のたびに新しく採番する (以前の値は引き継がない)
/// - `token_name` は監査/ログ相関用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCtx {
    pub user_id: i64,
    pub user_name: String,
    pub display_name: String,
    pub authorities: BTreeSet<String>,
    pub session_id: Uuid,
    pub token_name: String,
}

impl AuthCtx {
    /// Bind an authenticated token to a brand new session.
    pub fn new_session(authenticated: AuthenticatedToken) -> Self {
        let user = authenticated.user;
        Self {
            user_id: user.id,
            user_name: user.name,
            display_name: user.display_name,
            authorities: user.authorities,
            session_id: Uuid::new_v4(),
            token_name: authenticated.token_name,
        }
    }
}
