/*
 * Responsibility
 * - GET /health (疎通用)
 * - bearer middleware は通るが、認証は要求しない
 */
pub async fn health() -> &'static str {
    "ok"
}
