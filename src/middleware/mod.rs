/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: bearer access token, http: request id / trace / limit / timeout
 */
pub mod auth;
pub mod http;
