//! Bearer access token → AuthCtx を extensions に入れる
//!
//! - 判定ロジックは `services::auth::bearer` 側 (この層は HTTP への橋渡しのみ)
//! - pass-through: AuthCtx を入れずに次へ (匿名アクセス可否は handler/extractor 側で決める)
//! - denied: 401 + `WWW-Authenticate: Bearer` でチェーンを打ち切る
//! - authenticated: 既存の AuthCtx は破棄し、新しい session の AuthCtx を入れる

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::BearerOutcome;
use crate::state::AppState;

/// 全ルートに bearer 認証を掛けるための middleware を適用する。
///
/// 例：
/// ```ignore
/// let router = Router::new().nest("/api/v1", api::v1::routes());
/// let router = middleware::auth::access::apply(router, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    match state.bearer.authenticate(req.headers()).await {
        BearerOutcome::PassThrough(reason) => {
            tracing::debug!(?reason, "bearer authentication passed through");
            Ok(next.run(req).await)
        }
        BearerOutcome::Denied(failure) => {
            tracing::debug!(error = %failure, "bearer authentication denied");
            Err(AppError::from(failure))
        }
        BearerOutcome::Authenticated(authenticated) => {
            let token_id = authenticated.token_id;
            let auth_ctx = AuthCtx::new_session(authenticated);
            tracing::debug!(
                user_id = auth_ctx.user_id,
                token_id,
                session_id = %auth_ctx.session_id,
                "bearer authentication succeeded"
            );

            // Never reuse a session that existed before this authentication.
            let extensions = req.extensions_mut();
            extensions.remove::<AuthCtx>();
            extensions.insert(auth_ctx);

            Ok(next.run(req).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use axum::{
        Json,
        body::to_bytes,
        extract::Request as AxumRequest,
        http::{StatusCode, header},
        routing::get,
    };
    use testresult::TestResult;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::error::BEARER_CHALLENGE;
    use crate::repos::user_directory::DirectoryUser;
    use crate::test_helpers::{T, TestApp};

    async fn whoami(req: AxumRequest) -> Json<serde_json::Value> {
        let ctx = req.extensions().get::<AuthCtx>().cloned();
        Json(serde_json::json!({
            "user_id": ctx.as_ref().map(|c| c.user_id),
            "session_id": ctx.as_ref().map(|c| c.session_id.to_string()),
        }))
    }

    fn router(app: &TestApp) -> Router {
        let router = Router::new().route("/whoami", get(whoami));
        apply(router, app.state.clone())
            .layer(axum::middleware::map_request(
                |mut req: AxumRequest| async move {
                    // Simulates state left over from an earlier authentication.
                    req.extensions_mut().insert(AuthCtx {
                        user_id: 666,
                        user_name: "stale".to_string(),
                        display_name: "stale".to_string(),
                        authorities: BTreeSet::new(),
                        session_id: Uuid::nil(),
                        token_name: "stale".to_string(),
                    });
                    req
                },
            ))
            .with_state(app.state.clone())
    }

    fn request(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).expect("valid request")
    }

    async fn json(response: Response) -> TestResult<serde_json::Value> {
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    #[tokio::test]
    async fn valid_token_replaces_existing_session() -> TestResult {
        let app = TestApp::new();
        let secret = app.tokens().issue(1, "ci-token", None, T + 3_600_000).await?;

        let response = router(&app)
            .oneshot(request(Some(&format!("Bearer {}", secret.as_str()))))
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await?;
        assert_eq!(body["user_id"], 1);
        assert_ne!(body["session_id"], Uuid::nil().to_string());

        Ok(())
    }

    #[tokio::test]
    async fn each_authentication_gets_a_fresh_session() -> TestResult {
        let app = TestApp::new();
        let secret = app.tokens().issue(1, "ci-token", None, T + 3_600_000).await?;
        let header = format!("Bearer {}", secret.as_str());

        let first = json(router(&app).oneshot(request(Some(&header))).await?).await?;
        let second = json(router(&app).oneshot(request(Some(&header))).await?).await?;

        assert_ne!(first["session_id"], second["session_id"]);

        Ok(())
    }

    #[tokio::test]
    async fn unknown_token_reaches_the_handler_unauthenticated_by_this_filter() -> TestResult {
        let app = TestApp::new();

        let response = router(&app)
            .oneshot(request(Some("Bearer 00000000000000000000000000000000")))
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        // Only the pre-existing context is visible; the filter added nothing.
        assert_eq!(json(response).await?["user_id"], 666);

        Ok(())
    }

    #[tokio::test]
    async fn missing_header_reaches_the_handler() -> TestResult {
        let app = TestApp::new();

        let response = router(&app).oneshot(request(None)).await?;

        assert_eq!(response.status(), StatusCode::OK);

        Ok(())
    }

    #[tokio::test]
    async fn expired_token_is_rejected_with_challenge() -> TestResult {
        let app = TestApp::new();
        let secret = app.tokens().issue(1, "ci-token", None, T + 3_600_000).await?;
        app.clock.set(T + 3_600_001);

        let response = router(&app)
            .oneshot(request(Some(&format!("bearer {}", secret.as_str()))))
            .await?;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE),
            Some(&header::HeaderValue::from_static(BEARER_CHALLENGE))
        );
        assert_eq!(
            json(response).await?["error"]["message"],
            "Specified token is expired"
        );

        Ok(())
    }

    #[tokio::test]
    async fn disabled_user_is_rejected_with_distinct_message() -> TestResult {
        let app = TestApp::new();
        let secret = app.tokens().issue(2, "bot", None, T + 3_600_000).await?;
        app.directory.upsert(DirectoryUser::new(2, "bob").disabled());

        let response = router(&app)
            .oneshot(request(Some(&format!("Bearer {}", secret.as_str()))))
            .await?;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json(response).await?["error"]["message"],
            "User for the token is disabled by admin"
        );

        Ok(())
    }
}
