use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use tower_cookies::Cookies;

use crate::app::AppState;
use crate::auth::{resolve, session};
use crate::models::ResolvedIdentity;

/// The identity behind the current request.
///
/// Reads the OAuth session cookie and the session carrier and runs the
/// resolver. Never rejects for missing credentials; callers get
/// `ResolvedIdentity::Anonymous` instead.
///
/// ```ignore
/// async fn handler(CurrentIdentity(identity): CurrentIdentity) -> impl IntoResponse {
///     format!("{:?}", identity.mode())
/// }
/// ```
pub struct CurrentIdentity(pub ResolvedIdentity);

impl FromRequestParts<AppState> for CurrentIdentity {
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let cookies = Cookies::from_request_parts(parts, state)
                .await
                .map_err(|e| {
                    tracing::error!(error = ?e, "Failed to extract cookies");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"error": "cookie layer missing"})),
                    )
                        .into_response()
                })?;

            let oauth = session::get_oauth_session(&cookies, &state.cookie_key);
            let carrier = session::get_carrier(&cookies, &state.cookie_key);
            Ok(CurrentIdentity(resolve(oauth.as_ref(), carrier.as_ref())))
        }
    }
}

/// Admin code presented as `Authorization: Bearer <code>`, if any.
pub struct AdminCredential(pub Option<String>);

impl AdminCredential {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AdminCredential {
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let code = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        async move { Ok(AdminCredential(code)) }
    }
}
