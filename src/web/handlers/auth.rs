use axum::{extract::{rejection::JsonRejection, State}, http::StatusCode, Json};
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::{app::AppState, auth::{login as access, session}, error::AccessError, web::session::CurrentIdentity};
use crate::models::{IdentitySnapshot, LoginGrant};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub code: String,
}

// Exchange an admin code or access code for a session.
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginGrant>, AccessError> {
    let Json(req) = payload?;
    let outcome = access::login(&state.admin, state.tokens.as_ref(), &req.code).await?;
    session::set_carrier(
        &cookies,
        &state.cookie_key,
        outcome.mode,
        outcome.token.as_deref(),
        state.config.server.session_ttl_minutes,
    );
    Ok(Json(outcome.grant))
}

pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> StatusCode {
    session::clear_carrier(&cookies, &state.cookie_key);
    StatusCode::NO_CONTENT
}

// Report the current identity without changing anything.
pub async fn verify(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<IdentitySnapshot>, AccessError> {
    let snapshot = access::verify(&identity, state.tokens.as_ref(), state.profiles.as_ref()).await?;
    Ok(Json(snapshot))
}
