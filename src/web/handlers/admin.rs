use axum::{extract::{rejection::JsonRejection, Path, State}, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{app::AppState, error::AccessError, issuance, web::session::AdminCredential};
use crate::models::{AccessToken, OAuthProfile, Tier};

// Unauthenticated callers hear 401 before anything about their body.
fn admin_body<T>(
    state: &AppState,
    admin: &AdminCredential,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, AccessError> {
    state.admin.authorize(admin.as_deref())?;
    let Json(req) = payload?;
    Ok(req)
}

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub count: u32,
    pub queries_per_token: i64,
}

#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub ids: Vec<String>,
}

/// Mint a batch of access codes.
///
/// A batch that fails part way answers with the error status and still lists
/// the ids that were persisted before the failure.
pub async fn issue_tokens(
    State(state): State<AppState>,
    admin: AdminCredential,
    payload: Result<Json<IssueRequest>, JsonRejection>,
) -> Response {
    let req = match admin_body(&state, &admin, payload) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };
    let report = match issuance::issue_tokens(
        &state.admin,
        state.tokens.as_ref(),
        admin.as_deref(),
        req.count,
        req.queries_per_token,
    )
    .await
    {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };
    match report.error {
        None => (StatusCode::CREATED, Json(IssueResponse { ids: report.ids })).into_response(),
        Some(e) => {
            let mut body = e.body();
            body["ids"] = json!(report.ids);
            (e.status(), Json(body)).into_response()
        }
    }
}

pub async fn list_tokens(
    State(state): State<AppState>,
    admin: AdminCredential,
) -> Result<Json<serde_json::Value>, AccessError> {
    let items: Vec<AccessToken> = issuance::list_tokens(&state.admin, state.tokens.as_ref(), admin.as_deref()).await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn disable_token(
    State(state): State<AppState>,
    admin: AdminCredential,
    Path(token_id): Path<String>,
) -> Result<StatusCode, AccessError> {
    issuance::disable_token(&state.admin, state.tokens.as_ref(), admin.as_deref(), &token_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct FlagRequest {
    pub value: String,
}

pub async fn put_flag(
    State(state): State<AppState>,
    admin: AdminCredential,
    Path(key): Path<String>,
    payload: Result<Json<FlagRequest>, JsonRejection>,
) -> Result<StatusCode, AccessError> {
    let req = admin_body(&state, &admin, payload)?;
    issuance::set_flag(&state.admin, state.tokens.as_ref(), admin.as_deref(), &key, &req.value).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_flag(
    State(state): State<AppState>,
    admin: AdminCredential,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AccessError> {
    let value = issuance::get_flag(&state.admin, state.tokens.as_ref(), admin.as_deref(), &key).await?;
    Ok(Json(json!({ "key": key, "value": value })))
}

#[derive(Debug, Deserialize)]
pub struct TierRequest {
    pub tier: Tier,
}

// Tier change trigger (payment webhook relay).
pub async fn set_tier(
    State(state): State<AppState>,
    admin: AdminCredential,
    Path(email): Path<String>,
    payload: Result<Json<TierRequest>, JsonRejection>,
) -> Result<Json<OAuthProfile>, AccessError> {
    let req = admin_body(&state, &admin, payload)?;
    let profile = state.ledger.set_tier(&email, req.tier).await?;
    Ok(Json(profile))
}
