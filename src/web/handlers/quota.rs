use axum::{extract::{Path, State}, Json};
use serde::Serialize;

use crate::{app::AppState, error::AccessError, web::session::CurrentIdentity};
use crate::models::{ActionKind, Remaining};

#[derive(Serialize)]
pub struct ConsumeResponse {
    pub action: ActionKind,
    pub remaining: Remaining,
}

/// POST /api/quota/{action}
///
/// Spend one unit of `action` for the current identity. Callers run the
/// billable work only after this returns 200.
pub async fn consume(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(action): Path<String>,
) -> Result<Json<ConsumeResponse>, AccessError> {
    let action = ActionKind::parse(&action)
        .ok_or_else(|| AccessError::InvalidRequest(format!("unknown action `{}`", action)))?;
    let remaining = state.ledger.authorize_and_consume(&identity, action).await?;
    Ok(Json(ConsumeResponse { action, remaining }))
}
