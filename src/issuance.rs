//! Admin-only access-code operations. Each call presents the admin code
//! itself rather than relying on session state.

use crate::auth::AdminSecret;
use crate::error::AccessError;
use crate::models::AccessToken;
use crate::repos::CredentialStore;
use crate::security::generate_access_code;

pub const MAX_BATCH: u32 = 500;
const MAX_ID_ATTEMPTS: usize = 3;

/// Ids created by a batch. When `error` is set the batch stopped early;
/// everything in `ids` is persisted regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueReport {
    pub ids: Vec<String>,
    pub error: Option<AccessError>,
}

pub async fn issue_tokens(
    admin: &AdminSecret,
    tokens: &dyn CredentialStore,
    credential: Option<&str>,
    count: u32,
    queries_per_token: i64,
) -> Result<IssueReport, AccessError> {
    admin.authorize(credential)?;
    if count == 0 || count > MAX_BATCH {
        return Err(AccessError::InvalidRequest(format!("count must be between 1 and {}", MAX_BATCH)));
    }
    if queries_per_token < 0 {
        return Err(AccessError::InvalidRequest("queries_per_token must not be negative".into()));
    }

    let mut ids = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match issue_one(tokens, queries_per_token).await {
            Ok(id) => ids.push(id),
            Err(e) => {
                tracing::error!(issued = ids.len(), requested = count, "token batch stopped early");
                return Ok(IssueReport { ids, error: Some(AccessError::store(e)) });
            }
        }
    }
    tracing::info!(count, queries_per_token, "issued access codes");
    Ok(IssueReport { ids, error: None })
}

async fn issue_one(tokens: &dyn CredentialStore, queries: i64) -> anyhow::Result<String> {
    let mut last_err = None;
    for _ in 0..MAX_ID_ATTEMPTS {
        let token = AccessToken::issue(generate_access_code(), queries);
        // An existing record means an id collision; try a fresh id.
        if tokens.get_token(&token.id).await?.is_some() {
            continue;
        }
        match tokens.insert_token(&token).await {
            Ok(()) => return Ok(token.id),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("could not generate a unique access code")))
}

/// Soft-disable a token. Disabling twice is not an error.
pub async fn disable_token(
    admin: &AdminSecret,
    tokens: &dyn CredentialStore,
    credential: Option<&str>,
    token_id: &str,
) -> Result<(), AccessError> {
    admin.authorize(credential)?;
    if !tokens.disable_token(token_id).await.map_err(AccessError::store)? {
        return Err(AccessError::NotFound);
    }
    tracing::info!(%token_id, "access code disabled");
    Ok(())
}

pub async fn list_tokens(
    admin: &AdminSecret,
    tokens: &dyn CredentialStore,
    credential: Option<&str>,
) -> Result<Vec<AccessToken>, AccessError> {
    admin.authorize(credential)?;
    tokens.list_tokens().await.map_err(AccessError::store)
}

pub async fn set_flag(
    admin: &AdminSecret,
    tokens: &dyn CredentialStore,
    credential: Option<&str>,
    key: &str,
    value: &str,
) -> Result<(), AccessError> {
    admin.authorize(credential)?;
    if key.trim().is_empty() {
        return Err(AccessError::InvalidRequest("flag key must not be empty".into()));
    }
    tokens.set_flag(key, value).await.map_err(AccessError::store)?;
    tracing::info!(%key, %value, "feature flag set");
    Ok(())
}

pub async fn get_flag(
    admin: &AdminSecret,
    tokens: &dyn CredentialStore,
    credential: Option<&str>,
    key: &str,
) -> Result<String, AccessError> {
    admin.authorize(credential)?;
    tokens
        .get_flag(key)
        .await
        .map_err(AccessError::store)?
        .ok_or(AccessError::NotFound)
}
