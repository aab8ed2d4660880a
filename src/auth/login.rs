use crate::auth::admin::AdminSecret;
use crate::auth::session::SessionMode;
use crate::error::AccessError;
use crate::models::{AuthMode, IdentitySnapshot, LoginGrant, OAuthProfile, ResolvedIdentity};
use crate::repos::{CredentialStore, ProfileStore};

/// A successful login: what to report and what session state to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub grant: LoginGrant,
    pub mode: SessionMode,
    pub token: Option<String>,
}

/// Check a raw credential. The admin code is compared first; anything else
/// is treated as an access code and must exist, be active and have queries
/// left. Nothing is written on failure.
pub async fn login(
    admin: &AdminSecret,
    tokens: &dyn CredentialStore,
    credential: &str,
) -> Result<Login, AccessError> {
    if admin.matches(credential) {
        tracing::info!("admin login");
        return Ok(Login {
            grant: LoginGrant { mode: AuthMode::Admin, remaining: None, allowed: None },
            mode: SessionMode::Admin,
            token: None,
        });
    }

    if credential.is_empty() {
        return Err(AccessError::InvalidCredential);
    }
    let token = tokens
        .get_token(credential)
        .await
        .map_err(AccessError::store)?
        .ok_or(AccessError::InvalidCredential)?;
    if !token.is_active {
        tracing::info!(token_id = %token.id, "login with disabled access code");
        return Err(AccessError::Disabled);
    }
    if !token.has_remaining() {
        tracing::info!(token_id = %token.id, "login with exhausted access code");
        return Err(AccessError::QuotaExhausted);
    }

    tracing::info!(token_id = %token.id, remaining = token.queries_remaining, "token login");
    Ok(Login {
        grant: LoginGrant {
            mode: AuthMode::Token,
            remaining: Some(token.queries_remaining),
            allowed: Some(token.queries_allowed),
        },
        mode: SessionMode::Token,
        token: Some(token.id),
    })
}

/// Read-only status of the resolved identity. Token sessions are
/// re-validated with the same failures as `login`; session state is left
/// untouched either way.
pub async fn verify(
    identity: &ResolvedIdentity,
    tokens: &dyn CredentialStore,
    profiles: &dyn ProfileStore,
) -> Result<IdentitySnapshot, AccessError> {
    match identity {
        ResolvedIdentity::Admin => Ok(IdentitySnapshot::bare(AuthMode::Admin)),
        ResolvedIdentity::Anonymous => Ok(IdentitySnapshot::bare(AuthMode::None)),
        ResolvedIdentity::OAuthUser { email, tier, debates_remaining, chats_remaining } => {
            let stored = profiles.get_profile(email).await.map_err(AccessError::store)?;
            let profile = stored.unwrap_or_else(|| OAuthProfile {
                email: email.clone(),
                tier: *tier,
                debates_remaining: *debates_remaining,
                chats_remaining: *chats_remaining,
            });
            Ok(IdentitySnapshot {
                email: Some(profile.email.clone()),
                tier: Some(profile.tier),
                debates_remaining: Some(profile.remaining(crate::models::ActionKind::Debate)),
                chats_remaining: Some(profile.remaining(crate::models::ActionKind::Chat)),
                ..IdentitySnapshot::bare(AuthMode::Oauth)
            })
        }
        ResolvedIdentity::TokenUser { token_id } => {
            let token = tokens
                .get_token(token_id)
                .await
                .map_err(AccessError::store)?
                .ok_or(AccessError::InvalidCredential)?;
            if !token.is_active {
                return Err(AccessError::Disabled);
            }
            if !token.has_remaining() {
                return Err(AccessError::QuotaExhausted);
            }
            Ok(IdentitySnapshot {
                remaining: Some(token.queries_remaining),
                allowed: Some(token.queries_allowed),
                ..IdentitySnapshot::bare(AuthMode::Token)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccessToken, Tier};
    use crate::repos::memory::{MemoryCredentialStore, MemoryProfileStore};

    #[tokio::test]
    async fn admin_code_wins_over_a_token_with_the_same_text() {
        let store = MemoryCredentialStore::new();
        store.insert_token(&AccessToken::issue("letmein".into(), 3)).await.unwrap();
        let admin = AdminSecret::from_code("letmein");
        let l = login(&admin, store.as_ref(), "letmein").await.unwrap();
        assert_eq!(l.mode, SessionMode::Admin);
        assert_eq!(l.token, None);
    }

    #[tokio::test]
    async fn disabled_admin_never_matches() {
        let store = MemoryCredentialStore::new();
        let err = login(&AdminSecret::disabled(), store.as_ref(), "").await.unwrap_err();
        assert_eq!(err, AccessError::InvalidCredential);
    }

    #[tokio::test]
    async fn login_failure_taxonomy() {
        let store = MemoryCredentialStore::new();
        let admin = AdminSecret::from_code("root");
        let mut off = AccessToken::issue("test-off".into(), 3);
        off.is_active = false;
        store.insert_token(&off).await.unwrap();
        store.insert_token(&AccessToken::issue("test-zero".into(), 0)).await.unwrap();

        assert_eq!(login(&admin, store.as_ref(), "test-none").await, Err(AccessError::InvalidCredential));
        assert_eq!(login(&admin, store.as_ref(), "test-off").await, Err(AccessError::Disabled));
        assert_eq!(login(&admin, store.as_ref(), "test-zero").await, Err(AccessError::QuotaExhausted));
    }

    #[tokio::test]
    async fn verify_reports_stored_profile_over_assertion() {
        let tokens = MemoryCredentialStore::new();
        let profiles = MemoryProfileStore::new();
        let mut p = OAuthProfile::for_tier("u@example.com", Tier::Basic);
        p.debates_remaining = 2;
        profiles.ensure_profile(&p).await.unwrap();
        let id = ResolvedIdentity::OAuthUser {
            email: "u@example.com".into(),
            tier: Tier::Basic,
            debates_remaining: 25,
            chats_remaining: 100,
        };
        let snap = verify(&id, tokens.as_ref(), profiles.as_ref()).await.unwrap();
        assert_eq!(snap.mode, AuthMode::Oauth);
        assert_eq!(snap.debates_remaining, Some(crate::models::Remaining::Count(2)));
    }
}
