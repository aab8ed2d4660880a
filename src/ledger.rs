//! Quota ledger: decides whether a resolved identity may perform a billable
//! action and spends one unit when it may.
//!
//! Every spend is a single conditional store operation
//! (`consume_token` / `consume_profile`), so concurrent requests for the same
//! identity cannot both observe the same pre-decrement value. A store that
//! reports the precondition failed yields `QuotaExhausted`; counts never go
//! negative.

use std::sync::Arc;

use crate::error::AccessError;
use crate::models::{ActionKind, OAuthProfile, Remaining, ResolvedIdentity, Tier, UNLIMITED};
use crate::repos::{ConsumeOutcome, CredentialStore, ProfileStore};

#[derive(Clone)]
pub struct QuotaLedger {
    tokens: Arc<dyn CredentialStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl QuotaLedger {
    pub fn new(tokens: Arc<dyn CredentialStore>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { tokens, profiles }
    }

    /// Allow-and-spend, or deny with the specific reason. Exactly one
    /// persisted decrement per success; none on any denial.
    pub async fn authorize_and_consume(
        &self,
        identity: &ResolvedIdentity,
        action: ActionKind,
    ) -> Result<Remaining, AccessError> {
        let outcome = match identity {
            ResolvedIdentity::Admin => return Ok(Remaining::Unlimited),
            ResolvedIdentity::Anonymous => return Err(AccessError::Unauthenticated),
            ResolvedIdentity::TokenUser { token_id } => {
                self.tokens.consume_token(token_id).await.map_err(AccessError::store)?
            }
            ResolvedIdentity::OAuthUser { email, tier, debates_remaining, chats_remaining } => {
                let seed = OAuthProfile {
                    email: email.clone(),
                    tier: *tier,
                    debates_remaining: *debates_remaining,
                    chats_remaining: *chats_remaining,
                };
                self.consume_for_profile(&seed, action).await?
            }
        };

        let result = match outcome {
            ConsumeOutcome::Consumed { remaining } => Ok(Remaining::Count(remaining)),
            ConsumeOutcome::Unlimited => Ok(Remaining::Unlimited),
            ConsumeOutcome::Missing => Err(AccessError::InvalidCredential),
            ConsumeOutcome::Disabled => Err(AccessError::Disabled),
            ConsumeOutcome::Exhausted => Err(AccessError::QuotaExhausted),
        };
        match &result {
            Ok(remaining) => {
                tracing::debug!(mode = ?identity.mode(), action = action.as_str(), ?remaining, "action allowed")
            }
            Err(reason) => {
                tracing::info!(mode = ?identity.mode(), action = action.as_str(), reason = reason.code(), "action denied")
            }
        }
        result
    }

    async fn consume_for_profile(
        &self,
        seed: &OAuthProfile,
        action: ActionKind,
    ) -> Result<ConsumeOutcome, AccessError> {
        let outcome = self
            .profiles
            .consume_profile(&seed.email, action)
            .await
            .map_err(AccessError::store)?;
        if outcome != ConsumeOutcome::Missing {
            return Ok(outcome);
        }
        // First action after sign-in: the provider's assertion is authoritative,
        // but only if its counters are the sentinel or a real count.
        if seed.debates_remaining < UNLIMITED || seed.chats_remaining < UNLIMITED {
            tracing::warn!(email = %seed.email, "refusing to seed profile with negative counters");
            return Err(AccessError::InvalidCredential);
        }
        self.profiles.ensure_profile(seed).await.map_err(AccessError::store)?;
        tracing::info!(email = %seed.email, tier = seed.tier.as_str(), "seeded profile from oauth session");
        self.profiles
            .consume_profile(&seed.email, action)
            .await
            .map_err(AccessError::store)
    }

    /// External tier change (e.g. after payment): reset counters to the
    /// tier's limits.
    pub async fn set_tier(&self, email: &str, tier: Tier) -> Result<OAuthProfile, AccessError> {
        let profile = self
            .profiles
            .set_tier(email, tier)
            .await
            .map_err(AccessError::store)?
            .ok_or(AccessError::NotFound)?;
        tracing::info!(%email, tier = tier.as_str(), "profile tier changed");
        Ok(profile)
    }
}
