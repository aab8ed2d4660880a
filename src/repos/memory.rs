//! In-process stores. Token records are kept as flat field maps, the same
//! shape a hash-per-key store holds them in; every operation runs inside one
//! lock acquisition so read-check-write cannot interleave.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{AccessToken, ActionKind, OAuthProfile, Tier, UNLIMITED};
use crate::repos::{ConsumeOutcome, CredentialStore, ProfileStore};

type Fields = HashMap<String, String>;

#[derive(Default)]
pub struct MemoryCredentialStore {
    records: RwLock<HashMap<String, Fields>>,
    flags: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_token(&self, id: &str) -> anyhow::Result<Option<AccessToken>> {
        let records = self.records.read().await;
        records.get(id).map(AccessToken::from_fields).transpose()
    }

    async fn insert_token(&self, token: &AccessToken) -> anyhow::Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&token.id) {
            anyhow::bail!("access token {} already exists", token.id);
        }
        records.insert(token.id.clone(), token.to_fields());
        Ok(())
    }

    async fn consume_token(&self, id: &str) -> anyhow::Result<ConsumeOutcome> {
        let mut records = self.records.write().await;
        let Some(fields) = records.get_mut(id) else {
            return Ok(ConsumeOutcome::Missing);
        };
        let mut token = AccessToken::from_fields(fields)?;
        if !token.is_active {
            return Ok(ConsumeOutcome::Disabled);
        }
        if !token.has_remaining() {
            return Ok(ConsumeOutcome::Exhausted);
        }
        token.queries_remaining -= 1;
        *fields = token.to_fields();
        Ok(ConsumeOutcome::Consumed { remaining: token.queries_remaining })
    }

    async fn disable_token(&self, id: &str) -> anyhow::Result<bool> {
        let mut records = self.records.write().await;
        let Some(fields) = records.get_mut(id) else {
            return Ok(false);
        };
        let mut token = AccessToken::from_fields(fields)?;
        token.is_active = false;
        *fields = token.to_fields();
        Ok(true)
    }

    async fn list_tokens(&self) -> anyhow::Result<Vec<AccessToken>> {
        let records = self.records.read().await;
        let mut out = records
            .values()
            .map(AccessToken::from_fields)
            .collect::<anyhow::Result<Vec<_>>>()?;
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn set_flag(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.flags.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_flag(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.flags.read().await.get(key).cloned())
    }
}

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, OAuthProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, email: &str) -> anyhow::Result<Option<OAuthProfile>> {
        Ok(self.profiles.read().await.get(email).cloned())
    }

    async fn ensure_profile(&self, profile: &OAuthProfile) -> anyhow::Result<OAuthProfile> {
        if profile.debates_remaining < UNLIMITED || profile.chats_remaining < UNLIMITED {
            anyhow::bail!("profile {} has negative counters", profile.email);
        }
        let mut profiles = self.profiles.write().await;
        let stored = profiles
            .entry(profile.email.clone())
            .or_insert_with(|| profile.clone());
        Ok(stored.clone())
    }

    async fn consume_profile(&self, email: &str, action: ActionKind) -> anyhow::Result<ConsumeOutcome> {
        let mut profiles = self.profiles.write().await;
        let Some(profile) = profiles.get_mut(email) else {
            return Ok(ConsumeOutcome::Missing);
        };
        let counter = profile.counter_mut(action);
        if *counter == UNLIMITED {
            return Ok(ConsumeOutcome::Unlimited);
        }
        if *counter <= 0 {
            return Ok(ConsumeOutcome::Exhausted);
        }
        *counter -= 1;
        Ok(ConsumeOutcome::Consumed { remaining: *counter })
    }

    async fn set_tier(&self, email: &str, tier: Tier) -> anyhow::Result<Option<OAuthProfile>> {
        let mut profiles = self.profiles.write().await;
        let Some(profile) = profiles.get_mut(email) else {
            return Ok(None);
        };
        *profile = OAuthProfile::for_tier(email, tier);
        Ok(Some(profile.clone()))
    }
}
