use async_trait::async_trait;

use crate::models::{AccessToken, ActionKind, OAuthProfile, Tier};

/// Answer of an atomic decrement-if-allowed against a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed { remaining: i64 },
    Unlimited,
    Missing,
    Disabled,
    Exhausted,
}

/// Key/value store holding access-code records, plus the single-field
/// writes (feature flags) that share it.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_token(&self, id: &str) -> anyhow::Result<Option<AccessToken>>;
    /// Fails if a record with the same id already exists.
    async fn insert_token(&self, token: &AccessToken) -> anyhow::Result<()>;
    /// Decrement `queries_remaining` by one in a single step, only if the
    /// token exists, is active and has queries left.
    async fn consume_token(&self, id: &str) -> anyhow::Result<ConsumeOutcome>;
    /// Returns false when no such token exists.
    async fn disable_token(&self, id: &str) -> anyhow::Result<bool>;
    async fn list_tokens(&self) -> anyhow::Result<Vec<AccessToken>>;

    async fn set_flag(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn get_flag(&self, key: &str) -> anyhow::Result<Option<String>>;
}

/// Per-email profile rows for OAuth users.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, email: &str) -> anyhow::Result<Option<OAuthProfile>>;
    /// Insert `profile` unless a row already exists; returns the stored row.
    async fn ensure_profile(&self, profile: &OAuthProfile) -> anyhow::Result<OAuthProfile>;
    /// Decrement the counter for `action` in a single step. The unlimited
    /// sentinel is never touched.
    async fn consume_profile(&self, email: &str, action: ActionKind) -> anyhow::Result<ConsumeOutcome>;
    /// Move a profile to `tier` and reset its counters to the tier's limits.
    async fn set_tier(&self, email: &str, tier: Tier) -> anyhow::Result<Option<OAuthProfile>>;
}

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
