use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::OptionalExtension;

use crate::db::sqlite::SqlitePool;
use crate::models::{
    access_token::AccessTokenRow,
    profile::ProfileRow,
    AccessToken, ActionKind, OAuthProfile, Tier, UNLIMITED,
};
use crate::repos::{ConsumeOutcome, CredentialStore, ProfileStore};
use crate::schema::{access_tokens, feature_flags, oauth_profiles};

pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn get_token(&self, id: &str) -> anyhow::Result<Option<AccessToken>> {
        let id = id.to_string();
        let pool = self.pool.clone();
        let row = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<AccessTokenRow>> {
            let mut conn = pool.get()?;
            let row = access_tokens::table
                .find(&id)
                .select(AccessTokenRow::as_select())
                .first(&mut conn)
                .optional()?;
            Ok(row)
        })
        .await??;
        Ok(row.map(AccessToken::from))
    }

    async fn insert_token(&self, token: &AccessToken) -> anyhow::Result<()> {
        let row = AccessTokenRow::from(token);
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let mut conn = pool.get()?;
            diesel::insert_into(access_tokens::table)
                .values(&row)
                .execute(&mut conn)?;
            Ok(())
        })
        .await??;
        Ok(())
    }

    async fn consume_token(&self, id: &str) -> anyhow::Result<ConsumeOutcome> {
        let id = id.to_string();
        let pool = self.pool.clone();
        let outcome = tokio::task::spawn_blocking(move || -> anyhow::Result<ConsumeOutcome> {
            let mut conn = pool.get()?;
            conn.immediate_transaction(|conn| {
                use access_tokens::dsl as t;
                let updated = diesel::update(
                    t::access_tokens
                        .filter(t::id.eq(&id))
                        .filter(t::is_active.eq(true))
                        .filter(t::queries_remaining.gt(0)),
                )
                .set(t::queries_remaining.eq(t::queries_remaining - 1))
                .execute(conn)?;

                // Same transaction: the row read back is the one just written,
                // or the reason the conditional update matched nothing.
                let row = t::access_tokens
                    .find(&id)
                    .select(AccessTokenRow::as_select())
                    .first(conn)
                    .optional()?;
                let outcome = match row {
                    None => ConsumeOutcome::Missing,
                    Some(r) if updated == 1 => ConsumeOutcome::Consumed { remaining: r.queries_remaining },
                    Some(r) if !r.is_active => ConsumeOutcome::Disabled,
                    Some(_) => ConsumeOutcome::Exhausted,
                };
                Ok::<_, diesel::result::Error>(outcome)
            })
            .map_err(anyhow::Error::from)
        })
        .await??;
        Ok(outcome)
    }

    async fn disable_token(&self, id: &str) -> anyhow::Result<bool> {
        let id = id.to_string();
        let pool = self.pool.clone();
        let n = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let mut conn = pool.get()?;
            use access_tokens::dsl as t;
            let n = diesel::update(t::access_tokens.find(&id))
                .set(t::is_active.eq(false))
                .execute(&mut conn)?;
            Ok(n)
        })
        .await??;
        Ok(n > 0)
    }

    async fn list_tokens(&self) -> anyhow::Result<Vec<AccessToken>> {
        let pool = self.pool.clone();
        let rows = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<AccessTokenRow>> {
            let mut conn = pool.get()?;
            use access_tokens::dsl as t;
            let rows = t::access_tokens
                .order((t::created_at.desc(), t::id.asc()))
                .select(AccessTokenRow::as_select())
                .load(&mut conn)?;
            Ok(rows)
        })
        .await??;
        Ok(rows.into_iter().map(AccessToken::from).collect())
    }

    async fn set_flag(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let mut conn = pool.get()?;
            use feature_flags::dsl as f;
            let now = crate::security::now_ts();
            diesel::insert_into(f::feature_flags)
                .values((f::key.eq(&key), f::value.eq(&value), f::updated_at.eq(&now)))
                .on_conflict(f::key)
                .do_update()
                .set((f::value.eq(&value), f::updated_at.eq(&now)))
                .execute(&mut conn)?;
            Ok(())
        })
        .await??;
        Ok(())
    }

    async fn get_flag(&self, key: &str) -> anyhow::Result<Option<String>> {
        let key = key.to_string();
        let pool = self.pool.clone();
        let value = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<String>> {
            let mut conn = pool.get()?;
            use feature_flags::dsl as f;
            let v = f::feature_flags
                .find(&key)
                .select(f::value)
                .first::<String>(&mut conn)
                .optional()?;
            Ok(v)
        })
        .await??;
        Ok(value)
    }
}

pub struct SqliteProfileStore {
    pool: SqlitePool,
}

impl SqliteProfileStore {
    pub fn new(pool: SqlitePool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

fn load_profile(conn: &mut SqliteConnection, email: &str) -> QueryResult<Option<ProfileRow>> {
    oauth_profiles::table
        .find(email)
        .select(ProfileRow::as_select())
        .first(conn)
        .optional()
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn get_profile(&self, email: &str) -> anyhow::Result<Option<OAuthProfile>> {
        let email = email.to_string();
        let pool = self.pool.clone();
        let row = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<ProfileRow>> {
            let mut conn = pool.get()?;
            Ok(load_profile(&mut conn, &email)?)
        })
        .await??;
        row.map(OAuthProfile::try_from).transpose()
    }

    async fn ensure_profile(&self, profile: &OAuthProfile) -> anyhow::Result<OAuthProfile> {
        let row = ProfileRow::from(profile);
        let pool = self.pool.clone();
        let stored = tokio::task::spawn_blocking(move || -> anyhow::Result<ProfileRow> {
            let mut conn = pool.get()?;
            // Only a primary-key conflict is ignored; CHECK failures surface.
            diesel::insert_into(oauth_profiles::table)
                .values(&row)
                .on_conflict(oauth_profiles::email)
                .do_nothing()
                .execute(&mut conn)?;
            let stored = load_profile(&mut conn, &row.email)?
                .ok_or_else(|| anyhow::anyhow!("profile {} vanished after insert", row.email))?;
            Ok(stored)
        })
        .await??;
        OAuthProfile::try_from(stored)
    }

    async fn consume_profile(&self, email: &str, action: ActionKind) -> anyhow::Result<ConsumeOutcome> {
        let email = email.to_string();
        let pool = self.pool.clone();
        let outcome = tokio::task::spawn_blocking(move || -> anyhow::Result<ConsumeOutcome> {
            let mut conn = pool.get()?;
            conn.immediate_transaction(|conn| {
                use oauth_profiles::dsl as p;
                // `> 0` leaves both exhausted rows and the unlimited sentinel untouched.
                let updated = match action {
                    ActionKind::Debate => diesel::update(
                        p::oauth_profiles.filter(p::email.eq(&email)).filter(p::debates_remaining.gt(0)),
                    )
                    .set(p::debates_remaining.eq(p::debates_remaining - 1))
                    .execute(conn)?,
                    ActionKind::Chat => diesel::update(
                        p::oauth_profiles.filter(p::email.eq(&email)).filter(p::chats_remaining.gt(0)),
                    )
                    .set(p::chats_remaining.eq(p::chats_remaining - 1))
                    .execute(conn)?,
                };
                let outcome = match load_profile(conn, &email)? {
                    None => ConsumeOutcome::Missing,
                    Some(r) => {
                        let value = match action {
                            ActionKind::Debate => r.debates_remaining,
                            ActionKind::Chat => r.chats_remaining,
                        };
                        if updated == 1 {
                            ConsumeOutcome::Consumed { remaining: value }
                        } else if value == UNLIMITED {
                            ConsumeOutcome::Unlimited
                        } else {
                            ConsumeOutcome::Exhausted
                        }
                    }
                };
                Ok::<_, diesel::result::Error>(outcome)
            })
            .map_err(anyhow::Error::from)
        })
        .await??;
        Ok(outcome)
    }

    async fn set_tier(&self, email: &str, tier: Tier) -> anyhow::Result<Option<OAuthProfile>> {
        let row = ProfileRow::from(&OAuthProfile::for_tier(email, tier));
        let pool = self.pool.clone();
        let stored = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<ProfileRow>> {
            let mut conn = pool.get()?;
            let n = diesel::update(oauth_profiles::table.find(&row.email))
                .set(&row)
                .execute(&mut conn)?;
            if n == 0 {
                return Ok(None);
            }
            Ok(load_profile(&mut conn, &row.email)?)
        })
        .await??;
        stored.map(OAuthProfile::try_from).transpose()
    }
}
