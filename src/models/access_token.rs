use std::collections::HashMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// An issued access code and its query allowance.
///
/// This is the only shape the rest of the crate works with; store adapters
/// translate to and from their own encodings at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: String,
    pub queries_allowed: i64,
    pub queries_remaining: i64,
    pub is_active: bool,
    pub created_at: String,
}

impl AccessToken {
    pub fn issue(id: String, queries: i64) -> Self {
        Self {
            id,
            queries_allowed: queries,
            queries_remaining: queries,
            is_active: true,
            created_at: crate::security::now_ts(),
        }
    }

    pub fn has_remaining(&self) -> bool {
        self.queries_remaining > 0
    }

    /// Flatten into the field list used by hash-style key/value stores.
    pub fn to_fields(&self) -> HashMap<String, String> {
        HashMap::from([
            ("id".to_string(), self.id.clone()),
            ("queries_allowed".to_string(), self.queries_allowed.to_string()),
            ("queries_remaining".to_string(), self.queries_remaining.to_string()),
            ("is_active".to_string(), if self.is_active { "1" } else { "0" }.to_string()),
            ("created_at".to_string(), self.created_at.clone()),
        ])
    }

    /// Rebuild a token from a flat field list, rejecting records that are
    /// incomplete or break `0 <= remaining <= allowed`.
    pub fn from_fields(fields: &HashMap<String, String>) -> anyhow::Result<Self> {
        let get = |name: &str| {
            fields
                .get(name)
                .with_context(|| format!("access token record missing field `{}`", name))
        };
        let queries_allowed: i64 = get("queries_allowed")?
            .parse()
            .context("queries_allowed is not an integer")?;
        let queries_remaining: i64 = get("queries_remaining")?
            .parse()
            .context("queries_remaining is not an integer")?;
        let is_active = match get("is_active")?.as_str() {
            "1" | "true" => true,
            "0" | "false" => false,
            other => anyhow::bail!("is_active has unexpected value `{}`", other),
        };
        if queries_remaining < 0 || queries_remaining > queries_allowed {
            anyhow::bail!(
                "access token record out of range: remaining={} allowed={}",
                queries_remaining,
                queries_allowed
            );
        }
        Ok(Self {
            id: get("id")?.clone(),
            queries_allowed,
            queries_remaining,
            is_active,
            created_at: get("created_at")?.clone(),
        })
    }
}

#[cfg(feature = "sqlite")]
#[derive(Debug, Clone, diesel::Queryable, diesel::Selectable, diesel::Insertable)]
#[diesel(table_name = crate::schema::access_tokens)]
pub struct AccessTokenRow {
    pub id: String,
    pub queries_allowed: i64,
    pub queries_remaining: i64,
    pub is_active: bool,
    pub created_at: String,
}

#[cfg(feature = "sqlite")]
impl From<AccessTokenRow> for AccessToken {
    fn from(r: AccessTokenRow) -> Self {
        Self {
            id: r.id,
            queries_allowed: r.queries_allowed,
            queries_remaining: r.queries_remaining,
            is_active: r.is_active,
            created_at: r.created_at,
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<&AccessToken> for AccessTokenRow {
    fn from(t: &AccessToken) -> Self {
        Self {
            id: t.id.clone(),
            queries_allowed: t.queries_allowed,
            queries_remaining: t.queries_remaining,
            is_active: t.is_active,
            created_at: t.created_at.clone(),
        }
    }
}
