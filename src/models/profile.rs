use serde::{Deserialize, Serialize};

use super::identity::{ActionKind, Remaining};

/// Stored counter value meaning "no limit".
pub const UNLIMITED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Pro,
}

impl Tier {
    /// (debates, chats) granted when a profile enters this tier.
    pub fn limits(self) -> (i64, i64) {
        match self {
            Tier::Free => (3, 10),
            Tier::Basic => (25, 100),
            Tier::Pro => (UNLIMITED, UNLIMITED),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Basic => "basic",
            Tier::Pro => "pro",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Tier::Free),
            "basic" => Some(Tier::Basic),
            "pro" => Some(Tier::Pro),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthProfile {
    pub email: String,
    pub tier: Tier,
    pub debates_remaining: i64,
    pub chats_remaining: i64,
}

impl OAuthProfile {
    pub fn for_tier(email: &str, tier: Tier) -> Self {
        let (debates, chats) = tier.limits();
        Self { email: email.to_string(), tier, debates_remaining: debates, chats_remaining: chats }
    }

    pub fn counter(&self, action: ActionKind) -> i64 {
        match action {
            ActionKind::Debate => self.debates_remaining,
            ActionKind::Chat => self.chats_remaining,
        }
    }

    pub fn counter_mut(&mut self, action: ActionKind) -> &mut i64 {
        match action {
            ActionKind::Debate => &mut self.debates_remaining,
            ActionKind::Chat => &mut self.chats_remaining,
        }
    }

    pub fn remaining(&self, action: ActionKind) -> Remaining {
        Remaining::from_counter(self.counter(action))
    }
}

#[cfg(feature = "sqlite")]
#[derive(Debug, Clone, diesel::Queryable, diesel::Selectable, diesel::Insertable, diesel::AsChangeset)]
#[diesel(table_name = crate::schema::oauth_profiles)]
#[diesel(primary_key(email))]
pub struct ProfileRow {
    pub email: String,
    pub tier: String,
    pub debates_remaining: i64,
    pub chats_remaining: i64,
}

#[cfg(feature = "sqlite")]
impl TryFrom<ProfileRow> for OAuthProfile {
    type Error = anyhow::Error;

    fn try_from(r: ProfileRow) -> anyhow::Result<Self> {
        let tier = Tier::parse(&r.tier)
            .ok_or_else(|| anyhow::anyhow!("profile {} has unknown tier `{}`", r.email, r.tier))?;
        Ok(Self {
            email: r.email,
            tier,
            debates_remaining: r.debates_remaining,
            chats_remaining: r.chats_remaining,
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<&OAuthProfile> for ProfileRow {
    fn from(p: &OAuthProfile) -> Self {
        Self {
            email: p.email.clone(),
            tier: p.tier.as_str().to_string(),
            debates_remaining: p.debates_remaining,
            chats_remaining: p.chats_remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pro_is_unlimited() {
        let p = OAuthProfile::for_tier("a@example.com", Tier::Pro);
        assert_eq!(p.remaining(ActionKind::Debate), Remaining::Unlimited);
        assert_eq!(p.remaining(ActionKind::Chat), Remaining::Unlimited);
    }

    #[test]
    fn free_tier_counts() {
        let p = OAuthProfile::for_tier("a@example.com", Tier::Free);
        assert_eq!(p.remaining(ActionKind::Debate), Remaining::Count(3));
        assert_eq!(p.counter(ActionKind::Chat), 10);
        assert_eq!(Tier::parse(Tier::Basic.as_str()), Some(Tier::Basic));
    }
}
