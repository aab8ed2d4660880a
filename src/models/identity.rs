use serde::{Deserialize, Serialize, Serializer};

use super::profile::{Tier, UNLIMITED};

/// The single identity computed for a request from every credential source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedIdentity {
    Admin,
    OAuthUser {
        email: String,
        tier: Tier,
        debates_remaining: i64,
        chats_remaining: i64,
    },
    /// Validity of the token is checked by the ledger, not at resolution.
    TokenUser { token_id: String },
    Anonymous,
}

impl ResolvedIdentity {
    pub fn mode(&self) -> AuthMode {
        match self {
            ResolvedIdentity::Admin => AuthMode::Admin,
            ResolvedIdentity::OAuthUser { .. } => AuthMode::Oauth,
            ResolvedIdentity::TokenUser { .. } => AuthMode::Token,
            ResolvedIdentity::Anonymous => AuthMode::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Admin,
    Token,
    Oauth,
    None,
}

/// Billable action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Debate,
    Chat,
}

impl ActionKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "debate" => Some(ActionKind::Debate),
            "chat" => Some(ActionKind::Chat),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Debate => "debate",
            ActionKind::Chat => "chat",
        }
    }
}

/// Allowance left after (or before) an action. Serialized as a bare number
/// or the string `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Count(i64),
    Unlimited,
}

impl Remaining {
    pub fn from_counter(value: i64) -> Self {
        if value == UNLIMITED { Remaining::Unlimited } else { Remaining::Count(value) }
    }
}

impl Serialize for Remaining {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Remaining::Count(n) => serializer.serialize_i64(*n),
            Remaining::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginGrant {
    pub mode: AuthMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<i64>,
}

/// Read-only view of the current identity returned by verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentitySnapshot {
    pub mode: AuthMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debates_remaining: Option<Remaining>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chats_remaining: Option<Remaining>,
}

impl IdentitySnapshot {
    pub fn bare(mode: AuthMode) -> Self {
        Self {
            mode,
            email: None,
            tier: None,
            remaining: None,
            allowed: None,
            debates_remaining: None,
            chats_remaining: None,
        }
    }
}
