use serde::{Deserialize, Serialize};
use tower_cookies::{cookie::CookieJar, Cookie, Cookies, Key};
use time::{Duration, OffsetDateTime};

use crate::models::{Tier, UNLIMITED};

pub const SESSION_COOKIE: &str = "gate_sid";
pub const OAUTH_COOKIE: &str = "gate_oauth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Admin,
    Token,
}

/// Server-set record of which login mode is active for this browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCarrier {
    pub mode: SessionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub exp: Option<i64>, // unix seconds
}

/// Verified assertion written by the external OAuth session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthAssertion {
    pub email: String,
    pub tier: Tier,
    pub debates_remaining: i64,
    pub chats_remaining: i64,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl OAuthAssertion {
    /// An email and counters that are either the unlimited sentinel or a
    /// non-negative count.
    pub fn is_well_formed(&self) -> bool {
        !self.email.trim().is_empty()
            && self.debates_remaining >= UNLIMITED
            && self.chats_remaining >= UNLIMITED
    }
}

fn expired(exp: Option<i64>) -> bool {
    matches!(exp, Some(exp) if OffsetDateTime::now_utc().unix_timestamp() > exp)
}

pub fn get_carrier(cookies: &Cookies, key: &Key) -> Option<SessionCarrier> {
    let c = cookies.private(key).get(SESSION_COOKIE)?;
    let carrier: SessionCarrier = serde_json::from_str(c.value()).ok()?;
    if expired(carrier.exp) {
        return None;
    }
    Some(carrier)
}

pub fn set_carrier(
    cookies: &Cookies,
    key: &Key,
    mode: SessionMode,
    token: Option<&str>,
    ttl_minutes: i64,
) {
    let exp = OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes);
    let carrier = SessionCarrier {
        mode,
        // admin sessions never carry a token id
        token: match mode {
            SessionMode::Admin => None,
            SessionMode::Token => token.map(str::to_string),
        },
        exp: Some(exp.unix_timestamp()),
    };
    match serde_json::to_string(&carrier) {
        Ok(payload) => {
            let mut cookie = Cookie::new(SESSION_COOKIE, payload);
            harden(&mut cookie);
            cookie.set_max_age(Duration::minutes(ttl_minutes));
            cookies.private(key).add(cookie);
        }
        Err(e) => tracing::error!(error = ?e, "failed to encode session carrier"),
    }
}

pub fn clear_carrier(cookies: &Cookies, key: &Key) {
    let mut base = Cookie::new(SESSION_COOKIE, "");
    base.set_path("/");
    cookies.private(key).remove(base);
}

/// The provider's assertion, if present, unexpired and well formed.
pub fn get_oauth_session(cookies: &Cookies, key: &Key) -> Option<OAuthAssertion> {
    let c = cookies.private(key).get(OAUTH_COOKIE)?;
    let assertion: OAuthAssertion = serde_json::from_str(c.value()).ok()?;
    if !assertion.is_well_formed() {
        tracing::warn!("ignoring malformed oauth session cookie");
        return None;
    }
    if expired(assertion.exp) {
        return None;
    }
    Some(assertion)
}

/// Build the encrypted cookie an OAuth session provider sharing `key` sets
/// after a completed sign-in.
pub fn seal_oauth_session(key: &Key, assertion: &OAuthAssertion) -> anyhow::Result<Cookie<'static>> {
    let payload = serde_json::to_string(assertion)?;
    let mut cookie = Cookie::new(OAUTH_COOKIE, payload);
    harden(&mut cookie);
    let mut jar = CookieJar::new();
    jar.private_mut(key).add(cookie);
    jar.get(OAUTH_COOKIE)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("sealed oauth cookie missing from jar"))
}

fn harden(cookie: &mut Cookie<'static>) {
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_secure(is_https());
}

pub(crate) fn is_https() -> bool {
    // Use environment hint; default to false for local dev
    matches!(std::env::var("APP_FORCE_SECURE").as_deref(), Ok("1") | Ok("true") | Ok("yes"))
}
