use serde::Deserialize;
use base64::Engine as _;
use rand::RngCore;

#[derive(Clone, Deserialize)]
pub struct ServerCfg {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Base64-encoded 32 or 64-byte key used to sign/encrypt cookies
    #[serde(default)]
    pub cookie_key_base64: String,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: i64,
}

impl std::fmt::Debug for ServerCfg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerCfg")
            .field("bind_addr", &self.bind_addr)
            .field("cookie_key_base64", &"<redacted>")
            .field("session_ttl_minutes", &self.session_ttl_minutes)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbCfg {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// e.g. gate.db; ignored by the memory backend
    #[serde(default)]
    pub url: String,
}

#[derive(Clone, Deserialize)]
pub struct AuthCfg {
    /// Privileged one-time admin code. Never has a built-in default.
    #[serde(default)]
    pub admin_code: Option<String>,
    /// Production deployments fail closed when secrets are missing.
    #[serde(default)]
    pub production: bool,
}

impl std::fmt::Debug for AuthCfg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCfg")
            .field("admin_code", &self.admin_code.as_ref().map(|_| "<redacted>"))
            .field("production", &self.production)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerCfg,
    pub db: DbCfg,
    pub auth: AuthCfg,
}

fn default_bind_addr() -> String { "127.0.0.1:8080".to_string() }
fn default_session_ttl() -> i64 { 60 * 24 * 7 }
fn default_backend() -> StoreBackend {
    if cfg!(feature = "sqlite") { StoreBackend::Sqlite } else { StoreBackend::Memory }
}

/// Upper bound for `SESSION_TTL_MINUTES` (one year).
pub const MAX_SESSION_TTL_MINUTES: i64 = 60 * 24 * 365;

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        // No separator: APP_BIND_ADDR is read back as the flat key `app_bind_addr`.
        let settings = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;
        Self::from_settings(&settings)
    }

    /// Build the config from flat, lowercased environment keys.
    pub fn from_settings(settings: &config::Config) -> anyhow::Result<Self> {
        let var = |key: &str| {
            settings
                .get_string(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        // APP_ENV, AUTH_PRODUCTION: either one marks a production deployment.
        let production = is_production_env(var("app_env").as_deref())
            || matches!(var("auth_production").as_deref(), Some("1" | "true" | "yes"));

        // APP_BIND_ADDR, COOKIE_KEY_BASE64, SESSION_TTL_MINUTES
        let session_ttl_minutes = match var("session_ttl_minutes") {
            None => default_session_ttl(),
            Some(v) => v
                .parse::<i64>()
                .map_err(|e| anyhow::anyhow!("invalid SESSION_TTL_MINUTES: {}", e))?,
        };
        if !(1..=MAX_SESSION_TTL_MINUTES).contains(&session_ttl_minutes) {
            anyhow::bail!(
                "SESSION_TTL_MINUTES must be between 1 and {}, got {}",
                MAX_SESSION_TTL_MINUTES,
                session_ttl_minutes
            );
        }
        let cookie_key_base64 = match var("cookie_key_base64") {
            Some(v) => v,
            None if production => anyhow::bail!("COOKIE_KEY_BASE64 is required in production"),
            None => {
                let mut key = [0u8; 64];
                rand::rngs::OsRng.fill_bytes(&mut key);
                tracing::warn!(
                    "COOKIE_KEY_BASE64 not provided; generated a temporary dev key. Sessions will be invalidated on restart."
                );
                base64::engine::general_purpose::STANDARD.encode(key)
            }
        };
        let server = ServerCfg {
            bind_addr: var("app_bind_addr").unwrap_or_else(default_bind_addr),
            cookie_key_base64,
            session_ttl_minutes,
        };

        // DATABASE_URL, STORE_BACKEND
        let backend = match var("store_backend").as_deref() {
            None => default_backend(),
            Some("memory") => StoreBackend::Memory,
            Some("sqlite") => StoreBackend::Sqlite,
            Some(other) => anyhow::bail!("unknown STORE_BACKEND `{}`", other),
        };
        let db = DbCfg { backend, url: var("database_url").unwrap_or_default() };
        if db.backend == StoreBackend::Sqlite && db.url.is_empty() {
            anyhow::bail!("DATABASE_URL is required for the sqlite store backend");
        }

        // ADMIN_CODE, with AUTH_ADMIN_CODE accepted as an alias
        let auth = AuthCfg {
            admin_code: var("admin_code").or_else(|| var("auth_admin_code")),
            production,
        };

        Ok(AppConfig { server, db, auth })
    }
}

fn is_production_env(app_env: Option<&str>) -> bool {
    matches!(app_env, Some("production" | "prod"))
}

pub fn decode_cookie_key(b64: &str) -> anyhow::Result<[u8; 64]> {
    // tower-cookies expects 64 bytes key for Private (32 for signing + 32 for encryption)
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid COOKIE_KEY_BASE64: {}", e))?;
    if bytes.len() == 32 {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&bytes);
        out[32..].copy_from_slice(&bytes);
        return Ok(out);
    }
    if bytes.len() != 64 {
        return Err(anyhow::anyhow!(
            "COOKIE_KEY_BASE64 must decode to 32 or 64 bytes, got {}",
            bytes.len()
        ));
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(vars: &[(&str, &str)]) -> config::Config {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<_, _>>();
        config::Config::builder()
            .add_source(config::Environment::default().source(Some(map)))
            .build()
            .unwrap()
    }

    fn key_b64() -> String {
        base64::engine::general_purpose::STANDARD.encode([9u8; 64])
    }

    #[test]
    fn production_requires_a_cookie_key() {
        let err = AppConfig::from_settings(&settings(&[
            ("APP_ENV", "production"),
            ("AUTH_ADMIN_CODE", "s3cret"),
            ("STORE_BACKEND", "memory"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("COOKIE_KEY_BASE64"));
    }

    #[test]
    fn app_env_marks_production_alongside_other_auth_vars() {
        let key = key_b64();
        let cfg = AppConfig::from_settings(&settings(&[
            ("APP_ENV", "production"),
            ("AUTH_ADMIN_CODE", "s3cret"),
            ("AUTH_GOOGLE_MODE", "mock"),
            ("STORE_BACKEND", "memory"),
            ("COOKIE_KEY_BASE64", &key),
        ]))
        .unwrap();
        assert!(cfg.auth.production);
        assert_eq!(cfg.auth.admin_code.as_deref(), Some("s3cret"));
    }

    #[test]
    fn production_without_admin_code_leaves_admin_disabled() {
        let key = key_b64();
        let cfg = AppConfig::from_settings(&settings(&[
            ("APP_ENV", "prod"),
            ("STORE_BACKEND", "memory"),
            ("COOKIE_KEY_BASE64", &key),
        ]))
        .unwrap();
        assert!(cfg.auth.production);
        assert_eq!(cfg.auth.admin_code, None);
        assert!(!crate::auth::AdminSecret::from_config(&cfg.auth).is_configured());
    }

    #[test]
    fn development_defaults() {
        let cfg = AppConfig::from_settings(&settings(&[
            ("STORE_BACKEND", "memory"),
            ("ADMIN_CODE", "  "),
        ]))
        .unwrap();
        assert!(!cfg.auth.production);
        assert_eq!(cfg.auth.admin_code, None);
        assert_eq!(decode_cookie_key(&cfg.server.cookie_key_base64).unwrap().len(), 64);
        assert_eq!(cfg.server.session_ttl_minutes, default_session_ttl());
    }

    #[test]
    fn session_ttl_is_bounded() {
        for bad in ["0", "-5", "9223372036854775807", "soon"] {
            let res = AppConfig::from_settings(&settings(&[
                ("STORE_BACKEND", "memory"),
                ("SESSION_TTL_MINUTES", bad),
            ]));
            assert!(res.is_err(), "ttl {} should be rejected", bad);
        }
        let cfg = AppConfig::from_settings(&settings(&[
            ("STORE_BACKEND", "memory"),
            ("SESSION_TTL_MINUTES", "30"),
        ]))
        .unwrap();
        assert_eq!(cfg.server.session_ttl_minutes, 30);
    }

    #[test]
    fn sqlite_backend_needs_a_url() {
        assert!(AppConfig::from_settings(&settings(&[("STORE_BACKEND", "sqlite")])).is_err());
        assert!(AppConfig::from_settings(&settings(&[("STORE_BACKEND", "redis")])).is_err());
    }

    #[test]
    fn short_cookie_key_is_doubled() {
        let b64 = base64::engine::general_purpose::STANDARD.encode([7u8; 32]);
        let key = decode_cookie_key(&b64).unwrap();
        assert_eq!(&key[..32], &key[32..]);
    }

    #[test]
    fn odd_sized_cookie_key_is_rejected() {
        let b64 = base64::engine::general_purpose::STANDARD.encode([1u8; 40]);
        assert!(decode_cookie_key(&b64).is_err());
    }
}
