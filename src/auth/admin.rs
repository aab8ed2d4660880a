use crate::config::AuthCfg;
use crate::error::AccessError;
use crate::security::{digests_match, generate_dev_secret, hash_secret};

/// The privileged admin code, held only as a digest.
///
/// In production a missing code disables the admin branch entirely: every
/// comparison fails and admin-only operations report `ConfigurationError`.
/// Outside production a random development code is generated at startup.
#[derive(Clone)]
pub struct AdminSecret {
    digest: Option<String>,
}

impl AdminSecret {
    pub fn from_config(cfg: &AuthCfg) -> Self {
        match cfg.admin_code.as_deref() {
            Some(code) => Self::from_code(code),
            None if cfg.production => {
                tracing::error!("ADMIN_CODE is not set in production; admin access is disabled");
                Self::disabled()
            }
            None => {
                let code = generate_dev_secret();
                tracing::warn!(admin_code = %code, "ADMIN_CODE not provided; generated a development admin code");
                Self::from_code(&code)
            }
        }
    }

    pub fn from_code(code: &str) -> Self {
        Self { digest: Some(hash_secret(code)) }
    }

    pub fn disabled() -> Self {
        Self { digest: None }
    }

    pub fn is_configured(&self) -> bool {
        self.digest.is_some()
    }

    /// Exact match against the configured code. Always false when unconfigured.
    pub fn matches(&self, candidate: &str) -> bool {
        match &self.digest {
            Some(digest) => digests_match(digest, &hash_secret(candidate)),
            None => false,
        }
    }

    /// Gate for one-shot admin calls that present the code directly.
    pub fn authorize(&self, candidate: Option<&str>) -> Result<(), AccessError> {
        if !self.is_configured() {
            return Err(AccessError::ConfigurationError);
        }
        let Some(candidate) = candidate else {
            return Err(AccessError::Unauthenticated);
        };
        if self.matches(candidate) {
            Ok(())
        } else {
            tracing::warn!("admin credential rejected");
            Err(AccessError::InvalidCredential)
        }
    }
}
