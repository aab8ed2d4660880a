pub mod access_token;
pub mod identity;
pub mod profile;

pub use access_token::AccessToken;
pub use identity::{ActionKind, AuthMode, IdentitySnapshot, LoginGrant, Remaining, ResolvedIdentity};
pub use profile::{OAuthProfile, Tier, UNLIMITED};
