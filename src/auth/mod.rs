//! Credential handling: the session carrier and OAuth cookies, the admin
//! secret, identity resolution and login/verify.

pub mod admin;
pub mod login;
pub mod resolver;
pub mod session;

pub use admin::AdminSecret;
pub use resolver::resolve;
