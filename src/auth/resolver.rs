use crate::auth::session::{OAuthAssertion, SessionCarrier, SessionMode};
use crate::models::ResolvedIdentity;

/// Merge every credential source into one identity. First match wins:
/// OAuth session, then an admin carrier, then a token carrier.
pub fn resolve(oauth: Option<&OAuthAssertion>, carrier: Option<&SessionCarrier>) -> ResolvedIdentity {
    match (oauth, carrier) {
        (Some(a), _) if a.is_well_formed() => ResolvedIdentity::OAuthUser {
            email: a.email.clone(),
            tier: a.tier,
            debates_remaining: a.debates_remaining,
            chats_remaining: a.chats_remaining,
        },
        (_, Some(SessionCarrier { mode: SessionMode::Admin, .. })) => ResolvedIdentity::Admin,
        (_, Some(SessionCarrier { mode: SessionMode::Token, token: Some(id), .. })) if !id.is_empty() => {
            ResolvedIdentity::TokenUser { token_id: id.clone() }
        }
        _ => ResolvedIdentity::Anonymous,
    }
}
