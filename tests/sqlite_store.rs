#![cfg(feature = "sqlite")]

use std::sync::Arc;

use quota_gate::db::{migrations::run_sqlite_migrations, sqlite::make_pool_sized};
use quota_gate::ledger::QuotaLedger;
use quota_gate::models::{AccessToken, ActionKind, OAuthProfile, Remaining, ResolvedIdentity, Tier, UNLIMITED};
use quota_gate::repos::sqlite::{SqliteCredentialStore, SqliteProfileStore};
use quota_gate::repos::{ConsumeOutcome, CredentialStore, ProfileStore};

struct TestDb {
    _dir: tempfile::TempDir,
    tokens: Arc<SqliteCredentialStore>,
    profiles: Arc<SqliteProfileStore>,
}

fn init_test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gate.db");
    let pool = make_pool_sized(path.to_str().unwrap(), 4).expect("pool");
    let mut conn = pool.get().expect("conn");
    run_sqlite_migrations(&mut conn).expect("migrations");
    drop(conn);
    TestDb {
        _dir: dir,
        tokens: SqliteCredentialStore::new(pool.clone()),
        profiles: SqliteProfileStore::new(pool),
    }
}

#[tokio::test]
async fn token_rows_consume_and_disable() {
    let db = init_test_db();
    let token = AccessToken::issue("test-aaaaaaaaaaaaaaaa".into(), 2);
    db.tokens.insert_token(&token).await.unwrap();
    assert!(db.tokens.insert_token(&token).await.is_err(), "duplicate id must be rejected");

    let loaded = db.tokens.get_token(&token.id).await.unwrap().unwrap();
    assert_eq!(loaded, token);

    assert_eq!(db.tokens.consume_token(&token.id).await.unwrap(), ConsumeOutcome::Consumed { remaining: 1 });
    assert_eq!(db.tokens.consume_token(&token.id).await.unwrap(), ConsumeOutcome::Consumed { remaining: 0 });
    assert_eq!(db.tokens.consume_token(&token.id).await.unwrap(), ConsumeOutcome::Exhausted);
    assert_eq!(db.tokens.consume_token("test-missing").await.unwrap(), ConsumeOutcome::Missing);

    let other = AccessToken::issue("test-bbbbbbbbbbbbbbbb".into(), 9);
    db.tokens.insert_token(&other).await.unwrap();
    assert!(db.tokens.disable_token(&other.id).await.unwrap());
    assert!(db.tokens.disable_token(&other.id).await.unwrap());
    assert!(!db.tokens.disable_token("test-missing").await.unwrap());
    assert_eq!(db.tokens.consume_token(&other.id).await.unwrap(), ConsumeOutcome::Disabled);

    let stored = db.tokens.get_token(&other.id).await.unwrap().unwrap();
    assert!(!stored.is_active);
    assert_eq!(stored.queries_remaining, 9);
    assert_eq!(db.tokens.list_tokens().await.unwrap().len(), 2);
}

#[tokio::test]
async fn profile_counters_respect_sentinel() {
    let db = init_test_db();
    let seeded = db.profiles.ensure_profile(&OAuthProfile::for_tier("a@example.com", Tier::Free)).await.unwrap();
    assert_eq!((seeded.debates_remaining, seeded.chats_remaining), (3, 10));

    // a second ensure keeps the stored row
    db.profiles.consume_profile("a@example.com", ActionKind::Debate).await.unwrap();
    let again = db.profiles.ensure_profile(&OAuthProfile::for_tier("a@example.com", Tier::Free)).await.unwrap();
    assert_eq!(again.debates_remaining, 2);

    assert_eq!(
        db.profiles.consume_profile("nobody@example.com", ActionKind::Chat).await.unwrap(),
        ConsumeOutcome::Missing
    );

    let pro = db.profiles.set_tier("a@example.com", Tier::Pro).await.unwrap().unwrap();
    assert_eq!(pro.debates_remaining, UNLIMITED);
    for _ in 0..5 {
        assert_eq!(
            db.profiles.consume_profile("a@example.com", ActionKind::Debate).await.unwrap(),
            ConsumeOutcome::Unlimited
        );
    }
    let stored = db.profiles.get_profile("a@example.com").await.unwrap().unwrap();
    assert_eq!(stored.debates_remaining, UNLIMITED);
    assert_eq!(stored.tier, Tier::Pro);

    assert!(db.profiles.set_tier("nobody@example.com", Tier::Basic).await.unwrap().is_none());
}

#[tokio::test]
async fn seeding_below_sentinel_is_an_error() {
    let db = init_test_db();
    let mut bad = OAuthProfile::for_tier("odd@example.com", Tier::Free);
    bad.debates_remaining = -7;
    let err = db.profiles.ensure_profile(&bad).await.unwrap_err();
    assert!(!err.to_string().contains("vanished"), "CHECK failure should surface: {}", err);
    assert!(db.profiles.get_profile("odd@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn flags_upsert() {
    let db = init_test_db();
    assert_eq!(db.tokens.get_flag("maintenance").await.unwrap(), None);
    db.tokens.set_flag("maintenance", "off").await.unwrap();
    db.tokens.set_flag("maintenance", "on").await.unwrap();
    assert_eq!(db.tokens.get_flag("maintenance").await.unwrap().as_deref(), Some("on"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_spends_never_overdraw() {
    let db = init_test_db();
    let token = AccessToken::issue("test-cccccccccccccccc".into(), 5);
    db.tokens.insert_token(&token).await.unwrap();
    let ledger = QuotaLedger::new(db.tokens.clone(), db.profiles.clone());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let ledger = ledger.clone();
        let identity = ResolvedIdentity::TokenUser { token_id: token.id.clone() };
        handles.push(tokio::spawn(async move {
            ledger.authorize_and_consume(&identity, ActionKind::Chat).await
        }));
    }
    let mut granted = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(Remaining::Count(_)) => granted += 1,
            Ok(Remaining::Unlimited) => panic!("token spend reported unlimited"),
            Err(e) => assert_eq!(e, quota_gate::error::AccessError::QuotaExhausted),
        }
    }
    assert_eq!(granted, 5);
    let stored = db.tokens.get_token(&token.id).await.unwrap().unwrap();
    assert_eq!(stored.queries_remaining, 0);
}
