//! Integration tests for session persistence, expiry, logout, and the
//! standalone callback route.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tradedesk_core::auth::{
    expiry, AuthData, AuthProvider, CallbackEnv, CallbackOutcome, CallbackPage, CallbackParams,
    ChannelNotifier, MemoryStorage, NotificationLevel, Route, Session, SessionStore, Storage,
};
use tradedesk_core::Config;

use common::{alice, context, expired_blob, FakeApi, RecordingNavigator};

// =========================================================================
// Expiry
// =========================================================================

#[tokio::test]
async fn test_expired_session_is_logged_out_on_check() {
    let storage = MemoryStorage::new();
    storage.set("auth", &expired_blob("old-token")).unwrap();
    let api = Arc::new(FakeApi::default());
    let (ctx, mut notes) = context(&storage, api.clone());

    // Never hydrated, but still stored until the check revokes it.
    assert!(!ctx.is_authenticated());
    assert!(storage.get("auth").unwrap().is_some());

    assert!(expiry::check_expiry(&ctx).await);
    assert!(!ctx.is_authenticated());
    assert!(storage.get("auth").unwrap().is_none());
    assert_eq!(api.logout_tokens(), vec!["old-token".to_string()]);

    let note = notes.recv().await.unwrap();
    assert_eq!(note.level, NotificationLevel::Warning);
    assert!(note.message.contains("expired"));

    // Nothing left to expire.
    assert!(!expiry::check_expiry(&ctx).await);
}

#[tokio::test]
async fn test_valid_session_survives_check() {
    let storage = MemoryStorage::new();
    let (ctx, _notes) = context(&storage, Arc::new(FakeApi::default()));
    ctx.handle_oauth_callback(AuthData {
        token: "fresh".to_string(),
        user: alice(),
    })
    .unwrap();

    assert!(!expiry::check_expiry(&ctx).await);
    assert!(ctx.is_authenticated());
    assert!(storage.get("auth").unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_provider_watcher_clears_expired_session() {
    let storage = MemoryStorage::new();
    storage.set("auth", &expired_blob("old-token")).unwrap();
    let config = Config::default();
    let (notifier, _notes) = ChannelNotifier::new();

    let mut provider = AuthProvider::start(
        &config,
        Arc::new(storage.clone()),
        Arc::new(FakeApi::default()),
        Arc::new(notifier),
    );
    assert!(provider.is_watching());
    assert!(!provider.context().is_authenticated());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!provider.context().is_authenticated());
    assert!(storage.get("auth").unwrap().is_none());

    provider.shutdown();
    assert!(!provider.is_watching());
}

#[tokio::test(start_paused = true)]
async fn test_watcher_catches_session_expired_by_another_writer() {
    let storage = MemoryStorage::new();
    let (notifier, _notes) = ChannelNotifier::new();
    let provider = AuthProvider::start(
        &Config::default(),
        Arc::new(storage.clone()),
        Arc::new(FakeApi::default()),
        Arc::new(notifier),
    );
    provider
        .context()
        .handle_oauth_callback(AuthData {
            token: "t1".to_string(),
            user: alice(),
        })
        .unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(provider.context().is_authenticated());

    // Same profile storage rewritten with an already expired session.
    storage.set("auth", &expired_blob("t1")).unwrap();
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(!provider.context().is_authenticated());
}

// =========================================================================
// Logout
// =========================================================================

#[tokio::test]
async fn test_logout_is_idempotent() {
    let storage = MemoryStorage::new();
    let api = Arc::new(FakeApi::default());
    let (ctx, _notes) = context(&storage, api.clone());

    assert!(ctx.logout().await.is_ok());
    assert!(ctx.logout().await.is_ok());
    assert!(storage.get("auth").unwrap().is_none());
    assert!(api.logout_tokens().is_empty());
}

#[tokio::test]
async fn test_logout_clears_local_state_when_server_unreachable() {
    let storage = MemoryStorage::new();
    let api = Arc::new(FakeApi::failing());
    let (ctx, mut notes) = context(&storage, api.clone());
    ctx.handle_oauth_callback(AuthData {
        token: "t1".to_string(),
        user: alice(),
    })
    .unwrap();

    assert!(ctx.logout().await.is_err());
    assert_eq!(api.logout_tokens(), vec!["t1".to_string()]);
    assert!(!ctx.is_authenticated());
    assert!(ctx.token().is_none());
    assert!(storage.get("auth").unwrap().is_none());
    assert_eq!(notes.recv().await.unwrap().level, NotificationLevel::Error);
}

// =========================================================================
// Persistence
// =========================================================================

#[test]
fn test_last_write_wins_across_contexts() {
    let storage = MemoryStorage::new();
    let (first, _a) = context(&storage, Arc::new(FakeApi::default()));
    let (second, _b) = context(&storage, Arc::new(FakeApi::default()));

    first
        .handle_oauth_callback(AuthData {
            token: "from-first".to_string(),
            user: alice(),
        })
        .unwrap();
    second
        .handle_oauth_callback(AuthData {
            token: "from-second".to_string(),
            user: alice().with_provider("github"),
        })
        .unwrap();

    let stored = SessionStore::new(Arc::new(storage)).load().unwrap();
    assert_eq!(stored.token(), "from-second");
    assert_eq!(stored.user().provider.as_deref(), Some("github"));

    // Each context keeps its own in-memory view.
    assert_eq!(first.token().as_deref(), Some("from-first"));
}

#[test]
fn test_round_trip_through_store() {
    let store = SessionStore::new(Arc::new(MemoryStorage::new()));
    let session = Session::new(
        "t1",
        alice().with_roles(["USER"]),
        Some(chrono::Utc::now() + chrono::Duration::hours(2)),
    )
    .unwrap();

    store.save(&session).unwrap();
    assert_eq!(store.load(), Some(session));
}

// =========================================================================
// Standalone callback route
// =========================================================================

#[tokio::test]
async fn test_standalone_callback_signs_in_and_goes_home() {
    let storage = MemoryStorage::new();
    let (ctx, _notes) = context(&storage, Arc::new(FakeApi::default()));
    let navigator = RecordingNavigator::default();
    let params = CallbackParams::from_query(
        "auth_success=true&token=XYZ&email=a@b.com&name=Alice&provider=google",
    );

    let outcome = CallbackPage::new()
        .run(
            &params,
            CallbackEnv::Standalone {
                auth: &ctx,
                navigator: &navigator,
            },
        )
        .await;

    assert_eq!(outcome, CallbackOutcome::Navigated(Route::Home));
    assert_eq!(navigator.routes(), vec![Route::Home]);
    assert_eq!(ctx.token().as_deref(), Some("XYZ"));
    assert_eq!(ctx.user().unwrap().provider.as_deref(), Some("google"));
}

#[tokio::test]
async fn test_standalone_callback_failure_redirects_to_login() {
    let storage = MemoryStorage::new();
    let (ctx, _notes) = context(&storage, Arc::new(FakeApi::default()));
    ctx.handle_oauth_callback(AuthData {
        token: "previous".to_string(),
        user: alice(),
    })
    .unwrap();
    let navigator = RecordingNavigator::default();
    let params = CallbackParams::from_query("auth_success=true&token=abc");

    let outcome = CallbackPage::new()
        .run(
            &params,
            CallbackEnv::Standalone {
                auth: &ctx,
                navigator: &navigator,
            },
        )
        .await;

    let expected = Route::Login {
        error: Some("Authentication failed".to_string()),
    };
    assert_eq!(outcome, CallbackOutcome::Navigated(expected.clone()));
    assert_eq!(expected.path(), "/login?error=Authentication%20failed");
    assert!(!ctx.is_authenticated());
    assert!(storage.get("auth").unwrap().is_none());
}

#[tokio::test]
async fn test_callback_runs_once() {
    let storage = MemoryStorage::new();
    let (ctx, _notes) = context(&storage, Arc::new(FakeApi::default()));
    let navigator = RecordingNavigator::default();
    let params = CallbackParams::from_query("auth_success=true&token=XYZ&email=a@b.com&name=Alice");
    let page = CallbackPage::new();

    for _ in 0..2 {
        page.run(
            &params,
            CallbackEnv::Standalone {
                auth: &ctx,
                navigator: &navigator,
            },
        )
        .await;
    }

    let again = page
        .run(
            &params,
            CallbackEnv::Standalone {
                auth: &ctx,
                navigator: &navigator,
            },
        )
        .await;
    assert_eq!(again, CallbackOutcome::AlreadyHandled);
    assert_eq!(navigator.routes().len(), 1);
    assert_eq!(ctx.token().as_deref(), Some("XYZ"));
}
