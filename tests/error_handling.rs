//! Error handling and edge case tests.

use feed_coordinator::{
    ActiveTextShape, Collaborators, Coordinator, CoordinatorConfig, CoordinatorError, FeedError,
    FeedKey, Identity, Invalidation, LocalTransport, MemoryMirror, MemoryReplica, MemorySettings,
    PassOutcome, SessionFlags, SessionIdentity,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn test_coordinator(transport: &LocalTransport, session: &Arc<SessionFlags>) -> Coordinator {
    let parts = Collaborators {
        transport: Arc::new(transport.clone()),
        replica: Arc::new(MemoryReplica::new()),
        settings: Arc::new(MemorySettings::new()),
        identity: Arc::new(SessionIdentity::new(Identity::new("m1", "w_1"))),
        shapes: Arc::new(ActiveTextShape::new()),
        mirror: Arc::new(MemoryMirror::new()),
        session: Arc::clone(session),
    };
    Coordinator::new(CoordinatorConfig::default(), parts)
}

// --- Feed Errors ---

#[test]
fn test_feed_error_forces_ready() {
    let transport = LocalTransport::new();
    let session = Arc::new(SessionFlags::new());
    let coordinator = test_coordinator(&transport, &session);

    let outcome = coordinator.evaluate();
    assert!(!outcome.ready());

    transport
        .fail(&FeedKey::named("meetings"), FeedError::new("403"))
        .unwrap();
    assert_eq!(session.error_code().as_deref(), Some("403"));

    let outcome = coordinator.evaluate();
    assert!(matches!(outcome, PassOutcome::Failed { ref code } if code == "403"));
    assert!(outcome.ready());
    assert!(session.subscriptions_ready());
}

#[test]
fn test_last_error_wins() {
    let transport = LocalTransport::new();
    let session = Arc::new(SessionFlags::new());
    let coordinator = test_coordinator(&transport, &session);
    coordinator.evaluate();

    transport
        .fail(&FeedKey::named("users"), FeedError::new("401"))
        .unwrap();
    transport
        .fail(
            &FeedKey::named("polls"),
            FeedError::new("500").with_reason("internal"),
        )
        .unwrap();

    assert_eq!(coordinator.evaluate().error_code(), Some("500"));
}

#[test]
fn test_reset_resumes_waiting() {
    let transport = LocalTransport::new();
    let session = Arc::new(SessionFlags::new());
    let coordinator = test_coordinator(&transport, &session);
    coordinator.evaluate();

    transport
        .fail(&FeedKey::named("users"), FeedError::new("403"))
        .unwrap();
    assert!(coordinator.evaluate().ready());
    assert_eq!(transport.feed_count(), 0);

    session.reset();
    let outcome = coordinator.evaluate();
    assert!(!outcome.ready());
    assert_eq!(outcome.handles().len(), 26);
}

#[test]
fn test_error_notifier_receives_code() {
    let transport = LocalTransport::new();
    let session = Arc::new(SessionFlags::new());
    let (tx, rx) = crossbeam_channel::unbounded();
    let coordinator = test_coordinator(&transport, &session).with_error_notifier(tx);
    coordinator.evaluate();

    transport
        .fail(&FeedKey::named("note"), FeedError::new("404"))
        .unwrap();

    assert!(matches!(rx.try_recv(), Ok(Invalidation::Error(code)) if code == "404"));
}

#[test]
fn test_failure_cycles_keep_event_backlog_bounded() {
    let transport = LocalTransport::with_buffer_size(64);
    let session = Arc::new(SessionFlags::new());
    let coordinator = test_coordinator(&transport, &session);
    let idle = transport.events();

    for _ in 0..200 {
        coordinator.evaluate();
        transport.mark_all_ready();
        session.set_error("500");
        coordinator.evaluate();
        session.reset();
    }

    assert_eq!(idle.len(), 64);

    // Receivers created later start empty and still see new events.
    let live = transport.events();
    assert!(live.is_empty());
    coordinator.evaluate();
    transport.mark_all_ready();
    assert!(!live.is_empty());
}

#[test]
fn test_unknown_feed() {
    let transport = LocalTransport::new();
    let result = transport.fail(&FeedKey::named("missing"), FeedError::new("403"));
    assert!(matches!(result, Err(CoordinatorError::FeedNotFound(_))));
}

// --- Configuration ---

#[test]
fn test_load_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{
            "chat": {
                "enabled": false,
                "public_group_id": "PUBLIC",
                "type_public": "PUBLIC_ACCESS",
                "typingIndicator": { "enabled": false }
            },
            "feeds": { "catalog": ["users", "group-chat", "users-typing"] }
        }"#,
    )
    .unwrap();

    let config = CoordinatorConfig::load(&path).unwrap();
    assert!(!config.chat.enabled);
    assert!(!config.chat.typing_indicator.enabled);
    assert_eq!(config.feeds.catalog.len(), 3);
    assert_eq!(config.feeds.chat_messages, "group-chat-msg");
}

#[test]
fn test_load_missing_config_file() {
    let dir = TempDir::new().unwrap();
    let result = CoordinatorConfig::load(dir.path().join("nope.json"));
    assert!(matches!(result, Err(CoordinatorError::Io(_))));
}

#[test]
fn test_load_malformed_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, "{ not json").unwrap();

    let result = CoordinatorConfig::load(&path);
    assert!(matches!(result, Err(CoordinatorError::Config(_))));
}

#[test]
fn test_feed_error_payload_roundtrips_code() {
    let error: FeedError = serde_json::from_str(r#"{"error": "403", "reason": "denied"}"#).unwrap();
    assert_eq!(error.error, "403");
    assert_eq!(error.to_string(), "[403] denied");
}
