//! Plugin configuration guard shared by concurrent establishment attempts

use connector_wire::options::{names, ConnectOptions};
use connector_wire::plugin::{CallbackTarget, LockRequest, PluginConfigGuard, PluginLockState, PluginValue};
use connector_wire::protocol::constants::plugins;
use connector_wire::testing::ScriptedTransport;
use connector_wire::Driver;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn opts() -> ConnectOptions {
    ConnectOptions::new()
        .set(names::USER_NAME, "app")
        .unwrap()
        .host("db", None)
}

fn recording_driver(guard: &Arc<PluginConfigGuard>) -> (Driver, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut driver = Driver::new(Arc::clone(guard));
    driver.set_auth_message_callback(move |msg| sink.lock().push(msg.to_string()));
    (driver, seen)
}

#[tokio::test]
async fn test_callback_routes_to_last_connecting_driver() {
    let guard = Arc::new(PluginConfigGuard::new());
    let (a, seen_a) = recording_driver(&guard);
    let (b, seen_b) = recording_driver(&guard);

    a.connect(ScriptedTransport::new(), &opts()).await.unwrap();
    assert_eq!(guard.callback_target(), CallbackTarget::Caller(a.id()));
    assert!(guard.dispatch("touch your key"));

    b.connect(ScriptedTransport::new(), &opts()).await.unwrap();
    assert_eq!(guard.callback_target(), CallbackTarget::Caller(b.id()));
    assert!(guard.dispatch("touch again"));

    assert_eq!(*seen_a.lock(), vec!["touch your key"]);
    assert_eq!(*seen_b.lock(), vec!["touch again"]);
}

#[tokio::test]
async fn test_installed_forwarder_reaches_callback() {
    let guard = Arc::new(PluginConfigGuard::new());
    let (driver, seen) = recording_driver(&guard);
    let transport = ScriptedTransport::new();
    let log = transport.clone();

    driver.connect(transport, &opts()).await.unwrap();

    let forwarder = log
        .plugin_values()
        .into_iter()
        .find(|(plugin, option, _)| {
            plugin == plugins::WEBAUTHN_CLIENT && option == plugins::WEBAUTHN_MESSAGES_CALLBACK
        })
        .and_then(|(_, _, value)| match value {
            PluginValue::Callback(cb) => cb,
            _ => None,
        })
        .expect("callback installed on the plugin");

    forwarder("from plugin");
    assert_eq!(*seen.lock(), vec!["from plugin"]);
}

#[tokio::test]
async fn test_driver_without_callback_resets_routing() {
    let guard = Arc::new(PluginConfigGuard::new());
    let (with_cb, seen) = recording_driver(&guard);
    let without_cb = Driver::new(Arc::clone(&guard));

    with_cb.connect(ScriptedTransport::new(), &opts()).await.unwrap();
    let transport = ScriptedTransport::new();
    let log = transport.clone();
    without_cb.connect(transport, &opts()).await.unwrap();

    assert_eq!(guard.callback_target(), CallbackTarget::PluginDefault);
    assert!(!guard.dispatch("nobody listens"));
    assert!(seen.lock().is_empty());
    assert!(log.plugin_values().iter().any(|(_, option, value)| {
        option == plugins::WEBAUTHN_MESSAGES_CALLBACK && matches!(value, PluginValue::Callback(None))
    }));
}

#[tokio::test]
async fn test_driver_without_callback_leaves_unconfigured_plugin_alone() {
    let guard = Arc::new(PluginConfigGuard::new());
    let transport = ScriptedTransport::new();
    let log = transport.clone();

    Driver::new(Arc::clone(&guard))
        .connect(transport, &opts())
        .await
        .unwrap();

    assert_eq!(guard.callback_target(), CallbackTarget::Unconfigured);
    assert!(!log
        .plugin_values()
        .iter()
        .any(|(_, option, _)| option == plugins::WEBAUTHN_MESSAGES_CALLBACK));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reconfiguration_waits_for_guarded_holders() {
    let guard = Arc::new(PluginConfigGuard::new());
    let mut holder = guard.handle();
    holder.request(LockRequest::Guard).await;
    holder.request(LockRequest::Unlock).await;
    assert_eq!(guard.state(), PluginLockState::Guarded(1));

    let (driver, _) = recording_driver(&guard);
    let task = tokio::spawn(async move { driver.connect(ScriptedTransport::new(), &opts()).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());
    assert_eq!(guard.callback_target(), CallbackTarget::Unconfigured);

    holder.request(LockRequest::Unguard).await;
    let conn = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("connect finishes once the guard is released")
        .unwrap();
    assert!(conn.is_ok());
    assert_eq!(guard.state(), PluginLockState::Unlocked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_attempts_leave_lock_released() {
    let guard = Arc::new(PluginConfigGuard::new());
    let mut tasks = Vec::new();

    for i in 0..16 {
        let driver = if i % 3 == 0 {
            Driver::new(Arc::clone(&guard))
        } else {
            recording_driver(&guard).0
        };
        tasks.push(tokio::spawn(async move {
            driver.connect(ScriptedTransport::new(), &opts()).await
        }));
    }

    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }
    assert_eq!(guard.state(), PluginLockState::Unlocked);
}

#[tokio::test]
async fn test_failed_attempt_releases_guard() {
    let guard = Arc::new(PluginConfigGuard::new());
    let (driver, _) = recording_driver(&guard);
    let transport = ScriptedTransport::new().unreachable("db:3306");

    assert!(driver.connect(transport, &opts()).await.is_err());
    assert_eq!(guard.state(), PluginLockState::Unlocked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exclusive_waits_for_both_shared_holders() {
    let guard = Arc::new(PluginConfigGuard::new());
    let mut first = guard.handle();
    let mut second = guard.handle();
    first.request(LockRequest::Shared).await;
    second.request(LockRequest::Shared).await;
    assert_eq!(guard.state(), PluginLockState::Shared(2));

    let writer_guard = Arc::clone(&guard);
    let writer = tokio::spawn(async move {
        let mut lock = writer_guard.handle();
        lock.request(LockRequest::Exclusive).await;
        lock
    });

    first.request(LockRequest::Unlock).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!writer.is_finished());

    second.request(LockRequest::Unlock).await;
    let lock = tokio::time::timeout(Duration::from_secs(5), writer)
        .await
        .expect("exclusive granted once both readers left")
        .unwrap();
    assert_eq!(guard.state(), PluginLockState::Exclusive);

    drop(lock);
    assert_eq!(guard.state(), PluginLockState::Unlocked);
}

#[tokio::test]
async fn test_guard_survives_unlock() {
    let guard = Arc::new(PluginConfigGuard::new());
    let mut lock = guard.handle();
    lock.request(LockRequest::Guard).await;

    lock.request(LockRequest::Unlock).await;
    lock.request(LockRequest::Unlock).await;
    assert_eq!(guard.state(), PluginLockState::Guarded(1));

    lock.request(LockRequest::Unguard).await;
    assert_eq!(guard.state(), PluginLockState::Unlocked);
}

#[tokio::test]
async fn test_replaced_callback_receives_messages() {
    let guard = Arc::new(PluginConfigGuard::new());
    let (mut driver, old) = recording_driver(&guard);
    driver.connect(ScriptedTransport::new(), &opts()).await.unwrap();

    let new = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&new);
    driver.set_auth_message_callback(move |msg| sink.lock().push(msg.to_string()));
    let transport = ScriptedTransport::new();
    let log = transport.clone();
    driver.connect(transport, &opts()).await.unwrap();

    assert!(guard.dispatch("touch"));
    assert!(old.lock().is_empty());
    assert_eq!(*new.lock(), vec!["touch"]);
    assert_eq!(guard.callback_target(), CallbackTarget::Caller(driver.id()));
    assert!(log
        .plugin_values()
        .iter()
        .any(|(_, option, _)| option == plugins::WEBAUTHN_MESSAGES_CALLBACK));
}

#[tokio::test]
async fn test_cloned_driver_with_own_callback_takes_over() {
    let guard = Arc::new(PluginConfigGuard::new());
    let (original, seen_original) = recording_driver(&guard);
    let mut clone = original.clone();
    let seen_clone = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen_clone);
    clone.set_auth_message_callback(move |msg| sink.lock().push(msg.to_string()));

    original.connect(ScriptedTransport::new(), &opts()).await.unwrap();
    clone.connect(ScriptedTransport::new(), &opts()).await.unwrap();
    assert!(guard.dispatch("from clone"));

    original.connect(ScriptedTransport::new(), &opts()).await.unwrap();
    assert!(guard.dispatch("from original"));

    assert_eq!(*seen_clone.lock(), vec!["from clone"]);
    assert_eq!(*seen_original.lock(), vec!["from original"]);
}

#[tokio::test]
async fn test_unchanged_callback_is_not_reinstalled() {
    let guard = Arc::new(PluginConfigGuard::new());
    let (driver, _) = recording_driver(&guard);
    driver.connect(ScriptedTransport::new(), &opts()).await.unwrap();

    let transport = ScriptedTransport::new();
    let log = transport.clone();
    driver.connect(transport, &opts()).await.unwrap();
    assert!(!log
        .plugin_values()
        .iter()
        .any(|(_, option, _)| option == plugins::WEBAUTHN_MESSAGES_CALLBACK));
}
