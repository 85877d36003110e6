//! Failover behavior across multiple endpoints
//!
//! All tests run against the scripted in-memory transport.

use connector_wire::endpoint::{PrioritySelector, RandomSelector};
use connector_wire::options::{names, ConnectOptions};
use connector_wire::plugin::PluginConfigGuard;
use connector_wire::testing::{Outcome, ScriptedTransport, SequenceSelector};
use connector_wire::{Driver, Error, NativeError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn driver() -> Driver {
    init_tracing();
    Driver::new(Arc::new(PluginConfigGuard::new()))
}

fn multi_host() -> ConnectOptions {
    ConnectOptions::new()
        .set(names::USER_NAME, "app")
        .unwrap()
        .set(names::MULTI_HOST, true)
        .unwrap()
}

#[tokio::test]
async fn test_two_unreachable_hosts_are_each_tried_once() {
    let transport = ScriptedTransport::new()
        .unreachable("db1:3306")
        .unreachable("db2:3306");
    let log = transport.clone();
    let opts = multi_host().host("db1", None).host("db2", None);

    let err = driver().connect(transport, &opts).await.unwrap_err();

    let attempts = log.connect_attempts();
    assert_eq!(attempts.len(), 2);
    let distinct: HashSet<_> = attempts.iter().collect();
    assert_eq!(distinct.len(), 2);

    match err {
        Error::ExhaustedEndpoints {
            message,
            code,
            attempted,
            ..
        } => {
            assert_eq!(message, "Unable to connect to any of the hosts");
            assert_eq!(code, 2003);
            assert_eq!(attempted, 2);
        }
        other => panic!("expected ExhaustedEndpoints, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fails_over_to_reachable_host() {
    let transport = ScriptedTransport::new().unreachable("db1:3306");
    let log = transport.clone();
    let opts = multi_host().host("db1", None).host("db2", None);

    let conn = driver()
        .connect_with_selector(transport, &opts, &mut SequenceSelector::in_order())
        .await
        .unwrap();

    assert_eq!(conn.host_info(), "db2:3306");
    assert_eq!(log.connect_attempts(), vec!["db1:3306", "db2:3306"]);
}

#[tokio::test]
async fn test_fatal_error_stops_failover() {
    let denied = NativeError::new(1045, "28000", "Access denied for user 'app'");
    let transport = ScriptedTransport::new().script("db1:3306", Outcome::Fail(denied.clone()));
    let log = transport.clone();
    let opts = multi_host()
        .host("db1", None)
        .host("db2", None)
        .host("db3", None);

    let err = driver()
        .connect_with_selector(transport, &opts, &mut SequenceSelector::in_order())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::FatalConnect(ref e) if *e == denied));
    assert_eq!(log.connect_attempts(), vec!["db1:3306"]);
}

#[tokio::test]
async fn test_single_host_message_names_the_host() {
    let transport = ScriptedTransport::new().unreachable("db:3307");
    let opts = ConnectOptions::new()
        .set(names::USER_NAME, "app")
        .unwrap()
        .host("db", Some(3307));

    let err = driver().connect(transport, &opts).await.unwrap_err();
    assert_eq!(err.to_string(), "Unable to connect to db:3307");
    assert_eq!(err.sqlstate(), Some("HY000"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_single_socket_message_names_the_path() {
    let transport = ScriptedTransport::new().script(
        "/tmp/mysql.sock",
        Outcome::Fail(NativeError::new(2002, "HY000", "no socket")),
    );
    let opts = ConnectOptions::new()
        .set(names::SOCKET, "/tmp/mysql.sock")
        .unwrap();

    let err = driver().connect(transport, &opts).await.unwrap_err();
    assert_eq!(err.to_string(), "Unable to connect to /tmp/mysql.sock");
    assert_eq!(err.code(), Some(2002));
}

#[tokio::test]
async fn test_dns_srv_message() {
    let srv = "_mysql._tcp.example.com";
    let transport = ScriptedTransport::new().unreachable(srv);
    let log = transport.clone();
    let opts = ConnectOptions::new()
        .set(names::USER_NAME, "app")
        .unwrap()
        .set(names::DNS_SRV, true)
        .unwrap()
        .host(srv, None);

    let err = driver().connect(transport, &opts).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unable to connect to any of the hosts of _mysql._tcp.example.com SRV"
    );
    assert_eq!(log.connect_attempts(), vec![srv]);
}

#[tokio::test]
async fn test_connect_timeout_is_retryable() {
    let transport = ScriptedTransport::new().script("slow:3306", Outcome::Hang);
    let log = transport.clone();
    let opts = multi_host()
        .set(names::CONNECT_TIMEOUT, Duration::from_millis(20))
        .unwrap()
        .host("slow", None)
        .host("fast", None);

    let conn = driver()
        .connect_with_selector(transport, &opts, &mut SequenceSelector::in_order())
        .await
        .unwrap();

    assert_eq!(conn.host_info(), "fast:3306");
    assert_eq!(log.connect_attempts(), vec!["slow:3306", "fast:3306"]);
}

fn prioritized() -> ConnectOptions {
    multi_host()
        .host("low", None)
        .priority(10)
        .unwrap()
        .host("high1", None)
        .priority(90)
        .unwrap()
        .host("high2", None)
        .priority(90)
        .unwrap()
}

#[tokio::test]
async fn test_priority_tiers_are_tried_in_order_when_opted_in() {
    let transport = ScriptedTransport::new()
        .unreachable("high1:3306")
        .unreachable("high2:3306")
        .unreachable("low:3306");
    let log = transport.clone();

    let mut selector = PrioritySelector::seeded(7);
    let _ = driver()
        .connect_with_selector(transport, &prioritized(), &mut selector)
        .await
        .unwrap_err();

    let attempts = log.connect_attempts();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[2], "low:3306");
}

#[tokio::test]
async fn test_default_selection_ignores_priority() {
    let mut low_first = 0;
    for seed in 0..200 {
        let transport = ScriptedTransport::new();
        let log = transport.clone();
        let mut selector = RandomSelector::seeded(seed);
        driver()
            .connect_with_selector(transport, &prioritized(), &mut selector)
            .await
            .unwrap();
        if log.connect_attempts()[0] == "low:3306" {
            low_first += 1;
        }
    }
    assert!(low_first > 30 && low_first < 110, "low first in {} of 200", low_first);
}

#[tokio::test]
async fn test_transport_reset_after_exhaustion() {
    use connector_wire::testing::Event;

    let transport = ScriptedTransport::new().unreachable("db:3306");
    let log = transport.clone();
    let opts = ConnectOptions::new()
        .set(names::USER_NAME, "app")
        .unwrap()
        .host("db", None);

    assert!(driver().connect(transport, &opts).await.is_err());
    assert_eq!(log.events().last(), Some(&Event::Reset));
}
