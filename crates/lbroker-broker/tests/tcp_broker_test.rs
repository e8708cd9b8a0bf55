//! TCP Broker Integration Tests
//!
//! End-to-end runs of `BrokerServer` on loopback ports with real
//! `RequestClient`s and `Worker`s.

use bytes::Bytes;
use lbroker_broker::{BrokerConfig, BrokerServer, TerminationCause};
use lbroker_client::{RequestClient, Worker};
use lbroker_common::PeerIdentity;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

fn loopback_config() -> BrokerConfig {
    BrokerConfig::default()
        .with_frontend_addr("127.0.0.1:0")
        .with_backend_addr("127.0.0.1:0")
}

/// Spawns a worker that answers every request with `OK` tagged by its name.
async fn spawn_worker(addr: String, name: &'static str) -> tokio::task::JoinHandle<u64> {
    let mut worker = Worker::connect(addr, Some(PeerIdentity::from(name)))
        .await
        .unwrap();
    tokio::spawn(async move {
        worker
            .run(|_| vec![Bytes::from_static(b"OK"), Bytes::from(name)], None)
            .await
            .unwrap()
    })
}

// ============================================================================
// Full Load-Balancing Runs
// ============================================================================

#[tokio::test]
async fn test_thirty_clients_three_workers() {
    let config = loopback_config().with_worker_capacity(3).with_round_trips(30);
    let server = BrokerServer::bind(config).await.unwrap();
    let frontend = server.frontend_addr().to_string();
    let backend = server.backend_addr().to_string();
    let metrics = server.metrics();

    let broker = tokio::spawn(server.run());

    let mut workers = Vec::new();
    for name in ["W1", "W2", "W3"] {
        workers.push(spawn_worker(backend.clone(), name).await);
    }

    let mut clients = Vec::new();
    for i in 0..30 {
        let addr = frontend.clone();
        clients.push(tokio::spawn(async move {
            let identity = PeerIdentity::from(format!("C{}", i));
            let mut client = RequestClient::connect(addr, Some(identity)).await.unwrap();
            client.request(vec![Bytes::from_static(b"HELLO")]).await.unwrap()
        }));
    }

    let mut served_by: HashMap<Bytes, usize> = HashMap::new();
    for client in clients {
        let reply = timeout(WAIT, client).await.unwrap().unwrap();
        assert_eq!(reply[0], Bytes::from_static(b"OK"));
        *served_by.entry(reply[1].clone()).or_default() += 1;
    }

    let outcome = timeout(WAIT, broker).await.unwrap().unwrap().unwrap();
    assert_eq!(outcome.cause, TerminationCause::TargetReached);
    assert_eq!(outcome.round_trips, 30);

    assert_eq!(served_by.values().sum::<usize>(), 30);
    assert!(served_by.len() <= 3);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.round_trips, 30);
    assert_eq!(snapshot.requests_dispatched, 30);
    assert_eq!(snapshot.malformed_dropped, 0);

    // workers see the broker go away and stop on their own
    let mut total = 0;
    for worker in workers {
        total += timeout(WAIT, worker).await.unwrap().unwrap();
    }
    assert_eq!(total, 30);
}

#[tokio::test]
async fn test_single_worker_serves_sequentially() {
    let config = loopback_config().with_worker_capacity(1).with_round_trips(5);
    let server = BrokerServer::bind(config).await.unwrap();
    let frontend = server.frontend_addr().to_string();
    let backend = server.backend_addr().to_string();

    let broker = tokio::spawn(server.run());
    let worker = spawn_worker(backend, "W1").await;

    let mut client = RequestClient::connect(frontend, None).await.unwrap();
    for _ in 0..5 {
        let reply = timeout(WAIT, client.request(vec![Bytes::from_static(b"HELLO")]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply, vec![Bytes::from_static(b"OK"), Bytes::from_static(b"W1")]);
    }

    let outcome = timeout(WAIT, broker).await.unwrap().unwrap().unwrap();
    assert_eq!(outcome.round_trips, 5);
    assert_eq!(timeout(WAIT, worker).await.unwrap().unwrap(), 5);
}

#[tokio::test]
async fn test_requests_queue_until_worker_arrives() {
    let config = loopback_config().with_round_trips(1);
    let server = BrokerServer::bind(config).await.unwrap();
    let frontend = server.frontend_addr().to_string();
    let backend = server.backend_addr().to_string();
    let metrics = server.metrics();

    let broker = tokio::spawn(server.run());

    let request = tokio::spawn(async move {
        let mut client = RequestClient::connect(frontend, None).await.unwrap();
        client.request(vec![Bytes::from_static(b"HELLO")]).await.unwrap()
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(metrics.requests_received(), 0);

    let _worker = spawn_worker(backend, "late").await;
    let reply = timeout(WAIT, request).await.unwrap().unwrap();
    assert_eq!(reply[0], Bytes::from_static(b"OK"));

    timeout(WAIT, broker).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_signal_stops_server() {
    let server = BrokerServer::bind(loopback_config()).await.unwrap();
    let backend = server.backend_addr().to_string();
    let metrics = server.metrics();

    let (stop, stopped) = oneshot::channel::<()>();
    let broker = tokio::spawn(server.run_until(async {
        let _ = stopped.await;
    }));

    let worker = spawn_worker(backend, "W1").await;
    for _ in 0..200 {
        if metrics.idle_workers() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(metrics.idle_workers(), 1);

    stop.send(()).unwrap();
    let outcome = timeout(WAIT, broker).await.unwrap().unwrap().unwrap();
    assert_eq!(outcome.cause, TerminationCause::Shutdown);
    assert_eq!(outcome.round_trips, 0);

    assert_eq!(timeout(WAIT, worker).await.unwrap().unwrap(), 0);
}

#[tokio::test]
async fn test_bind_rejects_invalid_config() {
    let result = BrokerServer::bind(loopback_config().with_worker_capacity(0)).await;
    assert!(result.is_err());
}
