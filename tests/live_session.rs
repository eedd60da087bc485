use async_trait::async_trait;
use chordal::chord::ring::{Ring, RingBuilder};
use chordal::chord::routing::{FingerTableLookup, LookupStrategy};
use chordal::chord::space::IdentifierSpace;
use chordal::chord::types::{Identity, RoutingInfo};
use chordal::error::{ChordalError, ConfigError, MetricsError};
use chordal::experiment::live::{LiveSession, SessionConfig};
use chordal::experiment::metrics::SessionMetrics;
use chordal::experiment::round_log::RoundLog;
use chordal::network::cluster::LocalRing;
use chordal::network::transport::Transport;
use chordal::network::{outbound_host, TransportConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_millis(500);

fn ten_node_ring() -> Ring {
    RingBuilder::new(IdentifierSpace::default())
        .build_numbered(10)
        .unwrap()
}

async fn session_against(bootstrap: &RoutingInfo, search: Option<u64>) -> LiveSession {
    let config = SessionConfig {
        bootstrap: format!("tcp://{}", bootstrap.address),
        bootstrap_identity: bootstrap.digest as u32,
        search,
        response_timeout: TIMEOUT,
        ..Default::default()
    };
    let transport = Transport::bind(
        Identity(config.identity),
        "127.0.0.1:0",
        TransportConfig::default(),
    )
    .await
    .unwrap();
    LiveSession::new(config, transport).unwrap()
}

#[tokio::test]
async fn bootstrap_answers_for_its_own_digest() {
    let ring = ten_node_ring();
    let cluster = LocalRing::launch(&ring, "127.0.0.1", 0, TransportConfig::default())
        .await
        .unwrap();
    let bootstrap = cluster.peer(0).unwrap().clone();
    assert_eq!(bootstrap.digest, 24);

    let mut session = session_against(&bootstrap, Some(24)).await;
    let record = session.run_round(24).await;

    assert_eq!(record.resolved, bootstrap);
    assert!(record.round_trip.unwrap() < TIMEOUT);

    session.shutdown().await;
    cluster.shutdown().await;
}

#[tokio::test]
async fn live_lookups_agree_with_the_in_process_ring() {
    let ring = ten_node_ring();
    let cluster = LocalRing::launch(&ring, "127.0.0.1", 0, TransportConfig::default())
        .await
        .unwrap();
    let bootstrap = cluster.peer(0).unwrap().clone();
    let mut session = session_against(&bootstrap, None).await;

    for target in [0, 25, 32, 100, 150, 160, 200, 243, 250, 255] {
        let expected = FingerTableLookup.find_successor(&ring, 0, target).unwrap();
        let record = session.run_round(target).await;
        assert_eq!(record.resolved, cluster.peers()[expected.owner], "target {}", target);
        assert!(record.round_trip.is_some());
    }

    session.shutdown().await;
    cluster.shutdown().await;
}

#[tokio::test]
async fn unreachable_bootstrap_times_out_with_the_sentinel() {
    // Bind and release a port so nothing listens on it.
    let closed = {
        let probe = Transport::bind(Identity(1), "127.0.0.1:0", TransportConfig::default())
            .await
            .unwrap();
        let info = probe.routing_info();
        probe.shutdown().await;
        info
    };

    let mut session = session_against(&closed, Some(10)).await;
    let started = Instant::now();
    let record = session.run_round(10).await;
    let elapsed = started.elapsed();

    assert!(record.is_miss());
    assert_eq!(record.resolved, RoutingInfo::empty());
    assert!(record.round_trip.is_none());
    assert!(elapsed >= TIMEOUT);
    assert!(elapsed < TIMEOUT + Duration::from_secs(1));
    assert_eq!(record.to_csv_line(), "10,0,,");

    session.shutdown().await;
}

#[tokio::test]
async fn wrong_bootstrap_identity_is_a_miss() {
    let ring = ten_node_ring();
    let cluster = LocalRing::launch(&ring, "127.0.0.1", 0, TransportConfig::default())
        .await
        .unwrap();
    let mut bootstrap = cluster.peer(0).unwrap().clone();
    bootstrap.digest = 1;

    let mut session = session_against(&bootstrap, None).await;
    assert!(session.run_round(150).await.is_miss());

    session.shutdown().await;
    cluster.shutdown().await;
}

#[tokio::test]
async fn wildcard_session_advertises_the_configured_host() {
    let config = SessionConfig {
        listen_host: "0.0.0.0".to_string(),
        listen_port: "0".to_string(),
        transport: TransportConfig {
            advertise_host: Some("192.0.2.7".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let session = LiveSession::bind(config).await.unwrap();
    let address = session.routing_info().address.clone();
    assert!(address.starts_with("192.0.2.7:"), "{}", address);
    session.shutdown().await;
}

#[tokio::test]
async fn wildcard_session_defaults_to_the_outbound_host() {
    let config = SessionConfig {
        listen_port: "0".to_string(),
        ..Default::default()
    };
    let session = LiveSession::bind(config).await.unwrap();
    let address = session.routing_info().address.clone();
    assert!(!address.starts_with("0.0.0.0"));
    assert!(address.starts_with(&format!("{}:", outbound_host().await)), "{}", address);
    session.shutdown().await;
}

#[tokio::test]
async fn advertised_host_must_not_carry_a_port() {
    let config = SessionConfig {
        listen_port: "0".to_string(),
        transport: TransportConfig {
            advertise_host: Some("10.0.0.5:7000".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(
        LiveSession::bind(config).await,
        Err(ChordalError::Config(ConfigError::InvalidAddress(_)))
    ));
}

struct FixedMetrics(f64);

#[async_trait]
impl SessionMetrics for FixedMetrics {
    async fn average_session(&self, _runtime: Duration) -> Result<f64, MetricsError> {
        Ok(self.0)
    }
}

#[tokio::test]
async fn session_logs_every_round_until_the_deadline() {
    let ring = ten_node_ring();
    let cluster = LocalRing::launch(&ring, "127.0.0.1", 0, TransportConfig::default())
        .await
        .unwrap();
    let bootstrap = cluster.peer(3).unwrap().clone();

    let config = SessionConfig {
        bootstrap: bootstrap.address.clone(),
        bootstrap_identity: bootstrap.digest as u32,
        runtime: Duration::from_millis(300),
        response_timeout: TIMEOUT,
        round_delay: Duration::from_millis(10),
        listen_host: "127.0.0.1".to_string(),
        listen_port: "0".to_string(),
        ..Default::default()
    };
    let mut session = LiveSession::bind(config)
        .await
        .unwrap()
        .with_metrics(Arc::new(FixedMetrics(42.5)));

    let mut log = RoundLog::new(Vec::new());
    let started = Instant::now();
    let report = session.run(&mut log).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(300) + TIMEOUT + Duration::from_secs(1));

    assert!(report.rounds > 0);
    assert_eq!(report.rounds, report.answered + report.missed);
    assert_eq!(report.missed, 0);
    assert_eq!(report.average_session, Some(42.5));
    assert_eq!(log.lines() as u64, report.rounds);

    let text = String::from_utf8(log.into_inner()).unwrap();
    let addresses: Vec<&str> = cluster.peers().iter().map(|p| p.address.as_str()).collect();
    for line in text.lines() {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 4, "{}", line);
        let search: u64 = fields[0].parse().unwrap();
        assert!(search < 256);
        assert!(addresses.contains(&fields[2]));
        assert!(fields[3].parse::<f64>().unwrap() > 0.0);
    }

    session.shutdown().await;
    cluster.shutdown().await;
}
