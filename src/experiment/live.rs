//! Timed lookup rounds against a live ring.
//!
//! Each round spawns the response wait, sends one FindSuccessor command to
//! the bootstrap peer and blocks until the answer or the timeout. Rounds never
//! overlap and a missed round is not retried.

use crate::chord::space::IdentifierSpace;
use crate::chord::types::{Digest, FindSuccessorCommand, Identity, RoutingInfo};
use crate::chord::DEFAULT_RING_BITS;
use crate::error::{ChordError, ChordalError, ConfigError};
use crate::experiment::metrics::SessionMetrics;
use crate::experiment::round_log::{RoundLog, RoundRecord};
use crate::network::transport::Transport;
use crate::network::{
    outbound_host, validate_host, TransportConfig, DEFAULT_PORT, DEFAULT_RESPONSE_TIMEOUT,
};
use chrono::{NaiveTime, Timelike};
use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_IDENTITY: u32 = 256;
pub const DEFAULT_BOOTSTRAP_IDENTITY: u32 = 1;
const PROGRESS_EVERY: u64 = 100;

/// Parses a runtime written as `HH:MM:SS,ffffff`. The fraction may have one
/// to six digits.
pub fn parse_runtime(value: &str) -> Result<Duration, ConfigError> {
    let padded = match value.split_once(',') {
        Some((clock, fraction)) if (1..6).contains(&fraction.len()) => {
            format!("{},{:0<6}", clock, fraction)
        }
        _ => value.to_string(),
    };
    let time = NaiveTime::parse_from_str(&padded, "%H:%M:%S,%6f")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|source| ConfigError::InvalidRuntime {
            value: value.to_string(),
            source,
        })?;
    Ok(Duration::new(
        u64::from(time.num_seconds_from_midnight()),
        time.nanosecond(),
    ))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Endpoint of the peer every round is sent to.
    pub bootstrap: String,
    pub bootstrap_identity: u32,
    /// This endpoint's identity; replies are routed to it.
    pub identity: u32,
    pub listen_host: String,
    pub listen_port: String,
    pub runtime: Duration,
    /// Fixed target digest; a fresh random digest per round when `None`.
    pub search: Option<Digest>,
    pub bits: u8,
    pub response_timeout: Duration,
    /// Pause before each round.
    pub round_delay: Duration,
    pub transport: TransportConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bootstrap: String::new(),
            bootstrap_identity: DEFAULT_BOOTSTRAP_IDENTITY,
            identity: DEFAULT_IDENTITY,
            listen_host: "0.0.0.0".to_string(),
            listen_port: DEFAULT_PORT.to_string(),
            runtime: Duration::from_secs(60),
            search: None,
            bits: DEFAULT_RING_BITS,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            round_delay: Duration::ZERO,
            transport: TransportConfig::default(),
        }
    }
}

/// Summary printed at the end of a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SessionReport {
    pub rounds: u64,
    pub answered: u64,
    pub missed: u64,
    pub mean_round_trip_secs: Option<f64>,
    pub average_session: Option<f64>,
    #[serde(skip)]
    total_round_trip: Duration,
}

impl SessionReport {
    fn record(&mut self, record: &RoundRecord) {
        self.rounds += 1;
        match record.round_trip {
            Some(rtt) if !record.is_miss() => {
                self.answered += 1;
                self.total_round_trip += rtt;
                self.mean_round_trip_secs =
                    Some(self.total_round_trip.as_secs_f64() / self.answered as f64);
            }
            _ => self.missed += 1,
        }
    }
}

pub struct LiveSession {
    config: SessionConfig,
    space: IdentifierSpace,
    transport: Transport,
    me: RoutingInfo,
    bootstrap: RoutingInfo,
    metrics: Option<Arc<dyn SessionMetrics>>,
    next_request_id: u64,
}

impl LiveSession {
    /// Binds the local endpoint. A bind failure aborts before any round runs.
    ///
    /// Replies are routed to the advertised host. When none is configured and
    /// the session listens on a wildcard address, the host's outbound address
    /// is advertised.
    pub async fn bind(mut config: SessionConfig) -> Result<Self, ChordalError> {
        validate_host(&config.listen_host)?;
        match config.transport.advertise_host.as_deref() {
            Some(host) => validate_host(host)?,
            None => {
                let wildcard = config
                    .listen_host
                    .parse::<IpAddr>()
                    .map(|ip| ip.is_unspecified())
                    .unwrap_or(false);
                if wildcard {
                    config.transport.advertise_host = Some(outbound_host().await);
                }
            }
        }

        let listen = format!("{}:{}", config.listen_host, config.listen_port);
        let transport =
            Transport::bind(Identity(config.identity), &listen, config.transport.clone()).await?;
        Self::new(config, transport)
    }

    pub fn new(config: SessionConfig, transport: Transport) -> Result<Self, ChordalError> {
        let space = IdentifierSpace::with_bits(config.bits)?;
        if let Some(search) = config.search {
            if !space.contains(search) {
                return Err(ChordError::OutOfRange {
                    target: search,
                    size: space.size(),
                }
                .into());
            }
        }

        let me = transport.routing_info();
        let bootstrap = RoutingInfo::new(
            config.bootstrap.clone(),
            Digest::from(config.bootstrap_identity),
        );
        Ok(Self {
            config,
            space,
            transport,
            me,
            bootstrap,
            metrics: None,
            next_request_id: 1,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn SessionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn routing_info(&self) -> &RoutingInfo {
        &self.me
    }

    fn pick_target(&self) -> Digest {
        match self.config.search {
            Some(search) => search,
            None => rand::rng().random_range(0..self.space.size()),
        }
    }

    /// One bounded round trip for `target`.
    pub async fn run_round(&mut self, target: Digest) -> RoundRecord {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let command =
            FindSuccessorCommand::new(request_id, self.me.clone(), self.bootstrap.clone(), target);

        // Start listening for the answer before the request can be answered.
        let pending = self
            .transport
            .spawn_wait(request_id, self.config.response_timeout)
            .await;

        let started = Instant::now();
        if let Err(e) = self
            .transport
            .send_find_successor(&command, &self.bootstrap.address)
            .await
        {
            warn!("Failed to send request {} to {}: {}", request_id, self.bootstrap.address, e);
        }
        let resolved = pending.resolve().await;
        let elapsed = started.elapsed();

        let round_trip = if resolved.is_empty() { None } else { Some(elapsed) };
        RoundRecord {
            search_digest: target,
            resolved,
            round_trip,
        }
    }

    /// Runs rounds until the configured runtime has passed. The deadline is
    /// checked between rounds, so the last round may overrun by one timeout.
    pub async fn run<W: Write>(
        &mut self,
        log: &mut RoundLog<W>,
    ) -> Result<SessionReport, ChordalError> {
        let runtime = self.config.runtime;
        let started = Instant::now();
        let deadline = started + runtime;
        let mut report = SessionReport::default();

        info!(
            "Running lookups against {} for {:?}",
            self.bootstrap.address, runtime
        );
        while Instant::now() < deadline {
            if report.rounds % PROGRESS_EVERY == 0 {
                info!(
                    "Elapsed time: {:.1} of {} seconds",
                    started.elapsed().as_secs_f64(),
                    runtime.as_secs_f64()
                );
            }
            if !self.config.round_delay.is_zero() {
                tokio::time::sleep(self.config.round_delay).await;
            }

            let target = self.pick_target();
            let record = self.run_round(target).await;
            log.append(&record)?;
            report.record(&record);
        }
        info!(
            "Finished {} rounds, {} answered, {} missed",
            report.rounds, report.answered, report.missed
        );

        if let Some(metrics) = &self.metrics {
            match metrics.average_session(runtime).await {
                Ok(average) => {
                    info!("Average session time: {}", average);
                    report.average_session = Some(average);
                }
                Err(e) => warn!("Could not fetch average session time: {}", e),
            }
        }
        Ok(report)
    }

    pub async fn shutdown(self) {
        self.transport.shutdown().await;
    }
}
