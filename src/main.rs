use chordal::{
    chord::{
        ring::RingBuilder,
        routing::Strategy,
        space::{HashFunction, IdentifierSpace},
        types::Digest,
        DEFAULT_RING_BITS,
    },
    experiment::{
        live::{
            parse_runtime, LiveSession, SessionConfig, DEFAULT_BOOTSTRAP_IDENTITY,
            DEFAULT_IDENTITY,
        },
        round_log::RoundLog,
        static_hops::{run_static_hops_detailed, KeySource, StaticHopsConfig},
    },
    network::{cluster::LocalRing, TransportConfig, DEFAULT_HOST, DEFAULT_PORT},
};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "chordal")]
#[command(about = "Chord finger-table routing over a static ring")]
struct Cli {
    /// Log debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Time lookups against a live ring through its bootstrap peer
    #[command(name = "request")]
    Request {
        /// Endpoint of the bootstrap peer, e.g. tcp://10.0.0.5:7000
        bootstrap_endpoint: String,
        /// How long to keep issuing rounds, as HH:MM:SS,ffffff
        runtime: String,
        /// Fixed target digest (random per round if not specified)
        #[arg(long = "search")]
        search: Option<Digest>,
        /// This endpoint's identity
        #[arg(long = "id", default_value_t = DEFAULT_IDENTITY)]
        id: u32,
        /// Local listen port
        #[arg(long = "port", default_value = DEFAULT_PORT)]
        port: String,
        /// Local listen host
        #[arg(long = "host", default_value = "0.0.0.0")]
        host: String,
        /// Host the bootstrap peer should answer to (outbound interface if not specified)
        #[arg(long = "advertise")]
        advertise: Option<String>,
        /// Identity of the bootstrap peer
        #[arg(long = "bootstrap-id", default_value_t = DEFAULT_BOOTSTRAP_IDENTITY)]
        bootstrap_id: u32,
        /// Ring width in bits
        #[arg(long = "bits", default_value_t = DEFAULT_RING_BITS)]
        bits: u8,
        /// Where round records are written
        #[arg(short = 'o', long = "output", default_value = "times.csv")]
        output: PathBuf,
        /// Per-round response timeout in milliseconds
        #[arg(long = "timeout-ms", default_value_t = 2000)]
        timeout_ms: u64,
        /// Pause before each round in milliseconds
        #[arg(long = "round-delay-ms", default_value_t = 0)]
        round_delay_ms: u64,
    },
    /// Serve a static ring of live peers on one host
    #[command(name = "serve-ring")]
    ServeRing {
        /// Number of node names (node_0 .. node_{n-1}) to place on the ring
        #[arg(short = 'n', long = "nodes", default_value_t = 10)]
        nodes: usize,
        /// Host to bind and advertise
        #[arg(long = "host", default_value = DEFAULT_HOST)]
        host: String,
        /// First port; node i listens on base + i (random ports if 0)
        #[arg(short = 'p', long = "base-port", default_value_t = 0)]
        base_port: u16,
        /// Ring width in bits
        #[arg(long = "bits", default_value_t = DEFAULT_RING_BITS)]
        bits: u8,
        /// Hash names with SHA-256 instead of MD5
        #[arg(long = "sha256")]
        sha256: bool,
    },
    /// Measure average lookup hops on an in-process ring
    #[command(name = "hops")]
    Hops {
        #[arg(short = 'n', long = "nodes", default_value_t = 50)]
        nodes: usize,
        #[arg(short = 'k', long = "keys", default_value_t = 100)]
        keys: usize,
        /// Lookup strategy: naive or finger
        #[arg(short = 's', long = "strategy", default_value = "naive")]
        strategy: Strategy,
        /// Ring width in bits
        #[arg(long = "bits", default_value_t = DEFAULT_RING_BITS)]
        bits: u8,
        /// Sample random keys from this seed instead of key_0 .. key_{k-1}
        #[arg(long = "random-keys")]
        random_keys: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();

    // Initialize logging with timestamp
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    match cli.command {
        Commands::Request {
            bootstrap_endpoint,
            runtime,
            search,
            id,
            port,
            host,
            advertise,
            bootstrap_id,
            bits,
            output,
            timeout_ms,
            round_delay_ms,
        } => {
            let runtime = parse_runtime(&runtime).map_err(|e| e.to_string())?;
            let config = SessionConfig {
                bootstrap: bootstrap_endpoint,
                bootstrap_identity: bootstrap_id,
                identity: id,
                listen_host: host,
                listen_port: port,
                runtime,
                search,
                bits,
                response_timeout: Duration::from_millis(timeout_ms),
                round_delay: Duration::from_millis(round_delay_ms),
                transport: TransportConfig {
                    advertise_host: advertise,
                    ..Default::default()
                },
                ..Default::default()
            };

            let mut session = LiveSession::bind(config)
                .await
                .map_err(|e| format!("Failed to start session: {}", e))?;
            info!("Session endpoint is {}", session.routing_info());

            let mut log = RoundLog::create(&output)
                .map_err(|e| format!("Failed to open {}: {}", output.display(), e))?;
            let report = session.run(&mut log).await.map_err(|e| {
                error!("Session failed: {}", e);
                format!("Session failed: {}", e)
            })?;
            session.shutdown().await;

            let summary = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
            println!("{}", summary);
            Ok(())
        }
        Commands::ServeRing {
            nodes,
            host,
            base_port,
            bits,
            sha256,
        } => {
            let hash = if sha256 { HashFunction::Sha256 } else { HashFunction::Md5 };
            let space = IdentifierSpace::new(bits, hash).map_err(|e| e.to_string())?;
            let ring = RingBuilder::new(space)
                .build_numbered(nodes)
                .map_err(|e| format!("Failed to build ring: {}", e))?;

            let cluster = LocalRing::launch(&ring, &host, base_port, TransportConfig::default())
                .await
                .map_err(|e| format!("Failed to launch ring: {}", e))?;

            for (node, peer) in ring.nodes().iter().zip(cluster.peers()) {
                info!("{} digest={} address={}", node.name(), peer.digest, peer.address);
            }
            info!(
                "Query with: chordal request tcp://{} <HH:MM:SS,ffffff> --bootstrap-id {}",
                cluster.peers()[0].address,
                cluster.peers()[0].digest
            );

            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down ring...");
            cluster.shutdown().await;
            Ok(())
        }
        Commands::Hops {
            nodes,
            keys,
            strategy,
            bits,
            random_keys,
        } => {
            let config = StaticHopsConfig {
                nodes,
                keys,
                strategy,
                bits,
                key_source: random_keys
                    .map(|seed| KeySource::Random { seed })
                    .unwrap_or(KeySource::Sequential),
            };
            let stats = run_static_hops_detailed(&config).map_err(|e| e.to_string())?;
            let summary = serde_json::to_string_pretty(&stats).map_err(|e| e.to_string())?;
            println!("{}", summary);
            Ok(())
        }
    }
}
