use crate::chord::ring::Ring;
use crate::chord::types::{Identity, RoutingInfo};
use crate::error::{ChordalError, ConfigError};
use crate::network::peer::{peer_routes, ChordPeer};
use crate::network::transport::Transport;
use crate::network::TransportConfig;
use futures::future::join_all;
use log::{error, info};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Every node of a static ring served as a live peer on one host.
pub struct LocalRing {
    peers: Vec<RoutingInfo>,
    shutdowns: Vec<oneshot::Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl LocalRing {
    /// Binds one endpoint per ring node, then starts serving. With
    /// `base_port == 0` every peer gets an ephemeral port, otherwise node `i`
    /// listens on `base_port + i`.
    pub async fn launch(
        ring: &Ring,
        host: &str,
        base_port: u16,
        config: TransportConfig,
    ) -> Result<Self, ChordalError> {
        let ports = (0..ring.len())
            .map(|i| peer_port(base_port, i))
            .collect::<Result<Vec<u16>, ConfigError>>()?;

        // All endpoints must be bound before any route table can name them.
        let mut transports = Vec::with_capacity(ring.len());
        for (node, port) in ring.nodes().iter().zip(ports) {
            let transport = Transport::bind(
                Identity::from_digest(node.digest()),
                &format!("{}:{}", host, port),
                config.clone(),
            )
            .await?;
            transports.push(transport);
        }
        let addresses: Vec<String> = transports.iter().map(Transport::address).collect();
        let routes = peer_routes(ring, &addresses)?;

        let mut peers = Vec::with_capacity(ring.len());
        let mut shutdowns = Vec::with_capacity(ring.len());
        let mut handles = Vec::with_capacity(ring.len());
        for (transport, route) in transports.into_iter().zip(routes) {
            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            peers.push(route.me.clone());
            let peer = ChordPeer::new(transport, *ring.space(), route, ring.len());
            handles.push(tokio::spawn(peer.run(shutdown_rx)));
            shutdowns.push(shutdown_tx);
        }

        info!("Launched {} peers on {}", peers.len(), host);
        Ok(Self {
            peers,
            shutdowns,
            handles,
        })
    }

    /// Routing info of each peer, in ring construction order.
    pub fn peers(&self) -> &[RoutingInfo] {
        &self.peers
    }

    pub fn peer(&self, index: usize) -> Option<&RoutingInfo> {
        self.peers.get(index)
    }

    pub async fn shutdown(self) {
        for shutdown in self.shutdowns {
            let _ = shutdown.send(());
        }
        for result in join_all(self.handles).await {
            if let Err(e) = result {
                error!("Peer task failed: {}", e);
            }
        }
    }
}

/// Port of the `index`-th peer: ephemeral when `base_port` is 0.
fn peer_port(base_port: u16, index: usize) -> Result<u16, ConfigError> {
    if base_port == 0 {
        return Ok(0);
    }
    u16::try_from(index)
        .ok()
        .and_then(|offset| base_port.checked_add(offset))
        .ok_or_else(|| {
            ConfigError::InvalidAddress(format!(
                "peer {} does not fit above base port {}",
                index, base_port
            ))
        })
}
