use crate::chord::ring::Ring;
use crate::chord::space::IdentifierSpace;
use crate::chord::types::{
    Digest, FindSuccessorCommand, HopCount, NodeIndex, RoutingInfo, SuccessorResponse,
};
use crate::error::ChordError;
use crate::network::messages::Message;
use crate::network::transport::Transport;
use log::{debug, info, warn};
use tokio::sync::oneshot;

/// What a live ring member knows about its neighbourhood.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerRoute {
    pub me: RoutingInfo,
    pub successor: RoutingInfo,
    pub fingers: Vec<RoutingInfo>,
}

/// Outcome of routing one command at one peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NextStep {
    Answer(RoutingInfo),
    Forward(RoutingInfo),
}

impl PeerRoute {
    /// Route table of the node at `index`, with `addresses[i]` the endpoint of
    /// ring node `i`.
    pub fn from_ring(
        ring: &Ring,
        index: NodeIndex,
        addresses: &[String],
    ) -> Result<Self, ChordError> {
        if addresses.len() != ring.len() {
            return Err(ChordError::InvalidRing(format!(
                "{} addresses for {} nodes",
                addresses.len(),
                ring.len()
            )));
        }
        let info =
            |i: NodeIndex| RoutingInfo::new(addresses[i].clone(), ring.nodes()[i].digest());
        let node = ring
            .node(index)
            .ok_or_else(|| ChordError::InvalidRing(format!("no node at index {}", index)))?;

        Ok(Self {
            me: info(index),
            successor: info(ring.successor_of(index)?),
            fingers: node.fingers().iter().map(|&finger| info(finger)).collect(),
        })
    }

    /// One finger-table routing step toward `target`, taken with local state only.
    pub fn next_step(&self, space: &IdentifierSpace, target: Digest) -> NextStep {
        let here = self.me.digest;
        if target == here {
            return NextStep::Answer(self.me.clone());
        }
        if space.in_interval(target, here, self.successor.digest) {
            return NextStep::Answer(self.successor.clone());
        }
        let closest = space.closest_preceding(here, target, self.fingers.as_slice(), |finger| {
            Some(finger.digest)
        });
        NextStep::Forward(closest.unwrap_or(&self.successor).clone())
    }
}

/// A ring member answering FindSuccessor commands over a [`Transport`].
pub struct ChordPeer {
    space: IdentifierSpace,
    route: PeerRoute,
    hop_ceiling: HopCount,
    transport: Transport,
}

impl ChordPeer {
    pub fn new(
        transport: Transport,
        space: IdentifierSpace,
        route: PeerRoute,
        ring_size: usize,
    ) -> Self {
        Self {
            hop_ceiling: HopCount::from(space.bits()).min(ring_size as HopCount),
            space,
            route,
            transport,
        }
    }

    pub fn routing_info(&self) -> &RoutingInfo {
        &self.route.me
    }

    /// Serves commands until `shutdown` fires or the transport closes.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        info!("Peer {} serving lookups", self.route.me);
        loop {
            tokio::select! {
                envelope = self.transport.recv() => match envelope {
                    Some(envelope) => match envelope.message {
                        Message::FindSuccessor(command) => {
                            self.handle_find_successor(command).await
                        }
                        Message::Successor(response) => {
                            debug!(
                                "Peer {} ignoring response to request {}",
                                self.route.me, response.request_id
                            );
                        }
                    },
                    None => break,
                },
                _ = &mut shutdown => break,
            }
        }
        info!("Peer {} stopped", self.route.me);
        self.transport.shutdown().await;
    }

    async fn handle_find_successor(&self, command: FindSuccessorCommand) {
        let target = command.search_digest;
        if !self.space.contains(target) {
            warn!("{}", ChordError::OutOfRange { target, size: self.space.size() });
            return;
        }
        if command.hops > self.hop_ceiling {
            warn!(
                "{}",
                ChordError::RoutingLoop {
                    target,
                    ceiling: self.hop_ceiling
                }
            );
            return;
        }

        match self.route.next_step(&self.space, target) {
            NextStep::Answer(successor) => {
                debug!(
                    "Peer {} resolved {} to {} after {} hops",
                    self.route.me.digest, target, successor, command.hops
                );
                let response = SuccessorResponse {
                    request_id: command.request_id,
                    search_digest: target,
                    successor,
                    hops: command.hops,
                };
                if let Err(e) = self.transport.send_response(&response, &command.initiator).await {
                    warn!("Failed to answer {}: {}", command.initiator, e);
                }
            }
            NextStep::Forward(next) => {
                let forwarded = command.forward_to(next.clone(), self.route.me.digest);
                if let Err(e) = self
                    .transport
                    .send_find_successor(&forwarded, &next.address)
                    .await
                {
                    warn!("Failed to forward lookup for {} to {}: {}", target, next, e);
                }
            }
        }
    }
}

/// Route tables for every node of `ring`.
pub fn peer_routes(ring: &Ring, addresses: &[String]) -> Result<Vec<PeerRoute>, ChordError> {
    (0..ring.len())
        .map(|index| PeerRoute::from_ring(ring, index, addresses))
        .collect()
}
