use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the ring, always in [0, 2^m) for the ring width m in use.
pub type Digest = u64;

/// Number of node-to-node steps taken by a lookup.
pub type HopCount = u32;

/// Position of a node inside a built [`Ring`](crate::chord::ring::Ring).
pub type NodeIndex = usize;

/// Endpoint identity carried in the routing prefix of every envelope.
///
/// Packed as 4 little-endian bytes on the wire.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(pub u32);

impl Identity {
    pub const WIRE_SIZE: usize = 4;

    pub fn to_bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Identity(u32::from_le_bytes(bytes))
    }

    /// Identity of a ring member, derived from its digest.
    pub fn from_digest(digest: Digest) -> Self {
        Identity(digest as u32)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({}, 0x{})", self.0, hex::encode(self.to_bytes()))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network-addressable identity record exchanged during live lookups.
///
/// An empty `address` is the "no answer" sentinel, see [`RoutingInfo::empty`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingInfo {
    pub address: String,
    pub digest: Digest,
    /// Reserved metadata. Peers set it to their own digest when forwarding.
    pub parent_digest: Digest,
}

impl RoutingInfo {
    pub fn new(address: impl Into<String>, digest: Digest) -> Self {
        Self {
            address: address.into(),
            digest,
            parent_digest: digest,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.address.is_empty()
    }

    pub fn identity(&self) -> Identity {
        Identity::from_digest(self.digest)
    }
}

impl fmt::Display for RoutingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "<no answer>")
        } else {
            write!(f, "{}@{}", self.digest, self.address)
        }
    }
}

/// Request to resolve `search_digest`, addressed to `recipient`, with the
/// reply going straight back to `initiator`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindSuccessorCommand {
    pub request_id: u64,
    pub initiator: RoutingInfo,
    pub recipient: RoutingInfo,
    pub search_digest: Digest,
    pub hops: HopCount,
}

impl FindSuccessorCommand {
    pub fn new(
        request_id: u64,
        initiator: RoutingInfo,
        recipient: RoutingInfo,
        search_digest: Digest,
    ) -> Self {
        Self {
            request_id,
            initiator,
            recipient,
            search_digest,
            hops: 0,
        }
    }

    /// The same command re-addressed to the next hop.
    pub fn forward_to(&self, next: RoutingInfo, parent_digest: Digest) -> Self {
        let mut recipient = next;
        recipient.parent_digest = parent_digest;
        Self {
            request_id: self.request_id,
            initiator: self.initiator.clone(),
            recipient,
            search_digest: self.search_digest,
            hops: self.hops + 1,
        }
    }
}

/// Answer to a [`FindSuccessorCommand`], sent to the initiator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessorResponse {
    pub request_id: u64,
    pub search_digest: Digest,
    pub successor: RoutingInfo,
    pub hops: HopCount,
}
