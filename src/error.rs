use crate::chord::types::{Digest, HopCount};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChordalError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Chord protocol error: {0}")]
    Chord(#[from] ChordError),

    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Peer unreachable: {0}")]
    PeerUnreachable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Message(#[from] MessageError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChordError {
    #[error("A ring needs at least 2 distinct digests, found {0}")]
    InsufficientNodes(usize),

    #[error("Digest {target} is outside the ring [0, {size})")]
    OutOfRange { target: Digest, size: u64 },

    #[error("Invalid ring: {0}")]
    InvalidRing(String),

    #[error("Lookup for {target} exceeded the hop ceiling of {ceiling}")]
    RoutingLoop { target: Digest, ceiling: HopCount },

    #[error("Ring width must be between 1 and 32 bits, got {0}")]
    InvalidRingWidth(u8),
}

#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Failed to serialize message: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize message: {0}")]
    DeserializationFailed(#[from] prost::DecodeError),

    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported wire version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid runtime {value:?}, expected HH:MM:SS,ffffff: {source}")]
    InvalidRuntime {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Metrics source unavailable: {0}")]
    Unavailable(String),
}
