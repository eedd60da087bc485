pub mod node;
pub mod ring;
pub mod routing;
pub mod space;
pub mod types;

// Chord configuration
pub const DEFAULT_RING_BITS: u8 = 8;
pub const MAX_RING_BITS: u8 = 32;

// Names used when building experiment rings: node_0, node_1, ...
pub const NODE_NAME_PREFIX: &str = "node_";
pub const KEY_NAME_PREFIX: &str = "key_";

pub fn node_name(index: usize) -> String {
    format!("{}{}", NODE_NAME_PREFIX, index)
}
