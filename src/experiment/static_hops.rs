//! In-process hop statistics over a freshly built ring.

use crate::chord::ring::RingBuilder;
use crate::chord::routing::{LookupStrategy, Strategy};
use crate::chord::space::IdentifierSpace;
use crate::chord::types::HopCount;
use crate::chord::{DEFAULT_RING_BITS, KEY_NAME_PREFIX};
use crate::error::ChordError;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Where lookup keys come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeySource {
    /// `key_0`, `key_1`, ...
    #[default]
    Sequential,
    /// Random key names drawn from a seeded generator.
    Random { seed: u64 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StaticHopsConfig {
    pub nodes: usize,
    pub keys: usize,
    pub strategy: Strategy,
    pub bits: u8,
    pub key_source: KeySource,
}

impl Default for StaticHopsConfig {
    fn default() -> Self {
        Self {
            nodes: 50,
            keys: 100,
            strategy: Strategy::Naive,
            bits: DEFAULT_RING_BITS,
            key_source: KeySource::Sequential,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HopStats {
    /// Distinct nodes in the built ring, after digest collisions.
    pub ring_size: usize,
    pub samples: usize,
    pub mean: f64,
    pub max: HopCount,
}

pub fn generate_keys(count: usize, source: KeySource) -> Vec<String> {
    match source {
        KeySource::Sequential => (0..count)
            .map(|i| format!("{}{}", KEY_NAME_PREFIX, i))
            .collect(),
        KeySource::Random { seed } => {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..count)
                .map(|_| format!("{}{:016x}", KEY_NAME_PREFIX, rng.random::<u64>()))
                .collect()
        }
    }
}

/// Mean hop count of looking up every generated key from the first ring node.
pub fn run_static_hops(config: &StaticHopsConfig) -> Result<f64, ChordError> {
    run_static_hops_detailed(config).map(|stats| stats.mean)
}

pub fn run_static_hops_detailed(config: &StaticHopsConfig) -> Result<HopStats, ChordError> {
    let space = IdentifierSpace::with_bits(config.bits)?;
    let ring = RingBuilder::new(space).build_numbered(config.nodes)?;
    let keys = generate_keys(config.keys, config.key_source);

    let start = 0;
    let mut total: u64 = 0;
    let mut max: HopCount = 0;
    for key in &keys {
        let found = config
            .strategy
            .find_successor(&ring, start, space.hash(key))?;
        total += u64::from(found.hops);
        max = max.max(found.hops);
    }

    let mean = if keys.is_empty() {
        0.0
    } else {
        total as f64 / keys.len() as f64
    };
    info!(
        "Average hops with {} nodes ({} distinct) using {} routing is {}",
        config.nodes,
        ring.len(),
        config.strategy,
        mean
    );
    Ok(HopStats {
        ring_size: ring.len(),
        samples: keys.len(),
        mean,
        max,
    })
}
