//! Successor lookup over a built ring.
//!
//! Two strategies resolve the same owner for every target: [`NaiveLookup`]
//! walks the successor chain one node at a time, [`FingerTableLookup`] jumps
//! through the finger tables. Only their hop counts differ.

use crate::chord::ring::Ring;
use crate::chord::types::{Digest, HopCount, NodeIndex};
use crate::error::ChordError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Result of a lookup: the node owning the target and the steps taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lookup {
    pub owner: NodeIndex,
    pub hops: HopCount,
}

pub trait LookupStrategy {
    fn find_successor(
        &self,
        ring: &Ring,
        start: NodeIndex,
        target: Digest,
    ) -> Result<Lookup, ChordError>;
}

fn check_target(ring: &Ring, target: Digest) -> Result<(), ChordError> {
    if ring.space().contains(target) {
        Ok(())
    } else {
        Err(ChordError::OutOfRange {
            target,
            size: ring.space().size(),
        })
    }
}

/// Baseline walk along successor links, O(N) hops.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaiveLookup;

impl LookupStrategy for NaiveLookup {
    fn find_successor(
        &self,
        ring: &Ring,
        start: NodeIndex,
        target: Digest,
    ) -> Result<Lookup, ChordError> {
        check_target(ring, target)?;
        let space = ring.space();
        let ceiling = ring.len() as HopCount;

        let mut current = start;
        let mut hops: HopCount = 0;
        loop {
            let successor = ring.successor_of(current)?;
            let here = ring.nodes[current].digest();
            let next = ring.nodes[successor].digest();
            if space.in_interval(target, here, next) {
                return Ok(Lookup {
                    owner: successor,
                    hops,
                });
            }

            current = successor;
            hops += 1;
            if hops > ceiling {
                return Err(ChordError::RoutingLoop { target, ceiling });
            }
        }
    }
}

/// Finger-table routing, O(log N) hops and never more than the ring width.
#[derive(Clone, Copy, Debug, Default)]
pub struct FingerTableLookup;

impl FingerTableLookup {
    /// Farthest finger of `current` lying strictly between it and `target`.
    pub fn closest_preceding_node(
        &self,
        ring: &Ring,
        current: NodeIndex,
        target: Digest,
    ) -> Option<NodeIndex> {
        let node = ring.node(current)?;
        ring.space()
            .closest_preceding(node.digest(), target, node.fingers(), |&finger| {
                ring.node(finger).map(|f| f.digest())
            })
            .copied()
    }

    /// Hop ceiling for one lookup: the ring width, or the ring size when smaller.
    pub fn hop_ceiling(ring: &Ring) -> HopCount {
        HopCount::from(ring.space().bits()).min(ring.len() as HopCount)
    }
}

impl LookupStrategy for FingerTableLookup {
    fn find_successor(
        &self,
        ring: &Ring,
        start: NodeIndex,
        target: Digest,
    ) -> Result<Lookup, ChordError> {
        check_target(ring, target)?;
        let space = ring.space();
        let ceiling = Self::hop_ceiling(ring);

        let mut current = start;
        let mut hops: HopCount = 0;
        loop {
            let successor = ring.successor_of(current)?;
            let here = ring.nodes[current].digest();
            if target == here {
                return Ok(Lookup {
                    owner: current,
                    hops,
                });
            }
            if space.in_interval(target, here, ring.nodes[successor].digest()) {
                return Ok(Lookup {
                    owner: successor,
                    hops,
                });
            }

            // No finger inside (current, target): step to the successor so
            // the walk always makes progress.
            current = self
                .closest_preceding_node(ring, current, target)
                .unwrap_or(successor);
            hops += 1;
            if hops > ceiling {
                return Err(ChordError::RoutingLoop { target, ceiling });
            }
        }
    }
}

/// Lookup strategy selected at run time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Naive,
    Finger,
}

impl LookupStrategy for Strategy {
    fn find_successor(
        &self,
        ring: &Ring,
        start: NodeIndex,
        target: Digest,
    ) -> Result<Lookup, ChordError> {
        match self {
            Strategy::Naive => NaiveLookup.find_successor(ring, start, target),
            Strategy::Finger => FingerTableLookup.find_successor(ring, start, target),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Naive => write!(f, "naive"),
            Strategy::Finger => write!(f, "finger"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naive" => Ok(Strategy::Naive),
            "finger" | "finger-table" => Ok(Strategy::Finger),
            other => Err(format!("unknown lookup strategy: {}", other)),
        }
    }
}
