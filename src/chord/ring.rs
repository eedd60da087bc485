use crate::chord::node::Node;
use crate::chord::node_name;
use crate::chord::routing::{LookupStrategy, NaiveLookup};
use crate::chord::space::IdentifierSpace;
use crate::chord::types::{Digest, NodeIndex};
use crate::error::ChordError;
use log::debug;
use std::collections::BTreeMap;

/// A fixed-membership ring. Nodes never join or leave after construction.
#[derive(Clone, Debug)]
pub struct Ring {
    pub(crate) space: IdentifierSpace,
    pub(crate) nodes: Vec<Node>,
}

impl Ring {
    pub fn space(&self) -> &IdentifierSpace {
        &self.space
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in construction order, i.e. ring traversal order from the
    /// first-linked node.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Nodes ordered by ascending digest.
    pub fn sorted_by_digest(&self) -> Vec<&Node> {
        let mut sorted: Vec<&Node> = self.nodes.iter().collect();
        sorted.sort_by_key(|node| node.digest());
        sorted
    }

    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeIndex> {
        self.nodes.iter().position(|node| node.name() == name)
    }

    pub fn find_by_digest(&self, digest: Digest) -> Option<NodeIndex> {
        self.nodes.iter().position(|node| node.digest() == digest)
    }

    /// Successor of the node at `index`, failing when the ring is not linked.
    pub fn successor_of(&self, index: NodeIndex) -> Result<NodeIndex, ChordError> {
        let node = self.nodes.get(index).ok_or_else(|| {
            ChordError::InvalidRing(format!("no node at index {}", index))
        })?;
        let successor = node.successor().ok_or_else(|| {
            ChordError::InvalidRing(format!("node {} has no successor", node.name()))
        })?;
        if successor >= self.nodes.len() {
            return Err(ChordError::InvalidRing(format!(
                "node {} links to missing index {}",
                node.name(),
                successor
            )));
        }
        Ok(successor)
    }
}

/// Builds a [`Ring`] from a set of names in two phases: link every
/// successor, then fill every finger table against the finished cycle.
pub struct RingBuilder {
    space: IdentifierSpace,
}

impl RingBuilder {
    pub fn new(space: IdentifierSpace) -> Self {
        Self { space }
    }

    /// Builds the ring `node_0 .. node_{count-1}`.
    pub fn build_numbered(&self, count: usize) -> Result<Ring, ChordError> {
        self.build((0..count).map(node_name))
    }

    pub fn build<I, S>(&self, names: I) -> Result<Ring, ChordError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ring = self.link(names)?;
        let fingers = self.compute_fingers(&ring)?;
        for (node, table) in ring.nodes.iter_mut().zip(fingers) {
            node.set_fingers(table);
        }
        debug!(
            "Built ring of {} nodes over {} bits",
            ring.len(),
            self.space.bits()
        );
        Ok(ring)
    }

    /// Hashes the names and links successors into one ascending cycle.
    /// Finger tables are left empty.
    pub(crate) fn link<I, S>(&self, names: I) -> Result<Ring, ChordError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Later names silently replace earlier ones on a digest collision.
        let mut by_digest: BTreeMap<Digest, String> = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            let digest = self.space.hash(name);
            if let Some(previous) = by_digest.insert(digest, name.to_string()) {
                debug!("{} replaces {} at digest {}", name, previous, digest);
            }
        }

        if by_digest.len() < 2 {
            return Err(ChordError::InsufficientNodes(by_digest.len()));
        }

        let mut nodes: Vec<Node> = by_digest
            .into_iter()
            .map(|(digest, name)| Node::new(name, digest))
            .collect();

        let count = nodes.len();
        for (index, node) in nodes.iter_mut().enumerate() {
            node.set_successor((index + 1) % count);
        }

        Ok(Ring {
            space: self.space,
            nodes,
        })
    }

    fn compute_fingers(&self, ring: &Ring) -> Result<Vec<Vec<NodeIndex>>, ChordError> {
        let lookup = NaiveLookup;
        (0..ring.len())
            .map(|index| {
                let digest = ring.nodes[index].digest();
                (0..self.space.bits())
                    .map(|i| {
                        let start = self.space.finger_start(digest, i);
                        lookup
                            .find_successor(ring, index, start)
                            .map(|found| found.owner)
                    })
                    .collect::<Result<Vec<NodeIndex>, ChordError>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_node_ring() -> Ring {
        RingBuilder::new(IdentifierSpace::default())
            .build_numbered(10)
            .unwrap()
    }

    #[test]
    fn reference_ring_sorted_by_digest() {
        let ring = ten_node_ring();
        let layout: Vec<(Digest, &str)> = ring
            .sorted_by_digest()
            .into_iter()
            .map(|node| (node.digest(), node.name()))
            .collect();
        assert_eq!(
            layout,
            vec![
                (24, "node_3"),
                (32, "node_2"),
                (46, "node_6"),
                (109, "node_4"),
                (145, "node_8"),
                (150, "node_7"),
                (160, "node_0"),
                (163, "node_1"),
                (241, "node_9"),
                (244, "node_5"),
            ]
        );
    }

    #[test]
    fn reference_finger_table() {
        let ring = ten_node_ring();
        let index = ring.find_by_digest(24).unwrap();
        let names: Vec<&str> = ring.nodes()[index]
            .fingers()
            .iter()
            .map(|&finger| ring.nodes()[finger].name())
            .collect();
        assert_eq!(
            names,
            vec!["node_2", "node_2", "node_2", "node_2", "node_6", "node_4", "node_4", "node_0"]
        );
    }

    #[test]
    fn successors_form_a_single_cycle() {
        for count in [2, 10, 50, 100] {
            let ring = RingBuilder::new(IdentifierSpace::default())
                .build_numbered(count)
                .unwrap();
            for start in 0..ring.len() {
                let mut seen = vec![false; ring.len()];
                let mut current = start;
                for _ in 0..ring.len() {
                    assert!(!seen[current], "revisited {} before closing", current);
                    seen[current] = true;
                    current = ring.successor_of(current).unwrap();
                }
                assert_eq!(current, start);
                assert!(seen.iter().all(|&visited| visited));
            }
        }
    }

    #[test]
    fn fingers_are_minimal() {
        let ring = RingBuilder::new(IdentifierSpace::default())
            .build_numbered(50)
            .unwrap();
        let space = *ring.space();
        for node in ring.nodes() {
            assert_eq!(node.fingers().len(), space.bits() as usize);
            for i in 0..space.bits() {
                let start = space.finger_start(node.digest(), i);
                // Owner is the node with the smallest clockwise distance from start.
                let expected = ring
                    .nodes()
                    .iter()
                    .min_by_key(|candidate| space.distance(start, candidate.digest()))
                    .unwrap();
                let finger = &ring.nodes()[node.finger(i as usize).unwrap()];
                assert_eq!(finger.digest(), expected.digest());
            }
        }
    }

    #[test]
    fn construction_order_matches_digest_order() {
        let ring = ten_node_ring();
        let construction: Vec<Digest> = ring.nodes().iter().map(Node::digest).collect();
        let sorted: Vec<Digest> = ring.sorted_by_digest().iter().map(|n| n.digest()).collect();
        assert_eq!(construction, sorted);
    }

    #[test]
    fn collisions_keep_the_later_name() {
        // One bit leaves two positions, so six names must collide.
        let space = IdentifierSpace::with_bits(1).unwrap();
        let names: Vec<String> = (0..6).map(node_name).collect();
        let ring = RingBuilder::new(space).build(&names).unwrap();
        assert_eq!(ring.len(), 2);
        for node in ring.nodes() {
            let last = names
                .iter()
                .filter(|name| space.hash(name) == node.digest())
                .last()
                .unwrap();
            assert_eq!(node.name(), last);
        }
    }

    #[test]
    fn rejects_degenerate_rings() {
        let builder = RingBuilder::new(IdentifierSpace::default());
        assert_eq!(
            builder.build(Vec::<String>::new()).unwrap_err(),
            ChordError::InsufficientNodes(0)
        );
        assert_eq!(
            builder.build(["node_3", "node_3"]).unwrap_err(),
            ChordError::InsufficientNodes(1)
        );
    }

    #[test]
    fn lookup_helpers() {
        let ring = ten_node_ring();
        assert_eq!(ring.find_by_name("node_4"), ring.find_by_digest(109));
        assert!(ring.find_by_name("node_42").is_none());
        assert!(ring.successor_of(99).is_err());
    }
}
