use crate::chord::types::{Digest, NodeIndex};

/// A member of a built ring.
///
/// Links to other members are indices into the owning
/// [`Ring`](crate::chord::ring::Ring); they are only written while the ring
/// is being built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    name: String,
    digest: Digest,
    successor: Option<NodeIndex>,
    fingers: Vec<NodeIndex>,
}

impl Node {
    pub fn new(name: impl Into<String>, digest: Digest) -> Self {
        Self {
            name: name.into(),
            digest,
            successor: None,
            fingers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn digest(&self) -> Digest {
        self.digest
    }

    pub fn successor(&self) -> Option<NodeIndex> {
        self.successor
    }

    pub fn fingers(&self) -> &[NodeIndex] {
        &self.fingers
    }

    pub fn finger(&self, i: usize) -> Option<NodeIndex> {
        self.fingers.get(i).copied()
    }

    pub(crate) fn set_successor(&mut self, successor: NodeIndex) {
        self.successor = Some(successor);
    }

    pub(crate) fn set_fingers(&mut self, fingers: Vec<NodeIndex>) {
        self.fingers = fingers;
    }
}
