//! Chord routing over a static ring, in-process and over the network.
//!
//! [`chord`] holds the identifier space, ring construction and the two lookup
//! strategies. [`network`] carries lookups between live endpoints, and
//! [`experiment`] drives both to measure hop counts and round trips.

pub mod chord;
pub mod error;
pub mod experiment;
pub mod network;
