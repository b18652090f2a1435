//! Chord ring: identifier arithmetic, finger tables, lookup and the join protocol.
//! --------------
//! - [RingMember](crate::dht::RingMember) holds the state of one member and runs the local part of Chord.
//! - [ChordNode](crate::node::ChordNode) drives the parts that walk the ring, through a [Transport](crate::transport::Transport).
//! - [LocalTransport](crate::transport::LocalTransport) connects members living in one process, for tests and simulation.
//! - [check_ring](crate::dht::invariant::check_ring) compares a snapshot of the ring against a brute force oracle.
//!
//! # Identifiers
//!
//! Members and keys live on a ring of `2^m` identifiers, `1 <= m <= 160`. The identifier of a
//! member is the SHA-1 of its address reduced to `m` bits. Key `k` is owned by its successor,
//! the first member at or after `k` going clockwise.
//!
//! # Join
//!
//! A new member `n` joins through any member `p` already on the ring.
//!
//! 1. Init finger table
//! - `n` asks `p` for the successor of `n + 1`, takes over its predecessor and splices
//!   itself between the two.
//! - Each next finger reuses the previous entry when it still covers the finger start,
//!   otherwise `n` asks `p` again.
//! 2. Update others
//! - For every `i`, the last member at or before `n - 2^i` may need `n` as finger `i`.
//!   It is offered `n`, and if it adopts it, the offer continues to its predecessor.
//!   The continuation comes back to `n` as a [RingAction](crate::dht::RingAction), so `n`
//!   drives the whole chain.
//!
//! Members serve lookups only once they have seeded a ring or completed their join.
//! Joins are expected to be serialized, there is no stabilization to repair interleaved joins.
//!
//! # Lookup
//!
//! ```txt
//! find_successor(id) = successor(find_predecessor(id))
//! ```
//!
//! `find_predecessor` jumps through closest preceding fingers until `id <- (p, successor(p)]`.
//! On a consistent ring it takes at most `m` jumps.

pub mod consts;
pub mod dht;
pub mod error;
pub mod inspect;
pub mod message;
pub mod node;
pub mod transport;

#[cfg(test)]
mod tests;
