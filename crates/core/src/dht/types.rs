//! DHT types about `MemberRef` and the local `Chord` operations.
#![warn(missing_docs)]
use serde::Deserialize;
use serde::Serialize;

use super::did::Did;
use crate::error::Result;

/// Handle of a ring member: its identifier and the address used to reach it.
/// Members never hold each other's state, only handles.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberRef {
    /// Identifier of the member on the ring.
    pub did: Did,
    /// Opaque network endpoint of the member.
    pub address: String,
}

impl MemberRef {
    /// Build a handle.
    pub fn new(did: Did, address: impl Into<String>) -> Self {
        Self {
            did,
            address: address.into(),
        }
    }
}

impl std::fmt::Display for MemberRef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}@{}", self.did, self.address)
    }
}

/// Lifecycle of a member.
///
/// ```txt
/// Uninitialized -> Seeded
/// Uninitialized -> Joining -> Steady
/// ```
///
/// Only `Seeded` and `Steady` members serve lookups for others.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberPhase {
    /// Identifier computed, no ring yet.
    Uninitialized,
    /// Created a new one-member ring.
    Seeded,
    /// Running the join protocol against an existing ring.
    Joining,
    /// Join completed.
    Steady,
}

impl MemberPhase {
    /// Returns `true` if the member may answer lookups for other members.
    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Seeded | Self::Steady)
    }
}

/// Chord is a distributed hash table (DHT) algorithm. You may want to browse its
/// [wiki](https://en.wikipedia.org/wiki/Chord_(peer-to-peer)) before you read this.
///
/// This trait holds the operations a member runs purely on its own state. Anything that
/// needs another member, like the walk of `find_predecessor`, is driven outside by
/// [ChordNode](crate::node::ChordNode).
///
/// Some methods return an `Action` which is used to tell outer the extra action to take
/// after handling data inside the struct.
pub trait Chord<Action> {
    /// Seed a new ring containing only this member.
    fn create(&self) -> Result<()>;

    /// Scan the finger table from the highest index down and return the first entry
    /// strictly inside `(self, did)`, or self if none qualifies.
    fn closest_preceding_finger(&self, did: Did) -> Result<MemberRef>;

    /// Adopt `member` as finger `index` if it is closer than the current entry.
    /// On change, returns the action continuing the update on the predecessor.
    fn update_finger_table(&self, member: MemberRef, index: usize) -> Result<Action>;

    /// Splice a new successor, which is also finger 0.
    fn set_successor(&self, member: MemberRef) -> Result<()>;

    /// Splice a new predecessor.
    fn set_predecessor(&self, member: MemberRef) -> Result<()>;
}
