#![warn(missing_docs)]
//! Implementation of the ring's DHT
//! which is based on CHORD, ref: <https://pdos.csail.mit.edu/papers/ton:chord/paper-ton.pdf>
//! With high probability, the number of nodes that must be contacted to find a successor in an N-node network is O(log N).

pub mod did;
/// Finger table of a member
pub mod finger;
pub mod invariant;
mod member;
pub mod types;

pub use did::Did;
pub use did::IdSpace;
pub use finger::FingerTable;
pub use member::RemoteAction as RingRemoteAction;
pub use member::RingAction;
pub use member::RingMember;
pub use member::TopoInfo;
pub use types::Chord;
pub use types::MemberPhase;
pub use types::MemberRef;
