//! Messages exchanged between ring members.
//!
//! Every remote step of the join and lookup algorithms is one [Request] answered by one
//! [Response]. Both sides are plain serde types so that any transport able to move bytes
//! can carry them.
#![warn(missing_docs)]
use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::dht::MemberRef;
use crate::dht::RingAction;
use crate::error::Error;
use crate::error::ErrorKind;

/// Request sent to a ring member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Ask for the handle of the member behind an address.
    Identify,
    /// Ask for the successor.
    Successor,
    /// Ask for the predecessor, which may be unset.
    Predecessor,
    /// Run `closest_preceding_finger` on the member.
    ClosestPrecedingFinger(Did),
    /// Resolve the owner of a did, starting from the member.
    FindSuccessor(Did),
    /// Resolve the member right before a did, starting from the member.
    FindPredecessor(Did),
    /// Run `update_finger_table` on the member, answered with the continuation.
    UpdateFingerTable {
        /// candidate for the finger entry
        member: MemberRef,
        /// finger index
        index: usize,
    },
    /// Splice a new successor.
    SetSuccessor(MemberRef),
    /// Splice a new predecessor.
    SetPredecessor(MemberRef),
}

impl Request {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Identify => "identify",
            Request::Successor => "successor",
            Request::Predecessor => "predecessor",
            Request::ClosestPrecedingFinger(_) => "closest_preceding_finger",
            Request::FindSuccessor(_) => "find_successor",
            Request::FindPredecessor(_) => "find_predecessor",
            Request::UpdateFingerTable { .. } => "update_finger_table",
            Request::SetSuccessor(_) => "set_successor",
            Request::SetPredecessor(_) => "set_predecessor",
        }
    }
}

/// Response of a ring member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// A member handle.
    Member(MemberRef),
    /// A member handle that may be unset.
    MaybeMember(Option<MemberRef>),
    /// Continuation of `update_finger_table`.
    Action(RingAction),
    /// The request is done with no data.
    Done,
    /// The handler failed.
    Failure {
        /// classification of the error on the remote side
        kind: ErrorKind,
        /// rendered error
        reason: String,
    },
}

impl From<&Error> for Response {
    fn from(e: &Error) -> Self {
        Response::Failure {
            kind: e.kind(),
            reason: e.to_string(),
        }
    }
}
