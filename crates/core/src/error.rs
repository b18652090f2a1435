//! Error of chord_core

use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of [Error], used by callers to decide what failed
/// and carried across the wire when a remote handler fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The caller asked for something that cannot be set up, e.g. joining without a contact.
    Configuration,
    /// A ring invariant has been observed broken. The local state cannot repair it.
    RingInconsistency,
    /// A call to a peer failed on the transport.
    RemoteCall,
    /// The member has not finished creating or joining a ring.
    NotReady,
    /// Local failure unrelated to the ring, e.g. a poisoned lock.
    Internal,
}

/// Errors collections in chord-core.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Identifier space must have between 1 and 160 bits, got {0}")]
    InvalidIdentifierBits(u16),

    #[error("Invalid did: {0}")]
    InvalidDid(String),

    #[error("Joining an existing ring requires a contact member")]
    JoinWithoutContact,

    #[error("A member cannot join a ring through itself")]
    JoinWithSelf,

    #[error("Contact member {0} is unreachable: {1}")]
    ContactUnreachable(String, String),

    #[error("Member {0} already created or joined a ring")]
    AlreadyInitialized(Did),

    #[error("Member {0} is not serving lookups before its join completes")]
    MemberNotReady(Did),

    #[error("Lookup of {0} exceeded {1} hops")]
    LookupHopsExceeded(Did, usize),

    #[error("Lookup of {0} made no progress at member {1}")]
    LookupStalled(Did, Did),

    #[error("Finger entry {1} of member {0} is unset")]
    FingerEntryMissing(Did, usize),

    #[error("Finger index {0} is out of range for a {1} bits identifier space")]
    FingerIndexOutOfRange(usize, usize),

    #[error("Member {0} has no successor")]
    SuccessorMissing(Did),

    #[error("Ring invariant violated: {0}")]
    RingInvariantViolation(String),

    #[error("Cannot reach peer at {0}")]
    PeerUnreachable(String),

    #[error("Peer at {0} is offline")]
    PeerOffline(String),

    #[error("Peer at {0} answered {1} with an unexpected response")]
    UnexpectedResponse(String, String),

    #[error("Remote call to {target} failed ({kind:?}): {reason}")]
    Remote {
        target: String,
        kind: ErrorKind,
        reason: String,
    },

    #[error("Bincode serialization error")]
    BincodeSerialize(#[source] bincode::Error),

    #[error("Bincode deserialization error")]
    BincodeDeserialize(#[source] bincode::Error),

    #[error("Failed to lock state of ring member")]
    MemberStateLock,
}

impl Error {
    /// Classify the error, see [ErrorKind].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidIdentifierBits(_)
            | Error::InvalidDid(_)
            | Error::JoinWithoutContact
            | Error::JoinWithSelf
            | Error::ContactUnreachable(..)
            | Error::AlreadyInitialized(_) => ErrorKind::Configuration,
            Error::LookupHopsExceeded(..)
            | Error::LookupStalled(..)
            | Error::FingerEntryMissing(..)
            | Error::FingerIndexOutOfRange(..)
            | Error::SuccessorMissing(_)
            | Error::RingInvariantViolation(_) => ErrorKind::RingInconsistency,
            Error::PeerUnreachable(_)
            | Error::PeerOffline(_)
            | Error::UnexpectedResponse(..)
            | Error::BincodeSerialize(_)
            | Error::BincodeDeserialize(_) => ErrorKind::RemoteCall,
            Error::Remote { kind, .. } => *kind,
            Error::MemberNotReady(_) => ErrorKind::NotReady,
            Error::MemberStateLock => ErrorKind::Internal,
        }
    }
}
