//! Local state of a ring member.
#![warn(missing_docs)]
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;
use serde::Serialize;

use super::did::IdSpace;
use super::finger::FingerTable;
use super::types::Chord;
use super::types::MemberPhase;
use super::types::MemberRef;
use crate::dht::Did;
use crate::error::Error;
use crate::error::Result;

/// RingMember is the state one process keeps about its place on the ring.
/// All members form a clockwise ring in the order of Did.
/// RingMember implemented the local part of [Chord] algorithm.
pub struct RingMember {
    /// The did of current member.
    pub did: Did,
    /// The address peers use to reach current member.
    pub address: String,
    /// The identifier space shared by the ring.
    pub space: IdSpace,
    /// Finger table, successor, predecessor and phase, always mutated together.
    state: Mutex<RingState>,
}

/// Mutable part of a [RingMember]. Only the member mutates it, so finger 0 and the
/// successor stay in sync.
#[derive(Clone, Debug)]
pub(crate) struct RingState {
    /// [FingerTable] help member to find successor quickly.
    pub(crate) finger: FingerTable,
    /// The next member on the ring, same as the first entry of finger table.
    pub(crate) successor: Option<MemberRef>,
    /// The previous member on the ring.
    pub(crate) predecessor: Option<MemberRef>,
    /// Lifecycle phase.
    pub(crate) phase: MemberPhase,
}

impl RingState {
    fn set_successor(&mut self, member: MemberRef) -> Result<()> {
        self.finger.set(0, member.clone())?;
        self.successor = Some(member);
        Ok(())
    }

    fn set_finger(&mut self, index: usize, member: MemberRef) -> Result<()> {
        if index == 0 {
            self.set_successor(member)
        } else {
            self.finger.set(index, member)
        }
    }
}

/// `RingMember` use this to describe the result of [Chord] algorithm. Sometimes it's a
/// direct result, sometimes it's an action that is continued externally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RingAction {
    /// No result, the whole manipulation is done internally.
    None,
    /// Trigger a remote action on a member.
    RemoteAction(MemberRef, RemoteAction),
}

/// Some of the process needs to be done remotely. This enum is used to describe that.
/// The member that started the process receives it and decides whether to continue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteAction {
    /// Ask the target to run [Chord::update_finger_table] with this member and index.
    UpdateFingerTable(MemberRef, usize),
}

impl RingAction {
    /// Returns `true` if the action is a [RingAction::None] value.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns `true` if the action is a [RingAction::RemoteAction] value.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteAction(..))
    }
}

/// Information about the links of a member, as seen by itself.
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize, Clone)]
pub struct TopoInfo {
    /// The member itself
    pub member: MemberRef,
    /// Successor
    pub successor: Option<MemberRef>,
    /// Predecessor
    pub predecessor: Option<MemberRef>,
    /// Finger table entries
    pub fingers: Vec<Option<MemberRef>>,
    /// Lifecycle phase
    pub phase: MemberPhase,
}

impl TryFrom<&RingMember> for TopoInfo {
    type Error = Error;
    fn try_from(member: &RingMember) -> Result<TopoInfo> {
        let state = member.lock_state()?;
        Ok(TopoInfo {
            member: member.member_ref(),
            successor: state.successor.clone(),
            predecessor: state.predecessor.clone(),
            fingers: state.finger.list().clone(),
            phase: state.phase,
        })
    }
}

impl RingMember {
    /// Create a member whose did is derived from its address.
    pub fn new(address: impl Into<String>, space: IdSpace) -> Self {
        let address = address.into();
        let did = space.identifier_of(&address);
        Self::new_with_did(did, address, space)
    }

    /// Create a member with a given did. The did is reduced into `space`.
    pub fn new_with_did(did: Did, address: impl Into<String>, space: IdSpace) -> Self {
        let did = space.reduce(did.into());
        Self {
            did,
            address: address.into(),
            space,
            state: Mutex::new(RingState {
                finger: FingerTable::new(did, space.bits()),
                successor: None,
                predecessor: None,
                phase: MemberPhase::Uninitialized,
            }),
        }
    }

    /// Handle of current member.
    pub fn member_ref(&self) -> MemberRef {
        MemberRef::new(self.did, self.address.clone())
    }

    /// Lock and return MutexGuard of ring state.
    pub(crate) fn lock_state(&self) -> Result<MutexGuard<RingState>> {
        self.state.lock().map_err(|_| Error::MemberStateLock)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Result<MemberPhase> {
        Ok(self.lock_state()?.phase)
    }

    /// Fail with [Error::MemberNotReady] unless the member serves lookups.
    pub fn ensure_serving(&self) -> Result<()> {
        if self.phase()?.is_serving() {
            Ok(())
        } else {
            Err(Error::MemberNotReady(self.did))
        }
    }

    /// Enter [MemberPhase::Joining]. Only an uninitialized member can join.
    pub fn begin_join(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        if state.phase != MemberPhase::Uninitialized {
            return Err(Error::AlreadyInitialized(self.did));
        }
        state.phase = MemberPhase::Joining;
        Ok(())
    }

    /// Leave [MemberPhase::Joining] once the finger table is complete.
    pub fn complete_join(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        if !state.finger.is_complete() {
            let missing = (0..state.finger.size())
                .find(|i| state.finger.get(*i).is_none())
                .unwrap_or_default();
            return Err(Error::FingerEntryMissing(self.did, missing));
        }
        state.phase = MemberPhase::Steady;
        Ok(())
    }

    /// Return the successor. A member without successor has not created or joined a ring.
    pub fn successor(&self) -> Result<MemberRef> {
        self.lock_state()?
            .successor
            .clone()
            .ok_or(Error::SuccessorMissing(self.did))
    }

    /// Return the predecessor, which is unset on a seeded one-member ring.
    pub fn predecessor(&self) -> Result<Option<MemberRef>> {
        Ok(self.lock_state()?.predecessor.clone())
    }

    /// Return finger `index`.
    pub fn finger(&self, index: usize) -> Result<MemberRef> {
        let state = self.lock_state()?;
        if index >= state.finger.size() {
            return Err(Error::FingerIndexOutOfRange(index, state.finger.size()));
        }
        state
            .finger
            .get(index)
            .cloned()
            .ok_or(Error::FingerEntryMissing(self.did, index))
    }

    /// Set finger `index` while building the table during join.
    pub fn set_finger(&self, index: usize, member: MemberRef) -> Result<()> {
        self.lock_state()?.set_finger(index, member)
    }

    /// Test if current member is responsible for `key`, i.e. `key <- (predecessor, self]`.
    /// A member without predecessor owns the whole ring only while it is alone.
    pub fn is_responsible_for(&self, key: Did) -> Result<bool> {
        let state = self.lock_state()?;
        if !state.phase.is_serving() {
            return Err(Error::MemberNotReady(self.did));
        }
        match &state.predecessor {
            Some(pred) => Ok(key.in_left_open_interval(pred.did, self.did)),
            None => Ok(state.successor.as_ref().map(|s| s.did) == Some(self.did)),
        }
    }
}

impl Chord<RingAction> for RingMember {
    /// Seed a new ring: every finger and the successor point to self, predecessor unset.
    fn create(&self) -> Result<()> {
        let me = self.member_ref();
        let mut state = self.lock_state()?;
        if state.phase != MemberPhase::Uninitialized {
            return Err(Error::AlreadyInitialized(self.did));
        }
        state.finger.fill(&me);
        state.successor = Some(me);
        state.predecessor = None;
        state.phase = MemberPhase::Seeded;
        tracing::info!("member {} seeded a new ring", self.did);
        Ok(())
    }

    fn closest_preceding_finger(&self, did: Did) -> Result<MemberRef> {
        let state = self.lock_state()?;
        let found = state.finger.closest_preceding_finger(did)?;
        Ok(found.unwrap_or_else(|| self.member_ref()))
    }

    /// If `member <- [self, finger[index])` and it is not self, it becomes finger `index`,
    /// and the predecessor may need the same update. That continuation is returned
    /// instead of being called, so the member driving the join owns the whole chain.
    fn update_finger_table(&self, member: MemberRef, index: usize) -> Result<RingAction> {
        let mut state = self.lock_state()?;
        let size = state.finger.size();
        if index >= size {
            return Err(Error::FingerIndexOutOfRange(index, size));
        }
        let current = state
            .finger
            .get(index)
            .cloned()
            .ok_or(Error::FingerEntryMissing(self.did, index))?;

        if member.did == self.did || !member.did.in_circular_interval(self.did, current.did) {
            tracing::debug!(
                "update_finger_table: {} keeps finger {} = {}, offered {}",
                self.did,
                index,
                current.did,
                member.did
            );
            return Ok(RingAction::None);
        }

        state.set_finger(index, member.clone())?;
        tracing::debug!(
            "update_finger_table: {} set finger {} from {} to {}",
            self.did,
            index,
            current.did,
            member.did
        );

        match &state.predecessor {
            Some(pred) => Ok(RingAction::RemoteAction(
                pred.clone(),
                RemoteAction::UpdateFingerTable(member, index),
            )),
            None => Ok(RingAction::None),
        }
    }

    fn set_successor(&self, member: MemberRef) -> Result<()> {
        tracing::debug!("member {} set successor {}", self.did, member);
        self.lock_state()?.set_successor(member)
    }

    fn set_predecessor(&self, member: MemberRef) -> Result<()> {
        tracing::debug!("member {} set predecessor {}", self.did, member);
        self.lock_state()?.predecessor = Some(member);
        Ok(())
    }
}
