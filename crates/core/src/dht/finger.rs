#![warn(missing_docs)]
use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::dht::MemberRef;
use crate::error::Error;
use crate::error::Result;

/// Finger table of Chord DHT.
/// Entry `i` references the successor of `(did + 2^i) mod 2^m`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FingerTable {
    did: Did,
    size: usize,
    finger: Vec<Option<MemberRef>>,
}

impl FingerTable {
    /// builder
    pub fn new(did: Did, size: usize) -> Self {
        Self {
            did,
            size,
            finger: vec![None; size],
        }
    }

    /// Point every entry to `member`, used when seeding a ring.
    pub fn fill(&mut self, member: &MemberRef) {
        self.finger = vec![Some(member.clone()); self.size];
    }

    /// Returns `true` when no entry is missing.
    pub fn is_complete(&self) -> bool {
        self.finger.iter().all(|x| x.is_some())
    }

    /// getter
    pub fn get(&self, index: usize) -> Option<&MemberRef> {
        self.finger.get(index).and_then(|x| x.as_ref())
    }

    /// setter
    pub fn set(&mut self, index: usize, member: MemberRef) -> Result<()> {
        if index >= self.size {
            tracing::error!("set finger index out of range, index: {}", index);
            return Err(Error::FingerIndexOutOfRange(index, self.size));
        }
        tracing::debug!(
            "set finger table of {} index: {} member: {}",
            self.did,
            index,
            member
        );
        self.finger[index] = Some(member);
        Ok(())
    }

    /// Get closest preceding finger of `did`: scan from the highest index and return the
    /// first entry strictly between the owner and `did`.
    /// Returns `None` if no entry qualifies, and fails on an unset entry.
    pub fn closest_preceding_finger(&self, did: Did) -> Result<Option<MemberRef>> {
        for i in (0..self.size).rev() {
            let entry = self.finger[i]
                .as_ref()
                .ok_or(Error::FingerEntryMissing(self.did, i))?;
            if entry.did.in_open_interval(self.did, did) {
                return Ok(Some(entry.clone()));
            }
        }
        Ok(None)
    }

    /// size of the table, the width of the identifier space
    pub fn size(&self) -> usize {
        self.size
    }

    /// get finger list
    pub fn list(&self) -> &Vec<Option<MemberRef>> {
        &self.finger
    }
}
