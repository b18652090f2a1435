//! Human readable snapshots of ring members.
use serde::Deserialize;
use serde::Serialize;

use crate::dht::MemberPhase;
use crate::dht::RingMember;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInspect {
    pub did: String,
    pub address: String,
    pub phase: MemberPhase,
    #[serde(default)]
    pub successor: Option<String>,
    #[serde(default)]
    pub predecessor: Option<String>,
    /// Runs of equal finger entries: `(entry, first index, last index)`.
    pub finger_table: Vec<(Option<String>, u64, u64)>,
}

impl MemberInspect {
    pub fn inspect(member: &RingMember) -> Self {
        let did = member.did.to_string();
        let address = member.address.clone();
        let state = member.lock_state().map(|s| s.clone()).ok();

        let phase = state
            .as_ref()
            .map(|s| s.phase)
            .unwrap_or(MemberPhase::Uninitialized);
        let successor = state
            .as_ref()
            .and_then(|s| s.successor.as_ref())
            .map(|x| x.did.to_string());
        let predecessor = state
            .as_ref()
            .and_then(|s| s.predecessor.as_ref())
            .map(|x| x.did.to_string());

        let finger_table = state
            .map(|s| {
                let finger = s
                    .finger
                    .list()
                    .iter()
                    .map(|x| x.as_ref().map(|m| m.did.to_string()));
                compress_iter(finger)
            })
            .unwrap_or_default();

        Self {
            did,
            address,
            phase,
            successor,
            predecessor,
            finger_table,
        }
    }
}

pub fn compress_iter<T>(iter: impl Iterator<Item = T>) -> Vec<(T, u64, u64)>
where T: PartialEq {
    let mut result = vec![];
    let mut start = 0u64;
    let mut count = 0u64;
    let mut prev: Option<T> = None;

    for (i, x) in iter.enumerate() {
        match prev {
            Some(p) if p == x => {
                count += 1;
            }
            _ => {
                if let Some(p) = prev {
                    result.push((p, start, start + count - 1));
                }
                start = i as u64;
                count = 1;
            }
        }
        prev = Some(x);
    }

    if let Some(p) = prev {
        result.push((p, start, start + count - 1));
    }

    result
}
