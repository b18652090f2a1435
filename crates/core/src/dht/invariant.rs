//! Brute force checks of a ring, used by tests and by the simulation driver.
//!
//! The checker needs a snapshot of every member ([TopoInfo]), so it only makes sense
//! where the whole membership is known, e.g. an in-process ring.
#![warn(missing_docs)]
use std::collections::BTreeSet;
use std::collections::HashMap;

use super::did::IdSpace;
use super::member::TopoInfo;
use super::types::MemberRef;
use crate::dht::Did;
use crate::error::Error;
use crate::error::Result;

/// The member owning `key` on a ring of `ids`: the first id at or after `key`, wrapping
/// to the smallest one. Returns `None` on an empty ring.
pub fn oracle_successor(ids: &BTreeSet<Did>, key: Did) -> Option<Did> {
    ids.range(key..).next().or_else(|| ids.iter().next()).copied()
}

/// The member right before `did`: the last id strictly before it, wrapping to the
/// largest one. Returns `None` on an empty ring.
pub fn oracle_predecessor(ids: &BTreeSet<Did>, did: Did) -> Option<Did> {
    ids.range(..did)
        .next_back()
        .or_else(|| ids.iter().next_back())
        .copied()
}

fn violation(msg: String) -> Error {
    tracing::warn!("ring check failed: {}", msg);
    Error::RingInvariantViolation(msg)
}

fn expect_link(
    what: &str,
    owner: &MemberRef,
    got: Option<&MemberRef>,
    want: Did,
    members: &HashMap<Did, &MemberRef>,
) -> Result<()> {
    let got = got.ok_or_else(|| violation(format!("{what} of {owner} is unset")))?;
    if got.did != want {
        return Err(violation(format!(
            "{what} of {owner} is {}, expected {want}",
            got.did
        )));
    }
    match members.get(&got.did) {
        Some(m) if m.address == got.address => Ok(()),
        _ => Err(violation(format!(
            "{what} of {owner} points to unknown member {got}"
        ))),
    }
}

/// Check a snapshot of the whole ring:
///
/// * every member is serving and identifiers are unique,
/// * successor equals finger 0 and is the next member clockwise,
/// * predecessor is the previous member, unset only on a one-member ring,
/// * finger `i` is the successor of `did + 2^i`,
/// * following successors from any member visits every member and comes back.
pub fn check_ring(space: IdSpace, infos: &[TopoInfo]) -> Result<()> {
    let mut members: HashMap<Did, &MemberRef> = HashMap::new();
    for info in infos {
        if members.insert(info.member.did, &info.member).is_some() {
            return Err(violation(format!("identifier {} is taken twice", info.member.did)));
        }
    }
    let ids: BTreeSet<Did> = members.keys().copied().collect();

    for info in infos {
        let me = &info.member;
        if !info.phase.is_serving() {
            return Err(violation(format!("{me} is {:?}", info.phase)));
        }
        if info.fingers.len() != space.bits() {
            return Err(violation(format!(
                "finger table of {me} has {} entries",
                info.fingers.len()
            )));
        }

        let succ = oracle_successor(&ids, space.next(me.did))
            .ok_or_else(|| violation("ring is empty".to_string()))?;
        expect_link("successor", me, info.successor.as_ref(), succ, &members)?;
        if info.fingers[0] != info.successor {
            return Err(violation(format!("finger 0 of {me} is not its successor")));
        }

        if ids.len() == 1 {
            if let Some(p) = &info.predecessor {
                expect_link("predecessor", me, Some(p), me.did, &members)?;
            }
        } else {
            let pred = oracle_predecessor(&ids, me.did)
                .ok_or_else(|| violation("ring is empty".to_string()))?;
            expect_link("predecessor", me, info.predecessor.as_ref(), pred, &members)?;
        }

        for (i, finger) in info.fingers.iter().enumerate() {
            let start = space.finger_start(me.did, i);
            let want = oracle_successor(&ids, start)
                .ok_or_else(|| violation("ring is empty".to_string()))?;
            expect_link(&format!("finger {i}"), me, finger.as_ref(), want, &members)?;
        }
    }

    let by_did: HashMap<Did, &TopoInfo> = infos.iter().map(|x| (x.member.did, x)).collect();
    if let Some(first) = infos.first() {
        let mut seen = BTreeSet::new();
        let mut cur = first;
        loop {
            if !seen.insert(cur.member.did) {
                break;
            }
            let next = cur
                .successor
                .as_ref()
                .and_then(|s| by_did.get(&s.did).copied())
                .ok_or_else(|| violation(format!("successor walk broke at {}", cur.member)))?;
            cur = next;
        }
        if cur.member.did != first.member.did || seen.len() != ids.len() {
            return Err(violation(format!(
                "successor walk from {} visited {} of {} members",
                first.member,
                seen.len(),
                ids.len()
            )));
        }
    }
    Ok(())
}
