//! A ring member wired to a [Transport].
//!
//! [RingMember] only knows its own state. [ChordNode] drives the parts of Chord that walk
//! the ring: lookups, the join protocol and the propagation of finger updates. It is also
//! the [RequestHandler] answering other members.
#![warn(missing_docs)]
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::dht::Chord;
use crate::dht::Did;
use crate::dht::MemberRef;
use crate::dht::RingAction;
use crate::dht::RingMember;
use crate::dht::RingRemoteAction;
use crate::dht::TopoInfo;
use crate::error::Error;
use crate::error::Result;
use crate::message::Request;
use crate::message::Response;
use crate::transport::RequestHandler;
use crate::transport::Transport;

/// A ring member with the ability to reach other members.
pub struct ChordNode {
    member: Arc<RingMember>,
    transport: Arc<dyn Transport>,
}

impl ChordNode {
    /// Wrap `member`, reaching peers through `transport`.
    pub fn new(member: Arc<RingMember>, transport: Arc<dyn Transport>) -> Self {
        Self { member, transport }
    }

    /// Local state.
    pub fn member(&self) -> &Arc<RingMember> {
        &self.member
    }

    /// Identifier of this node.
    pub fn did(&self) -> Did {
        self.member.did
    }

    /// Handle of this node.
    pub fn member_ref(&self) -> MemberRef {
        self.member.member_ref()
    }

    /// Snapshot of the links of this node.
    pub fn topo_info(&self) -> Result<TopoInfo> {
        TopoInfo::try_from(&*self.member)
    }

    fn is_self(&self, target: &MemberRef) -> bool {
        target.did == self.member.did && target.address == self.member.address
    }

    /// Send a request, short-circuiting requests addressed to this node.
    async fn call(&self, target: &MemberRef, request: Request) -> Result<Response> {
        let name = request.name();
        tracing::trace!("{} -> {}: {:?}", self.did(), target, request);
        if self.is_self(target) {
            return <Self as RequestHandler>::handle(self, request).await;
        }
        match self.transport.request(target, request).await? {
            Response::Failure { kind, reason } => {
                tracing::debug!("{} on {} failed: {}", name, target, reason);
                Err(Error::Remote {
                    target: target.to_string(),
                    kind,
                    reason,
                })
            }
            resp => Ok(resp),
        }
    }

    async fn call_member(&self, target: &MemberRef, request: Request) -> Result<MemberRef> {
        let name = request.name();
        match self.call(target, request).await? {
            Response::Member(m) => Ok(m),
            other => Err(Error::UnexpectedResponse(
                target.to_string(),
                format!("{name}: {other:?}"),
            )),
        }
    }

    async fn call_done(&self, target: &MemberRef, request: Request) -> Result<()> {
        let name = request.name();
        match self.call(target, request).await? {
            Response::Done => Ok(()),
            other => Err(Error::UnexpectedResponse(
                target.to_string(),
                format!("{name}: {other:?}"),
            )),
        }
    }

    async fn remote_predecessor(&self, target: &MemberRef) -> Result<Option<MemberRef>> {
        match self.call(target, Request::Predecessor).await? {
            Response::MaybeMember(m) => Ok(m),
            other => Err(Error::UnexpectedResponse(
                target.to_string(),
                format!("predecessor: {other:?}"),
            )),
        }
    }

    async fn remote_update_finger_table(
        &self,
        target: &MemberRef,
        member: MemberRef,
        index: usize,
    ) -> Result<RingAction> {
        match self
            .call(target, Request::UpdateFingerTable { member, index })
            .await?
        {
            Response::Action(act) => Ok(act),
            other => Err(Error::UnexpectedResponse(
                target.to_string(),
                format!("update_finger_table: {other:?}"),
            )),
        }
    }

    /// Walk the ring from this node towards `id`, asking each visited member for its
    /// successor and closest preceding finger. Each jump at least halves the remaining
    /// distance, so a consistent ring answers within `m` jumps.
    async fn walk_predecessor(&self, id: Did) -> Result<MemberRef> {
        let bits = self.member.space.bits();
        let mut current = self.member_ref();
        for hop in 0..=bits {
            let succ = self.call_member(&current, Request::Successor).await?;
            if id.in_left_open_interval(current.did, succ.did) {
                tracing::debug!("find_predecessor({}) = {} after {} hops", id, current, hop);
                return Ok(current);
            }
            let next = self
                .call_member(&current, Request::ClosestPrecedingFinger(id))
                .await?;
            if next.did == current.did {
                return Err(Error::LookupStalled(id, current.did));
            }
            current = next;
        }
        Err(Error::LookupHopsExceeded(id, bits))
    }

    /// The member `p` with `id <- (p, successor(p)]`.
    pub async fn find_predecessor(&self, id: Did) -> Result<MemberRef> {
        self.member.ensure_serving()?;
        let id = self.member.space.reduce(id.into());
        self.walk_predecessor(id).await
    }

    /// The member responsible for `id`: the first member at or after it on the ring.
    pub async fn find_successor(&self, id: Did) -> Result<MemberRef> {
        self.member.ensure_serving()?;
        let id = self.member.space.reduce(id.into());
        let pred = self.walk_predecessor(id).await?;
        self.call_member(&pred, Request::Successor).await
    }

    /// Resolve the member responsible for an arbitrary key.
    pub async fn lookup(&self, key: impl AsRef<[u8]>) -> Result<MemberRef> {
        let id = self.member.space.key_id(key);
        self.find_successor(id).await
    }

    /// Seed a new ring containing only this node.
    pub fn create(&self) -> Result<()> {
        self.member.create()
    }

    /// See [Chord::closest_preceding_finger].
    pub fn closest_preceding_finger(&self, did: Did) -> Result<MemberRef> {
        self.member.closest_preceding_finger(did)
    }

    /// See [Chord::update_finger_table]. The returned continuation is not followed.
    pub fn update_finger_table(&self, member: MemberRef, index: usize) -> Result<RingAction> {
        self.member.update_finger_table(member, index)
    }

    /// Join the ring that `contact` belongs to.
    ///
    /// Joins must not run concurrently on the same ring: the finger updates of two joining
    /// members can interleave and leave stale entries.
    pub async fn join(&self, contact: Option<MemberRef>) -> Result<()> {
        let contact = contact.ok_or(Error::JoinWithoutContact)?;
        if contact.did == self.did() || contact.address == self.member.address {
            return Err(Error::JoinWithSelf);
        }
        let contact = self
            .call_member(&contact, Request::Identify)
            .await
            .map_err(|e| Error::ContactUnreachable(contact.to_string(), e.to_string()))?;
        if contact.did == self.did() {
            return Err(Error::RingInvariantViolation(format!(
                "identifier {} is already taken by {}",
                self.did(),
                contact
            )));
        }

        tracing::info!("member {} joining via {}", self.member_ref(), contact);
        self.member.begin_join()?;
        self.init_finger_table(&contact).await?;
        self.update_others().await?;
        self.member.complete_join()?;
        tracing::info!(
            "member {} joined, successor {}",
            self.did(),
            self.member.successor()?
        );
        Ok(())
    }

    /// Build the finger table through `contact` and splice this node between its
    /// predecessor and successor.
    async fn init_finger_table(&self, contact: &MemberRef) -> Result<()> {
        let me = self.member_ref();
        let space = self.member.space;
        let did = self.did();

        let succ = self
            .call_member(contact, Request::FindSuccessor(space.finger_start(did, 0)))
            .await?;
        let pred = self
            .remote_predecessor(&succ)
            .await?
            .unwrap_or_else(|| succ.clone());
        self.member.set_successor(succ.clone())?;
        self.member.set_predecessor(pred.clone())?;

        self.call_done(&succ, Request::SetPredecessor(me.clone()))
            .await?;
        self.call_done(&pred, Request::SetSuccessor(me)).await?;
        tracing::debug!("member {} spliced between {} and {}", did, pred, succ);

        for i in 0..space.bits() - 1 {
            let start = space.finger_start(did, i + 1);
            let prev = self.member.finger(i)?;
            let entry = if start.in_circular_interval(did, prev.did) {
                prev
            } else {
                self.call_member(contact, Request::FindSuccessor(start))
                    .await?
            };
            self.member.set_finger(i + 1, entry)?;
        }
        Ok(())
    }

    /// Offer this node to every member whose finger `i` may now point to it.
    /// For each `i` that is the last member at or before `did - 2^i`.
    async fn update_others(&self) -> Result<()> {
        let me = self.member_ref();
        let space = self.member.space;
        for i in 0..space.bits() {
            let target = space.next(space.finger_origin(me.did, i));
            let p = self.walk_predecessor(target).await?;
            if p.did == me.did {
                continue;
            }
            self.propagate_finger_update(p, me.clone(), i).await?;
        }
        Ok(())
    }

    /// Run `update_finger_table` on `start`, then follow the returned continuations
    /// counter-clockwise until a member declines, the chain reaches this node again or
    /// would revisit a member.
    pub(crate) async fn propagate_finger_update(
        &self,
        start: MemberRef,
        member: MemberRef,
        index: usize,
    ) -> Result<()> {
        let mut visited = HashSet::new();
        let mut action =
            RingAction::RemoteAction(start, RingRemoteAction::UpdateFingerTable(member, index));
        while let RingAction::RemoteAction(target, RingRemoteAction::UpdateFingerTable(m, i)) =
            action
        {
            if self.is_self(&target) {
                break;
            }
            if !visited.insert(target.did) {
                tracing::warn!(
                    "finger update {} of {} came back to {}, stop",
                    i,
                    m,
                    target
                );
                break;
            }
            action = self.remote_update_finger_table(&target, m, i).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RequestHandler for ChordNode {
    async fn handle(&self, request: Request) -> Result<Response> {
        match request {
            Request::Identify => Ok(Response::Member(self.member_ref())),
            Request::Successor => Ok(Response::Member(self.member.successor()?)),
            Request::Predecessor => Ok(Response::MaybeMember(self.member.predecessor()?)),
            Request::ClosestPrecedingFinger(did) => Ok(Response::Member(
                self.member.closest_preceding_finger(did)?,
            )),
            Request::FindSuccessor(did) => Ok(Response::Member(self.find_successor(did).await?)),
            Request::FindPredecessor(did) => {
                Ok(Response::Member(self.find_predecessor(did).await?))
            }
            Request::UpdateFingerTable { member, index } => Ok(Response::Action(
                self.member.update_finger_table(member, index)?,
            )),
            Request::SetSuccessor(member) => {
                self.member.set_successor(member)?;
                Ok(Response::Done)
            }
            Request::SetPredecessor(member) => {
                self.member.set_predecessor(member)?;
                Ok(Response::Done)
            }
        }
    }
}
