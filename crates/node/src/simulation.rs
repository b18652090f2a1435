//! Run a whole ring inside one process.
//!
//! Every member gets its own [ChordNode] and talks to the others only through a
//! [LocalTransport], so messages go through the same encoding as between processes.
use std::collections::HashMap;
use std::sync::Arc;

use chord_core::dht::invariant::check_ring;
use chord_core::dht::Did;
use chord_core::dht::IdSpace;
use chord_core::dht::MemberRef;
use chord_core::dht::RingMember;
use chord_core::inspect::MemberInspect;
use chord_core::node::ChordNode;
use chord_core::transport::LocalTransport;
use chord_core::transport::RequestHandler;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;

/// Owner of a key, as resolved from every serving member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupReport {
    pub key: String,
    pub id: String,
    pub owner: MemberRef,
}

pub struct RingSimulation {
    space: IdSpace,
    transport: LocalTransport,
    nodes: Vec<Arc<ChordNode>>,
    /// Joins are serialized, overlapping joins are not supported by the protocol.
    join_lock: Mutex<()>,
    verify: bool,
}

impl RingSimulation {
    pub fn new(space: IdSpace, verify: bool) -> Self {
        Self {
            space,
            transport: LocalTransport::new(),
            nodes: vec![],
            join_lock: Mutex::new(()),
            verify,
        }
    }

    /// Create every configured member. Nothing is joined yet, see [Self::bootstrap].
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let mut sim = Self::new(config.space()?, config.verify);
        let mut taken: HashMap<Did, String> = HashMap::new();
        for m in config.members.iter() {
            let node = sim.add_member(&m.address, m.did);
            if let Some(other) = taken.insert(node.did(), m.address.clone()) {
                return Err(Error::DuplicateDid(
                    node.did().to_string(),
                    other,
                    m.address.clone(),
                ));
            }
        }
        Ok(sim)
    }

    /// Create a member and make it reachable on the local transport.
    pub fn add_member(&mut self, address: &str, did: Option<u64>) -> Arc<ChordNode> {
        let member = match did {
            Some(did) => RingMember::new_with_did(Did::from(did), address, self.space),
            None => RingMember::new(address, self.space),
        };
        let node = Arc::new(ChordNode::new(
            Arc::new(member),
            Arc::new(self.transport.clone()),
        ));
        self.transport
            .register(address, node.clone() as Arc<dyn RequestHandler>);
        tracing::debug!("simulation added member {}", node.member_ref());
        self.nodes.push(node.clone());
        node
    }

    pub fn space(&self) -> IdSpace {
        self.space
    }

    pub fn nodes(&self) -> &[Arc<ChordNode>] {
        &self.nodes
    }

    pub fn transport(&self) -> &LocalTransport {
        &self.transport
    }

    fn node(&self, index: usize) -> Result<&Arc<ChordNode>> {
        self.nodes
            .get(index)
            .ok_or(Error::ContactOutOfRange(index, self.nodes.len()))
    }

    /// Seed the ring with the first member and join the others in order.
    /// Members up to `contact` join through the seed, the rest through `contact`.
    pub async fn bootstrap(&self, contact: usize) -> Result<()> {
        let seed = self.node(0)?;
        seed.create()?;
        tracing::info!("ring seeded by {}", seed.member_ref());
        if self.verify {
            self.verify()?;
        }
        for i in 1..self.nodes.len() {
            let via = if i <= contact { 0 } else { contact };
            self.join(i, Some(via)).await?;
        }
        Ok(())
    }

    /// Join member `index` through member `contact`, or without contact.
    pub async fn join(&self, index: usize, contact: Option<usize>) -> Result<()> {
        let node = self.node(index)?;
        let contact = match contact {
            Some(c) => Some(self.node(c)?.member_ref()),
            None => None,
        };
        let _guard = self.join_lock.lock().await;
        node.join(contact).await?;
        if self.verify {
            self.verify()?;
        }
        Ok(())
    }

    /// Check every member that already serves against the brute force oracle.
    pub fn verify(&self) -> Result<()> {
        let mut topology = vec![];
        for node in self.nodes.iter() {
            let info = node.topo_info()?;
            if info.phase.is_serving() {
                topology.push(info);
            }
        }
        check_ring(self.space, &topology)?;
        tracing::debug!("ring of {} members verified", topology.len());
        Ok(())
    }

    /// Resolve `key` from every serving member. All answers must agree.
    pub async fn lookup(&self, key: &str) -> Result<LookupReport> {
        let id = self.space.key_id(key);
        let serving = self
            .nodes
            .iter()
            .filter(|n| n.member().ensure_serving().is_ok());
        let answers = futures::future::join_all(serving.map(|n| n.find_successor(id))).await;

        let mut owner: Option<MemberRef> = None;
        for answer in answers {
            let answer = answer?;
            match &owner {
                None => owner = Some(answer),
                Some(o) if *o == answer => {}
                Some(o) => {
                    return Err(chord_core::error::Error::RingInvariantViolation(format!(
                        "lookup of {key} answered both {o} and {answer}"
                    ))
                    .into())
                }
            }
        }
        let owner = owner.ok_or(Error::EmptyRing)?;
        tracing::info!("key {} ({}) is owned by {}", key, id, owner);
        Ok(LookupReport {
            key: key.to_string(),
            id: id.to_string(),
            owner,
        })
    }

    pub fn inspect(&self) -> Vec<MemberInspect> {
        self.nodes
            .iter()
            .map(|n| MemberInspect::inspect(n.member()))
            .collect()
    }
}
