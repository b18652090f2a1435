use std::collections::HashSet;
use std::sync::Arc;

use crate::dht::Did;
use crate::dht::IdSpace;
use crate::dht::RingMember;
use crate::dht::TopoInfo;
use crate::error::Result;
use crate::node::ChordNode;
use crate::transport::LocalTransport;
use crate::transport::RequestHandler;

mod test_join;

/// Create a node with a fixed did and register it on `hub`.
pub fn gen_node(hub: &LocalTransport, space: IdSpace, did: u64) -> Arc<ChordNode> {
    let address = format!("10.0.{}.{}:8000", did / 256, did % 256);
    let member = Arc::new(RingMember::new_with_did(Did::from(did), address, space));
    register(hub, member)
}

/// Create a node whose did is the hash of its address and register it on `hub`.
pub fn gen_hashed_node(hub: &LocalTransport, space: IdSpace, port: u16) -> Arc<ChordNode> {
    let member = Arc::new(RingMember::new(format!("127.0.0.1:{port}"), space));
    register(hub, member)
}

fn register(hub: &LocalTransport, member: Arc<RingMember>) -> Arc<ChordNode> {
    let address = member.address.clone();
    let node = Arc::new(ChordNode::new(member, Arc::new(hub.clone())));
    hub.register(address, node.clone() as Arc<dyn RequestHandler>);
    node
}

/// Seed a ring with the first did and join the others one by one through the seed.
pub async fn gen_ring(
    hub: &LocalTransport,
    space: IdSpace,
    dids: &[u64],
) -> Result<Vec<Arc<ChordNode>>> {
    let mut nodes: Vec<Arc<ChordNode>> = vec![];
    for did in dids {
        let node = gen_node(hub, space, *did);
        match nodes.first() {
            None => node.create()?,
            Some(seed) => node.join(Some(seed.member_ref())).await?,
        }
        nodes.push(node);
    }
    Ok(nodes)
}

/// Hashed nodes on ports starting from `base`, skipping identifier collisions.
pub fn gen_hashed_nodes(
    hub: &LocalTransport,
    space: IdSpace,
    n: usize,
    base: u16,
) -> Vec<Arc<ChordNode>> {
    let mut seen = HashSet::new();
    let mut nodes = vec![];
    let mut port = base;
    while nodes.len() < n {
        let node = gen_hashed_node(hub, space, port);
        if seen.insert(node.did()) {
            nodes.push(node);
        } else {
            hub.unregister(&node.member().address);
        }
        port += 1;
    }
    nodes
}

pub fn topo(nodes: &[Arc<ChordNode>]) -> Result<Vec<TopoInfo>> {
    nodes.iter().map(|n| n.topo_info()).collect()
}

pub fn did(id: u64) -> Did {
    Did::from(id)
}
