use std::sync::Arc;

use crate::dht::invariant::check_ring;
use crate::dht::Chord;
use crate::dht::IdSpace;
use crate::dht::MemberPhase;
use crate::dht::MemberRef;
use crate::dht::RingAction;
use crate::dht::RingMember;
use crate::dht::RingRemoteAction;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::Result;
use crate::node::ChordNode;
use crate::tests::default::did;
use crate::tests::default::gen_hashed_nodes;
use crate::tests::default::gen_node;
use crate::tests::default::gen_ring;
use crate::tests::default::topo;
use crate::transport::LocalTransport;

fn dids(fingers: &[Option<MemberRef>]) -> Vec<u64> {
    fingers
        .iter()
        .map(|x| x.as_ref().map(|m| m.did.to_low_u64_be()).unwrap_or(u64::MAX))
        .collect()
}

#[tokio::test]
async fn test_seed_points_to_itself() -> Result<()> {
    for bits in [1u16, 3, 8, 64, 160] {
        let space = IdSpace::new(bits)?;
        let hub = LocalTransport::new();
        let a = gen_node(&hub, space, 1);
        a.create()?;

        let info = a.topo_info()?;
        assert_eq!(info.phase, MemberPhase::Seeded);
        assert_eq!(info.successor, Some(a.member_ref()));
        assert_eq!(info.predecessor, None);
        assert_eq!(info.fingers, vec![Some(a.member_ref()); bits as usize]);
        check_ring(space, &[info])?;

        assert_eq!(a.find_successor(did(0)).await?, a.member_ref());
        assert!(matches!(a.create(), Err(Error::AlreadyInitialized(_))));
    }
    Ok(())
}

#[tokio::test]
async fn test_three_members_on_eight_ids() -> Result<()> {
    let space = IdSpace::new(3)?;
    let hub = LocalTransport::new();

    let a = gen_node(&hub, space, 3);
    a.create()?;

    let b = gen_node(&hub, space, 1);
    b.join(Some(a.member_ref())).await?;
    assert_eq!(b.member().successor()?.did, did(3));
    assert_eq!(a.member().predecessor()?.map(|x| x.did), Some(did(1)));
    assert_eq!(a.member().successor()?.did, did(1));
    assert_eq!(b.member().predecessor()?.map(|x| x.did), Some(did(3)));
    assert_eq!(dids(&a.topo_info()?.fingers), vec![1, 1, 1]);
    assert_eq!(dids(&b.topo_info()?.fingers), vec![3, 3, 1]);
    check_ring(space, &topo(&[a.clone(), b.clone()])?)?;

    let c = gen_node(&hub, space, 6);
    c.join(Some(a.member_ref())).await?;
    assert_eq!(a.member().finger(0)?.did, did(6));
    assert_eq!(a.member().successor()?.did, did(6));
    assert_eq!(c.member().successor()?.did, did(1));
    assert_eq!(b.member().successor()?.did, did(3));
    assert_eq!(dids(&a.topo_info()?.fingers), vec![6, 6, 1]);
    assert_eq!(dids(&b.topo_info()?.fingers), vec![3, 3, 6]);
    assert_eq!(dids(&c.topo_info()?.fingers), vec![1, 1, 3]);

    let nodes = vec![a, b, c];
    check_ring(space, &topo(&nodes)?)?;
    for node in nodes.iter() {
        assert!(node.member().phase()?.is_serving());
        assert_eq!(node.find_successor(did(5)).await?.did, did(6));
    }
    Ok(())
}

#[tokio::test]
async fn test_member_exactly_power_of_two_behind_is_updated() -> Result<()> {
    // 3 is exactly 2^1 behind 5, so finger 1 of 3 (start 5) must become 5.
    let space = IdSpace::new(3)?;
    let hub = LocalTransport::new();
    let nodes = gen_ring(&hub, space, &[3, 5]).await?;
    assert_eq!(nodes[0].member().finger(1)?.did, did(5));
    check_ring(space, &topo(&nodes)?)?;
    Ok(())
}

#[tokio::test]
async fn test_serialized_joins_keep_ring_consistent() -> Result<()> {
    let space = IdSpace::new(6)?;
    let hub = LocalTransport::new();
    let nodes = gen_hashed_nodes(&hub, space, 16, 9000);

    nodes[0].create()?;
    for i in 1..nodes.len() {
        // Alternate contacts so that joins do not all go through the seed.
        let contact = nodes[(i * 7 + 3) % i].member_ref();
        nodes[i].join(Some(contact)).await?;
        check_ring(space, &topo(&nodes[..=i])?)?;
    }
    Ok(())
}

#[tokio::test]
async fn test_full_width_identifiers() -> Result<()> {
    let space = IdSpace::new(160)?;
    let hub = LocalTransport::new();
    let nodes = gen_hashed_nodes(&hub, space, 6, 7000);

    nodes[0].create()?;
    for node in nodes.iter().skip(1) {
        node.join(Some(nodes[0].member_ref())).await?;
    }
    check_ring(space, &topo(&nodes)?)?;
    Ok(())
}

#[tokio::test]
async fn test_dense_ring() -> Result<()> {
    // Every identifier taken, joined in a scrambled order.
    let space = IdSpace::new(4)?;
    let hub = LocalTransport::new();
    let order: Vec<u64> = (0..16).map(|i| (i * 5 + 3) % 16).collect();
    let nodes = gen_ring(&hub, space, &order).await?;
    check_ring(space, &topo(&nodes)?)?;
    for node in nodes.iter() {
        let me = node.did().to_low_u64_be();
        assert_eq!(node.member().successor()?.did, did((me + 1) % 16));
    }
    Ok(())
}

#[tokio::test]
async fn test_join_without_contact() -> Result<()> {
    let space = IdSpace::new(3)?;
    let hub = LocalTransport::new();
    let _ring = gen_ring(&hub, space, &[3, 1]).await?;

    let c = gen_node(&hub, space, 6);
    let err = c.join(None).await.unwrap_err();
    assert!(matches!(err, Error::JoinWithoutContact));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(c.member().phase()?, MemberPhase::Uninitialized);

    let err = c.join(Some(c.member_ref())).await.unwrap_err();
    assert!(matches!(err, Error::JoinWithSelf));

    let ghost = MemberRef::new(did(5), "10.9.9.9:8000");
    let err = c.join(Some(ghost)).await.unwrap_err();
    assert!(matches!(err, Error::ContactUnreachable(..)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(c.member().phase()?, MemberPhase::Uninitialized);
    Ok(())
}

#[tokio::test]
async fn test_join_twice() -> Result<()> {
    let space = IdSpace::new(3)?;
    let hub = LocalTransport::new();
    let nodes = gen_ring(&hub, space, &[3, 1]).await?;
    let err = nodes[1].join(Some(nodes[0].member_ref())).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyInitialized(_)));
    check_ring(space, &topo(&nodes)?)?;
    Ok(())
}

#[tokio::test]
async fn test_join_through_joining_member_is_refused() -> Result<()> {
    let space = IdSpace::new(3)?;
    let hub = LocalTransport::new();
    let _ring = gen_ring(&hub, space, &[3, 1]).await?;

    let half = gen_node(&hub, space, 5);
    half.member().begin_join()?;
    assert!(matches!(
        half.find_successor(did(0)).await,
        Err(Error::MemberNotReady(_))
    ));

    let c = gen_node(&hub, space, 6);
    let err = c.join(Some(half.member_ref())).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotReady);
    Ok(())
}

#[tokio::test]
async fn test_join_fails_on_offline_peer() -> Result<()> {
    let space = IdSpace::new(3)?;
    let hub = LocalTransport::new();
    let nodes = gen_ring(&hub, space, &[3, 1]).await?;
    hub.set_offline(&nodes[1].member().address, true);

    // Successor of 7 is 1, which is offline.
    let c = gen_node(&hub, space, 6);
    let err = c.join(Some(nodes[0].member_ref())).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteCall);
    Ok(())
}

#[tokio::test]
async fn test_propagation_stops_after_one_lap() -> Result<()> {
    // Two members whose predecessors point at each other and whose fingers all accept
    // the offer: the chain must stop once it comes back to the first member.
    let space = IdSpace::new(3)?;
    let hub = LocalTransport::new();
    let x = gen_node(&hub, space, 1);
    let y = gen_node(&hub, space, 5);
    x.create()?;
    y.create()?;
    x.member().set_predecessor(y.member_ref())?;
    y.member().set_predecessor(x.member_ref())?;

    let z = Arc::new(ChordNode::new(
        Arc::new(RingMember::new_with_did(did(3), "10.0.0.3:8000", space)),
        Arc::new(hub.clone()),
    ));
    z.propagate_finger_update(x.member_ref(), z.member_ref(), 2)
        .await?;
    assert_eq!(x.member().finger(2)?.did, did(3));
    assert_eq!(y.member().finger(2)?.did, did(3));
    Ok(())
}

#[tokio::test]
async fn test_remote_failure_keeps_kind() -> Result<()> {
    let space = IdSpace::new(3)?;
    let hub = LocalTransport::new();
    let nodes = gen_ring(&hub, space, &[3, 1]).await?;
    let outsider = gen_node(&hub, space, 6);

    let err = outsider
        .propagate_finger_update(nodes[0].member_ref(), outsider.member_ref(), 3)
        .await
        .unwrap_err();
    match err {
        Error::Remote { kind, .. } => assert_eq!(kind, ErrorKind::RingInconsistency),
        other => panic!("unexpected error {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_node_runs_local_operations() -> Result<()> {
    let space = IdSpace::new(3)?;
    let hub = LocalTransport::new();
    let nodes = gen_ring(&hub, space, &[3, 1, 6]).await?;

    // Fingers of 1 are [3, 3, 6].
    assert_eq!(nodes[1].closest_preceding_finger(did(0))?, nodes[2].member_ref());
    assert_eq!(nodes[1].closest_preceding_finger(did(2))?, nodes[1].member_ref());

    // Fingers of 3 are [6, 6, 1]. An outsider at 0 lies in [3, 1), so it replaces finger 2
    // and the offer continues to the predecessor, 1.
    let outsider = MemberRef::new(did(0), "10.0.0.0:8000");
    let act = nodes[0].update_finger_table(outsider.clone(), 2)?;
    assert!(act.is_remote());
    assert_eq!(
        act,
        RingAction::RemoteAction(
            nodes[1].member_ref(),
            RingRemoteAction::UpdateFingerTable(outsider.clone(), 2)
        )
    );
    assert_eq!(nodes[0].member().finger(2)?, outsider);

    // 6 already is finger 1 of 3, nothing changes.
    assert!(nodes[0]
        .update_finger_table(nodes[2].member_ref(), 1)?
        .is_none());
    Ok(())
}
