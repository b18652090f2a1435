use chord_core::dht::Did;
use chord_core::dht::MemberPhase;
use chord_core::error::ErrorKind;

use crate::config::Config;
use crate::config::MemberConfig;
use crate::error::Error;
use crate::error::Result;
use crate::simulation::RingSimulation;

fn small_config(dids: &[u64]) -> Config {
    Config {
        id_bits: 3,
        members: dids
            .iter()
            .map(|d| MemberConfig {
                address: format!("10.0.0.{d}:8000"),
                did: Some(*d),
            })
            .collect(),
        contact: 0,
        verify: true,
        lookups: vec![],
    }
}

#[tokio::test]
async fn test_simulate_three_members() -> Result<()> {
    let sim = RingSimulation::from_config(&small_config(&[3, 1, 6]))?;
    sim.bootstrap(0).await?;
    sim.verify()?;

    for node in sim.nodes() {
        assert_eq!(node.find_successor(Did::from(5u64)).await?.did, Did::from(6u64));
    }

    let inspect = sim.inspect();
    assert_eq!(inspect.len(), 3);
    assert_eq!(inspect[0].phase, MemberPhase::Seeded);
    assert!(inspect[1..].iter().all(|x| x.phase == MemberPhase::Steady));
    assert_eq!(inspect[0].successor, Some(Did::from(6u64).to_string()));
    Ok(())
}

#[tokio::test]
async fn test_simulate_default_config() -> Result<()> {
    let config = Config::default();
    let sim = RingSimulation::from_config(&config)?;
    sim.bootstrap(config.contact).await?;

    for key in config.lookups.iter() {
        let report = sim.lookup(key).await?;
        assert_eq!(report.key, *key);
        let owner = sim
            .nodes()
            .iter()
            .find(|n| n.did() == report.owner.did)
            .expect("owner is a member");
        assert!(owner.member().is_responsible_for(sim.space().key_id(key))?);
    }
    Ok(())
}

#[tokio::test]
async fn test_bootstrap_through_later_contact() -> Result<()> {
    let mut config = small_config(&[0, 2, 4, 6, 1, 3, 5, 7]);
    config.contact = 3;
    let sim = RingSimulation::from_config(&config)?;
    sim.bootstrap(config.contact).await?;
    sim.verify()?;
    Ok(())
}

#[tokio::test]
async fn test_join_without_contact_is_configuration_error() -> Result<()> {
    let sim = RingSimulation::from_config(&small_config(&[3, 1, 6]))?;
    sim.nodes()[0].create()?;
    sim.join(1, Some(0)).await?;

    match sim.join(2, None).await {
        Err(Error::CoreError(e)) => assert_eq!(e.kind(), ErrorKind::Configuration),
        other => panic!("unexpected result {other:?}"),
    }
    // The two joined members still form a valid ring on their own.
    sim.verify()?;
    assert!(matches!(
        sim.join(2, Some(9)).await,
        Err(Error::ContactOutOfRange(9, 3))
    ));
    Ok(())
}

#[test]
fn test_duplicate_did_is_rejected() {
    let mut config = small_config(&[3, 1]);
    config.members.push(MemberConfig {
        address: "10.0.0.99:8000".to_string(),
        did: Some(11),
    });
    // 11 mod 8 = 3
    assert!(matches!(
        RingSimulation::from_config(&config),
        Err(Error::DuplicateDid(..))
    ));
}

#[tokio::test]
async fn test_lookup_with_offline_member() -> Result<()> {
    let sim = RingSimulation::from_config(&small_config(&[3, 1, 6]))?;
    sim.bootstrap(0).await?;
    sim.transport().set_offline("10.0.0.6:8000", true);

    // Keys routed through 6 fail, the others still resolve.
    let mut failed = 0;
    for i in 0..40 {
        match sim.lookup(&format!("key-{i}")).await {
            Ok(_) => {}
            Err(Error::CoreError(e)) => {
                assert_eq!(e.kind(), ErrorKind::RemoteCall);
                failed += 1;
            }
            Err(e) => panic!("unexpected error {e:?}"),
        }
    }
    assert!(failed > 0);
    Ok(())
}
