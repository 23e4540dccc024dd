//! Reconciliation integration tests
//!
//! Drives `RewardsSession::refresh` across root publications:
//! 1. Epoch progression (latest ahead of published, then caught up)
//! 2. Root documents served over HTTP, with caching of immutable roots
//! 3. Integrity failures surfaced instead of zero balances

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;

use rewardcraft_client::{RewardsSession, SessionConfig};
use rewardcraft_core::{encode_hash, parse_hash, Address, Amount, RewardsError, RootDocument};
use rewardcraft_merkle::{verify_leaf, MerkleTree};
use rewardcraft_settlement::{SettlementClient, SettlementConfig};
use rewardcraft_store::StaticRootSource;

const ALICE: Address = [0x11; 20];
const BOB: Address = [0x22; 20];
const CAROL: Address = [0x33; 20];
const DAVE: Address = [0x44; 20];
const CONTRACT: Address = [0xCC; 20];

fn document(entries: &[(Address, Amount)], published_at_epoch: Option<u64>) -> RootDocument {
    let (root, leaves) = MerkleTree::leaf_entries(entries);
    RootDocument {
        root,
        total_amount: entries.iter().map(|(_, a)| a).sum(),
        published_at_epoch,
        leaves: leaves.into_iter().map(|l| (l.address, l)).collect::<BTreeMap<_, _>>(),
    }
}

fn epoch_one() -> RootDocument {
    document(&[(ALICE, 600), (BOB, 250), (CAROL, 150)], Some(1_700_000_000))
}

fn epoch_two() -> RootDocument {
    document(
        &[(ALICE, 1000), (BOB, 250), (CAROL, 300), (DAVE, 50)],
        Some(1_700_604_800),
    )
}

fn config(claimant: Address) -> SessionConfig {
    SessionConfig {
        claimant,
        contract_address: CONTRACT,
        required_chain_id: 1,
        merkle_base_url: String::new(),
        publication_cadence_secs: 7 * 86_400,
    }
}

fn static_session(
    claimant: Address,
    source: StaticRootSource,
    chain: Arc<SettlementClient>,
) -> RewardsSession<StaticRootSource, SettlementClient> {
    RewardsSession::new(config(claimant), source, chain)
}

#[test]
fn test_fixture_roots_match_published_vectors() {
    assert_eq!(
        epoch_one().root,
        parse_hash("0x599c824e500962c3feb5bc0ec7a022410fb2b101e2a9b008acda431ab4dae189").unwrap()
    );
    assert_eq!(
        epoch_two().root,
        parse_hash("0xd52981b9620dd00d4b43f6f100cff12d7127b291bd646ae06658629e4f3eb83f").unwrap()
    );

    for doc in [epoch_one(), epoch_two()] {
        for leaf in doc.leaves.values() {
            assert!(verify_leaf(leaf, &doc.root));
        }
    }
}

#[tokio::test]
async fn test_epoch_progression() {
    rewardcraft_logging::init_test();

    let one = epoch_one();
    let two = epoch_two();

    let source = StaticRootSource::new();
    source.publish(one.clone());

    let chain = Arc::new(SettlementClient::new(SettlementConfig::mock()));
    let session = static_session(ALICE, source, chain.clone());

    // Nothing on-chain yet: everything is pending
    let snapshot = session.refresh().await.unwrap();
    assert_eq!(snapshot.result.claimable_amount, 0);
    assert_eq!(snapshot.result.unclaimable_amount, 600);
    assert_eq!(snapshot.countdown, None);

    // Epoch one published on-chain
    chain.set_mock_root(Some(one.root));
    let snapshot = session.refresh().await.unwrap();
    assert_eq!(snapshot.result.claimable_amount, 600);
    assert_eq!(snapshot.result.unclaimable_amount, 0);

    // Epoch two computed off-chain but not yet published
    session.store().source().publish(two.clone());
    let snapshot = session.refresh().await.unwrap();
    assert_eq!(snapshot.result.claimable_amount, 600);
    assert_eq!(snapshot.result.unclaimable_amount, 400);
    assert_eq!(snapshot.result.latest_root_total, 1600);
    assert_eq!(snapshot.countdown, Some(Duration::ZERO));

    // Epoch two published
    chain.set_mock_root(Some(two.root));
    let snapshot = session.refresh().await.unwrap();
    assert_eq!(snapshot.result.claimable_amount, 1000);
    assert_eq!(snapshot.result.unclaimable_amount, 0);
}

#[tokio::test]
async fn test_claimant_added_in_latest_epoch() {
    let source = StaticRootSource::new();
    source.insert(epoch_one());
    source.publish(epoch_two());

    let chain = Arc::new(SettlementClient::new(SettlementConfig::mock()));
    chain.set_mock_root(Some(epoch_one().root));

    let snapshot = static_session(DAVE, source, chain).refresh().await.unwrap();
    assert_eq!(snapshot.result.claimable_amount, 0);
    assert_eq!(snapshot.result.unclaimable_amount, 50);
    assert_eq!(snapshot.claim_request(), Err(RewardsError::NothingToClaim));
}

#[tokio::test]
async fn test_unknown_address_is_zero_not_error() {
    let source = StaticRootSource::new();
    source.insert(epoch_one());
    source.publish(epoch_two());

    let chain = Arc::new(SettlementClient::new(SettlementConfig::mock()));
    chain.set_mock_root(Some(epoch_one().root));

    let snapshot = static_session([0x99; 20], source, chain).refresh().await.unwrap();
    assert_eq!(snapshot.result.claimable_amount, 0);
    assert_eq!(snapshot.result.unclaimable_amount, 0);
    assert_eq!(snapshot.result.latest_root_total, 1600);
}

#[tokio::test]
async fn test_shrinking_allocation_rejected_at_ingestion() {
    let one = epoch_one();
    // Bob loses 50 in the next root; Alice is unaffected
    let bad = document(&[(ALICE, 700), (BOB, 200), (CAROL, 150)], None);

    let source = StaticRootSource::new();
    source.insert(one.clone());
    source.publish(bad);

    let chain = Arc::new(SettlementClient::new(SettlementConfig::mock()));
    chain.set_mock_root(Some(one.root));

    let err = static_session(ALICE, source, chain).refresh().await.unwrap_err();
    assert!(matches!(
        err,
        RewardsError::NonMonotonic { earlier: 250, later: 200, .. }
    ));
}

#[tokio::test]
async fn test_published_root_without_document() {
    let source = StaticRootSource::new();
    source.publish(epoch_two());

    let chain = Arc::new(SettlementClient::new(SettlementConfig::mock()));
    chain.set_mock_root(Some([0x5A; 32]));

    let err = static_session(ALICE, source, chain).refresh().await.unwrap_err();
    assert_eq!(err, RewardsError::RootNotFound(encode_hash(&[0x5A; 32])));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_http_session_caches_published_root() {
    let one = epoch_one();
    let two = epoch_two();

    let server = MockServer::start_async().await;
    let latest_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/rewards/latest.json");
            then.status(200)
                .header("content-type", "application/json")
                .body(serde_json::to_string(&two).unwrap());
        })
        .await;
    let published_path = format!("/rewards/{}.json", encode_hash(&one.root));
    let published_mock = server
        .mock_async(|when, then| {
            when.method(GET).path(published_path.as_str());
            then.status(200)
                .header("content-type", "application/json")
                .body(serde_json::to_string(&one).unwrap());
        })
        .await;

    let chain = SettlementClient::new(SettlementConfig::mock());
    chain.set_mock_root(Some(one.root));

    let mut session_config = config(ALICE);
    session_config.merkle_base_url = server.url("/rewards");
    let session = RewardsSession::http(session_config, chain);

    for _ in 0..3 {
        let snapshot = session.refresh().await.unwrap();
        assert_eq!(snapshot.result.claimable_amount, 600);
        assert_eq!(snapshot.result.unclaimable_amount, 400);
    }

    latest_mock.assert_hits_async(3).await;
    published_mock.assert_hits_async(1).await;
    assert_eq!(session.store().cached_count(), 2);
}

#[tokio::test]
async fn test_http_outage_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(503);
        })
        .await;

    let chain = SettlementClient::new(SettlementConfig::mock());
    let mut session_config = config(ALICE);
    session_config.merkle_base_url = server.base_url();
    let session = RewardsSession::http(session_config, chain);

    let err = session.refresh().await.unwrap_err();
    assert!(matches!(err, RewardsError::DataUnavailable(_)));
}
