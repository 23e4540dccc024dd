//! Claimant session

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use rewardcraft_core::{encode_address, Address, ClaimRequest, EligibilityResult, Result};
use rewardcraft_engine::{reconcile, PublicationScheduler};
use rewardcraft_settlement::{ChainStateReader, ClaimSubmitter};
use rewardcraft_store::{HttpRootSource, MerkleRootStore, RootSource};

use crate::{ClaimCoordinator, ClaimHandle};

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Account whose rewards are tracked
    pub claimant: Address,
    /// Reward contract
    pub contract_address: Address,
    /// Chain the contract lives on
    pub required_chain_id: u64,
    /// Base URL serving `latest.json` and `{root}.json`
    pub merkle_base_url: String,
    /// Expected time between root publications
    pub publication_cadence_secs: u64,
}

/// Result of one refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub result: EligibilityResult,
    /// Coordinator generation when the refresh started
    pub generation: u64,
    /// Time until the next expected publication, only while rewards are pending
    pub countdown: Option<Duration>,
}

impl Snapshot {
    pub fn claim_request(&self) -> Result<ClaimRequest> {
        self.result.claim_request(self.generation)
    }
}

/// One claimant against one contract.
pub struct RewardsSession<S, C> {
    config: SessionConfig,
    store: MerkleRootStore<S>,
    chain: Arc<C>,
    coordinator: ClaimCoordinator<C>,
    scheduler: PublicationScheduler,
}

impl<C> RewardsSession<HttpRootSource, C>
where
    C: ChainStateReader + ClaimSubmitter + 'static,
{
    /// Session fetching root documents from `config.merkle_base_url`.
    pub fn http(config: SessionConfig, chain: C) -> Self {
        let source = HttpRootSource::new(config.merkle_base_url.clone());
        Self::new(config, source, Arc::new(chain))
    }
}

impl<S, C> RewardsSession<S, C>
where
    S: RootSource,
    C: ChainStateReader + ClaimSubmitter + 'static,
{
    pub fn new(config: SessionConfig, source: S, chain: Arc<C>) -> Self {
        info!(
            "Rewards session for {} on chain {}",
            encode_address(&config.claimant),
            config.required_chain_id
        );
        Self {
            scheduler: PublicationScheduler::new(config.publication_cadence_secs),
            store: MerkleRootStore::new(source),
            coordinator: ClaimCoordinator::new(chain.clone(), config.required_chain_id),
            chain,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &MerkleRootStore<S> {
        &self.store
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn coordinator(&self) -> &ClaimCoordinator<C> {
        &self.coordinator
    }

    /// Re-read both sides and reconcile.
    ///
    /// The latest document and the contract state are read concurrently;
    /// either failing fails the whole refresh.
    pub async fn refresh(&self) -> Result<Snapshot> {
        let generation = self.coordinator.generation();
        let claimant = &self.config.claimant;

        let (latest, onchain) = tokio::try_join!(
            self.store.fetch_latest(),
            self.chain.read_state(
                &self.config.contract_address,
                self.config.required_chain_id,
                claimant,
            ),
        )?;

        let roots = self
            .store
            .snapshot_with(latest, onchain.published_root)
            .await?;

        let result = reconcile(
            claimant,
            &roots.latest,
            &onchain,
            roots.latest_leaf(claimant),
            roots.published_leaf(claimant),
        )?;

        let countdown = if result.has_pending() {
            roots
                .published
                .as_ref()
                .and_then(|doc| doc.published_at_epoch)
                .map(|at| self.scheduler.estimate(at))
        } else {
            None
        };

        debug!(
            "Refreshed {} at generation {}: claimable {}, pending {}",
            encode_address(claimant),
            generation,
            result.claimable_amount,
            result.unclaimable_amount
        );

        Ok(Snapshot {
            result,
            generation,
            countdown,
        })
    }

    /// Submit a claim built from `snapshot`.
    pub fn claim(&self, snapshot: &Snapshot) -> Result<ClaimHandle> {
        self.coordinator.submit_claim(snapshot.claim_request()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use rewardcraft_core::{Amount, LeafEntry, RewardsError, RootDocument};
    use rewardcraft_merkle::MerkleTree;
    use rewardcraft_settlement::{SettlementClient, SettlementConfig};
    use rewardcraft_store::StaticRootSource;

    const ALICE: Address = [0x11; 20];
    const CONTRACT: Address = [0xCC; 20];

    fn document(entries: &[(Address, Amount)], published_at_epoch: Option<u64>) -> RootDocument {
        let (root, leaves) = MerkleTree::leaf_entries(entries);
        RootDocument {
            root,
            total_amount: entries.iter().map(|(_, a)| a).sum(),
            published_at_epoch,
            leaves: leaves
                .into_iter()
                .map(|l: LeafEntry| (l.address, l))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            claimant: ALICE,
            contract_address: CONTRACT,
            required_chain_id: 1,
            merkle_base_url: String::new(),
            publication_cadence_secs: 7 * 86_400,
        }
    }

    fn session() -> (
        RewardsSession<StaticRootSource, SettlementClient>,
        RootDocument,
        RootDocument,
    ) {
        let published = document(&[(ALICE, 600), ([0x22; 20], 250)], Some(1_700_000_000));
        let latest = document(&[(ALICE, 1000), ([0x22; 20], 250)], Some(1_700_600_000));

        let source = StaticRootSource::new();
        source.insert(published.clone());
        source.publish(latest.clone());

        let chain = SettlementClient::new(SettlementConfig::mock());
        chain.set_mock_root(Some(published.root));

        (RewardsSession::new(config(), source, Arc::new(chain)), published, latest)
    }

    #[tokio::test]
    async fn test_refresh_reconciles() {
        let (session, published, latest) = session();

        let snapshot = session.refresh().await.unwrap();
        assert_eq!(snapshot.generation, 0);
        assert_eq!(snapshot.result.claimable_amount, 600);
        assert_eq!(snapshot.result.unclaimable_amount, 400);
        assert_eq!(snapshot.result.onchain_root, Some(published.root));
        assert_eq!(snapshot.result.latest_root, latest.root);
        // Published in 2023 with a weekly cadence: long overdue
        assert_eq!(snapshot.countdown, Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_wrong_network_fails_refresh() {
        let (session, _, _) = session();
        session.chain().set_mock_chain_id(137);

        let err = session.refresh().await.unwrap_err();
        assert_eq!(err, RewardsError::WrongNetwork { expected: 1, actual: 137 });
    }

    #[tokio::test]
    async fn test_network_switch_before_claim() {
        let (session, _, _) = session();
        let snapshot = session.refresh().await.unwrap();
        assert_eq!(snapshot.claim_request().unwrap().chain_id, 1);

        session.chain().set_mock_chain_id(137);
        let err = session.claim(&snapshot).unwrap().wait().await.unwrap_err();
        assert_eq!(err, RewardsError::WrongNetwork { expected: 1, actual: 137 });
        assert_eq!(session.chain().mock_claim_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_zero() {
        let (session, _, _) = session();
        session
            .store()
            .source()
            .set_failure(Some(RewardsError::DataUnavailable("offline".into())));

        let err = session.refresh().await.unwrap_err();
        assert_eq!(err, RewardsError::DataUnavailable("offline".into()));
    }

    #[tokio::test]
    async fn test_claim_then_refresh() {
        let (session, _, _) = session();

        let snapshot = session.refresh().await.unwrap();
        session.claim(&snapshot).unwrap().wait().await.unwrap();

        let after = session.refresh().await.unwrap();
        assert_eq!(after.generation, 1);
        assert_eq!(after.result.claimable_amount, 0);
        assert_eq!(after.result.already_claimed, 600);
        assert_eq!(after.result.unclaimable_amount, 400);

        // The pre-claim snapshot can no longer be used
        let err = session.claim(&snapshot).unwrap_err();
        assert_eq!(err, RewardsError::StaleSnapshot { snapshot: 0, current: 1 });

        // Nothing left under the published root
        assert_eq!(session.claim(&after).unwrap_err(), RewardsError::NothingToClaim);
    }

    #[tokio::test]
    async fn test_no_countdown_without_pending() {
        let (session, _, latest) = session();
        session.chain().set_mock_root(Some(latest.root));

        let snapshot = session.refresh().await.unwrap();
        assert_eq!(snapshot.result.claimable_amount, 1000);
        assert_eq!(snapshot.result.unclaimable_amount, 0);
        assert_eq!(snapshot.countdown, None);
    }
}
