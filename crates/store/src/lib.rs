//! RewardCraft Store
//!
//! Fetches and caches published root documents.
//!
//! Documents are immutable once fetched and cached by root hash; only the
//! latest pointer moves. A fetch failure is always surfaced as an error so
//! callers can tell "no rewards" apart from "couldn't check".

mod source;

pub use source::{HttpRootSource, RootSource, StaticRootSource};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use rewardcraft_core::{
    encode_address, encode_hash, Address, Hash, LeafEntry, Result, RewardsError, RootDocument,
};

/// Latest document plus the document for the on-chain root, fetched together.
#[derive(Debug, Clone)]
pub struct RootSnapshot {
    pub latest: Arc<RootDocument>,
    /// `None` when nothing is published on-chain yet.
    pub published: Option<Arc<RootDocument>>,
}

impl RootSnapshot {
    pub fn latest_leaf(&self, address: &Address) -> Option<&LeafEntry> {
        self.latest.leaf(address)
    }

    pub fn published_leaf(&self, address: &Address) -> Option<&LeafEntry> {
        self.published.as_ref().and_then(|doc| doc.leaf(address))
    }
}

/// Check that `later` never allocates less than `earlier` to any address.
pub fn check_progression(earlier: &RootDocument, later: &RootDocument) -> Result<()> {
    for (address, leaf) in &earlier.leaves {
        let later_amount = later.leaf(address).map_or(0, |l| l.cumulative_amount);
        if later_amount < leaf.cumulative_amount {
            return Err(RewardsError::NonMonotonic {
                address: encode_address(address),
                earlier_root: earlier.root_hex(),
                earlier: leaf.cumulative_amount,
                later_root: later.root_hex(),
                later: later_amount,
            });
        }
    }
    Ok(())
}

/// Caching root document store.
pub struct MerkleRootStore<S> {
    source: S,
    cache: RwLock<HashMap<Hash, Arc<RootDocument>>>,
    latest: RwLock<Option<Hash>>,
}

impl<S: RootSource> MerkleRootStore<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
            latest: RwLock::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Root of the most recently fetched latest document.
    pub fn latest_root(&self) -> Option<Hash> {
        *self.latest.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn cached_count(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn cached(&self, root: &Hash) -> Option<Arc<RootDocument>> {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(root)
            .cloned()
    }

    /// Insert a freshly fetched document, keeping the first copy of a root.
    fn ingest(&self, document: RootDocument) -> Arc<RootDocument> {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = cache.get(&document.root) {
            debug!("Root {} already cached", document.root_hex());
            return existing.clone();
        }

        match document.leaf_sum() {
            Some(sum) if sum == document.total_amount => {}
            Some(sum) => warn!(
                "Root {} total {} differs from leaf sum {}",
                document.root_hex(),
                document.total_amount,
                sum,
            ),
            None => warn!("Root {} leaf sum overflows", document.root_hex()),
        }

        info!(
            "Cached root {} from {} ({} leaves, total {})",
            document.root_hex(),
            self.source.source_name(),
            document.leaves.len(),
            document.total_amount,
        );
        let document = Arc::new(document);
        cache.insert(document.root, document.clone());
        document
    }

    /// Fetch the latest document and move the latest pointer to it.
    pub async fn fetch_latest(&self) -> Result<Arc<RootDocument>> {
        let document = self.source.fetch_latest().await?;
        let document = self.ingest(document);

        let mut latest = self.latest.write().unwrap_or_else(|e| e.into_inner());
        if *latest != Some(document.root) {
            info!("Latest root is now {}", document.root_hex());
            *latest = Some(document.root);
        }
        Ok(document)
    }

    /// Fetch the document for `root`, from cache when already seen.
    pub async fn fetch_by_root(&self, root: &Hash) -> Result<Arc<RootDocument>> {
        if let Some(document) = self.cached(root) {
            debug!("Cache hit for root {}", encode_hash(root));
            return Ok(document);
        }

        let document = self.source.fetch_root(root).await?;
        if document.root != *root {
            return Err(RewardsError::DataUnavailable(format!(
                "document requested for root {} declares root {}",
                encode_hash(root),
                document.root_hex(),
            )));
        }
        Ok(self.ingest(document))
    }

    /// The claimant's leaf under `root`, `None` when they have no allocation.
    pub async fn fetch_leaf_for(&self, address: &Address, root: &Hash) -> Result<Option<LeafEntry>> {
        let document = self.fetch_by_root(root).await?;
        Ok(document.leaf(address).cloned())
    }

    /// Fetch the latest document and the document for `published_root`.
    ///
    /// Rejects the pair when the latest root allocates less than the
    /// published root to any address.
    pub async fn fetch_snapshot(&self, published_root: Option<Hash>) -> Result<RootSnapshot> {
        let latest = self.fetch_latest().await?;
        self.snapshot_with(latest, published_root).await
    }

    /// Pair an already fetched latest document with the published one.
    pub async fn snapshot_with(
        &self,
        latest: Arc<RootDocument>,
        published_root: Option<Hash>,
    ) -> Result<RootSnapshot> {
        let published = match published_root {
            None => None,
            Some(root) if root == latest.root => Some(latest.clone()),
            Some(root) => {
                let published = self.fetch_by_root(&root).await?;
                check_progression(&published, &latest)?;
                Some(published)
            }
        };

        Ok(RootSnapshot { latest, published })
    }
}
