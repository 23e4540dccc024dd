use tracing::{debug, warn};

use rewardcraft_core::{
    encode_address, encode_hash, Address, Amount, EligibilityResult, Hash, LeafEntry,
    OnchainState, Result, RewardsError, RootDocument,
};
use rewardcraft_merkle::verify_leaf;

fn verified_amount(address: &Address, leaf: &LeafEntry, root: &Hash) -> Result<Amount> {
    if leaf.address != *address || !verify_leaf(leaf, root) {
        return Err(RewardsError::InvalidProof {
            address: encode_address(address),
            root: encode_hash(root),
        });
    }
    Ok(leaf.cumulative_amount)
}

/// Reconcile one claimant's latest and published allocations.
///
/// `leaf_latest` is the claimant's entry in `latest`, `leaf_published` the
/// entry in the document whose root the contract holds. Both are verified
/// against their roots before any amount is used. Withdrawals recorded in
/// `published.already_claimed` reduce the claimable amount but not the
/// pending one.
pub fn reconcile(
    address: &Address,
    latest: &RootDocument,
    published: &OnchainState,
    leaf_latest: Option<&LeafEntry>,
    leaf_published: Option<&LeafEntry>,
) -> Result<EligibilityResult> {
    let (published_amount, claim_leaf) = match (published.published_root, leaf_published) {
        (Some(root), Some(leaf)) => (verified_amount(address, leaf, &root)?, Some(leaf.clone())),
        _ => (0, None),
    };

    let latest_amount = match leaf_latest {
        Some(leaf) => Some(verified_amount(address, leaf, &latest.root)?),
        None => None,
    };

    // Cumulative allocations never shrink between roots.
    let latest_or_zero = latest_amount.unwrap_or(0);
    if claim_leaf.is_some() && (latest_amount.is_none() || latest_or_zero < published_amount) {
        return Err(RewardsError::NonMonotonic {
            address: encode_address(address),
            earlier_root: published.published_root.map(|r| encode_hash(&r)).unwrap_or_default(),
            earlier: published_amount,
            later_root: latest.root_hex(),
            later: latest_or_zero,
        });
    }
    let unclaimable_amount = latest_or_zero - published_amount;

    let claimable_amount = match published_amount.checked_sub(published.already_claimed) {
        Some(amount) => amount,
        None => {
            warn!(
                "{} withdrew {} but is allocated {} under the published root",
                encode_address(address),
                published.already_claimed,
                published_amount
            );
            0
        }
    };

    debug!(
        "Reconciled {}: claimable {}, pending {}",
        encode_address(address),
        claimable_amount,
        unclaimable_amount
    );

    Ok(EligibilityResult {
        address: *address,
        claimable_amount,
        unclaimable_amount,
        latest_root_total: latest.total_amount,
        latest_root: latest.root,
        onchain_root: published.published_root,
        chain_id: published.chain_id,
        published_amount,
        already_claimed: published.already_claimed,
        claim_leaf,
    })
}
