//! Claim lifecycle

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use rewardcraft_core::{encode_hash, Amount, ClaimRequest, Hash, Result, RewardsError, TxHash};
use rewardcraft_settlement::ClaimSubmitter;

/// Claim state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimState {
    /// No claim outstanding
    Idle,
    /// Transaction dispatched, waiting for its outcome
    Submitting { root: Hash, amount: Amount },
    /// Transaction confirmed
    Confirmed { tx: TxHash, root: Hash, amount: Amount },
    /// Submission failed; the error is kept as reported
    Failed { error: RewardsError },
}

impl ClaimState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed { .. } | Self::Failed { .. })
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// Bumped on every terminal outcome
    generation: u64,
    /// `(root, cumulative amount)` pairs already confirmed
    confirmed: HashSet<(Hash, Amount)>,
}

/// Outcome of a submitted claim.
#[derive(Debug)]
pub struct ClaimHandle {
    outcome: oneshot::Receiver<Result<TxHash>>,
    cancel: Option<oneshot::Sender<()>>,
}

impl ClaimHandle {
    /// Wait for confirmation or failure.
    pub async fn wait(mut self) -> Result<TxHash> {
        self.outcome().await
    }

    /// Like [`wait`](Self::wait), keeping the handle so the claim can still
    /// be cancelled. Must not be called again once it has returned.
    pub async fn outcome(&mut self) -> Result<TxHash> {
        (&mut self.outcome).await.unwrap_or_else(|_| {
            Err(RewardsError::TransactionFailed(
                "claim task ended without an outcome".to_string(),
            ))
        })
    }

    /// Stop waiting for confirmation. The claim ends as `Failed`.
    ///
    /// A transaction already broadcast may still land on-chain; the next
    /// reconciliation will show it.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

/// Serialises claim submissions for one claimant.
///
/// At most one claim is outstanding. A terminal state is left by the next
/// submission or by [`reset`](Self::reset).
pub struct ClaimCoordinator<C> {
    submitter: Arc<C>,
    chain_id: u64,
    inner: Arc<Mutex<Inner>>,
    state_tx: Arc<watch::Sender<ClaimState>>,
}

impl<C> Clone for ClaimCoordinator<C> {
    fn clone(&self) -> Self {
        Self {
            submitter: self.submitter.clone(),
            chain_id: self.chain_id,
            inner: self.inner.clone(),
            state_tx: self.state_tx.clone(),
        }
    }
}

impl<C: ClaimSubmitter + 'static> ClaimCoordinator<C> {
    /// Coordinator for claims on `chain_id`.
    pub fn new(submitter: Arc<C>, chain_id: u64) -> Self {
        let (state_tx, _) = watch::channel(ClaimState::Idle);
        Self {
            submitter,
            chain_id,
            inner: Arc::new(Mutex::new(Inner::default())),
            state_tx: Arc::new(state_tx),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn state(&self) -> ClaimState {
        self.state_tx.borrow().clone()
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<ClaimState> {
        self.state_tx.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).generation
    }

    /// Return to `Idle` from a terminal state. No-op while submitting.
    pub fn reset(&self) {
        let _inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if self.state_tx.borrow().is_terminal() {
            self.state_tx.send_replace(ClaimState::Idle);
            debug!("Claim coordinator reset");
        }
    }

    /// Dispatch `request`.
    ///
    /// The state is `Submitting` when this returns; the outcome arrives
    /// through the handle and the watch channel. Must be called within a
    /// tokio runtime.
    pub fn submit_claim(&self, request: ClaimRequest) -> Result<ClaimHandle> {
        if request.amount == 0 {
            return Err(RewardsError::NothingToClaim);
        }
        if request.chain_id != self.chain_id {
            return Err(RewardsError::WrongNetwork {
                expected: self.chain_id,
                actual: request.chain_id,
            });
        }

        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if matches!(*self.state_tx.borrow(), ClaimState::Submitting { .. }) {
            return Err(RewardsError::AlreadyInProgress);
        }
        if request.generation < inner.generation {
            return Err(RewardsError::StaleSnapshot {
                snapshot: request.generation,
                current: inner.generation,
            });
        }
        if inner.confirmed.contains(&(request.root, request.cumulative_amount)) {
            return Err(RewardsError::AlreadyClaimed {
                root: encode_hash(&request.root),
                amount: request.cumulative_amount,
            });
        }

        self.state_tx.send_replace(ClaimState::Submitting {
            root: request.root,
            amount: request.amount,
        });
        info!("Claim submitting: {}", request.describe());

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        let submitter = self.submitter.clone();
        let shared = self.inner.clone();
        let state_tx = self.state_tx.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                result = submitter.submit_claim(&request) => result,
                Ok(()) = cancel_rx => Err(RewardsError::TransactionFailed(
                    "cancelled by user".to_string(),
                )),
            };

            {
                let mut inner = shared.lock().unwrap_or_else(|e| e.into_inner());
                inner.generation += 1;
                let next = match &outcome {
                    Ok(tx) => {
                        inner.confirmed.insert((request.root, request.cumulative_amount));
                        info!("Claim confirmed: {}", encode_hash(tx));
                        ClaimState::Confirmed {
                            tx: *tx,
                            root: request.root,
                            amount: request.amount,
                        }
                    }
                    Err(error) => {
                        warn!("Claim failed: {}", error);
                        ClaimState::Failed { error: error.clone() }
                    }
                };
                state_tx.send_replace(next);
            }

            let _ = outcome_tx.send(outcome);
        });

        drop(inner);
        Ok(ClaimHandle {
            outcome: outcome_rx,
            cancel: Some(cancel_tx),
        })
    }
}
