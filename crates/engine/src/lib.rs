//! RewardCraft Engine
//!
//! Pure reconciliation of a claimant's allocation across the latest
//! computed root and the root the contract currently accepts, plus the
//! advisory countdown to the next publication.
//!
//! Nothing in here touches the network; callers fetch the inputs.

mod reconcile;
mod schedule;

pub use reconcile::reconcile;
pub use schedule::{format_countdown, next_publication_estimate, PublicationScheduler};
