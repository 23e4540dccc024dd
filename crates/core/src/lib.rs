//! RewardCraft Core Types
//!
//! Shared data model for Merkle reward reconciliation: root documents,
//! leaves, on-chain state, eligibility results, claim requests and the
//! error taxonomy every other crate reports through.

mod amount;
pub mod encoding;
mod error;
mod types;

pub use amount::format_token_amount;
pub use encoding::{encode_address, encode_hash, parse_address, parse_amount, parse_hash};
pub use error::*;
pub use types::*;
