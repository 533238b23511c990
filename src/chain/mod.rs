pub mod lcd;
pub mod simulated;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::provisioner::models::AccountInfo;

pub use lcd::LcdClient;
pub use simulated::{FaultPlan, SimulatedChain, TransferRecord};

/// On-chain identity of an account as reported by the query primitive
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainAccount {
    /// Numeric identifier assigned by the chain
    pub account_number: u64,

    /// Next sequence the chain expects from this account
    pub sequence: u64,
}

/// Result of a broadcast transfer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferReceipt {
    pub tx_hash: String,
    pub height: Option<u64>,
}

/// Key management, chain query and transfer broadcast primitives.
///
/// Every call may block for an arbitrary amount of wall-clock time; callers
/// are expected to bound them.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Create a key named `name` protected by `password`, returning its address
    async fn create_key(&self, name: &str, password: &str) -> Result<String>;

    /// Fetch account number and sequence for `address`
    async fn query_account(&self, address: &str) -> Result<ChainAccount>;

    /// Sign and broadcast a transfer of `amount` from `sender` to `recipient`.
    ///
    /// `sender` must carry its current `account_number` and `sequence`; the
    /// chain rejects a stale sequence. An empty `amount` lets the client pick
    /// its default.
    async fn submit_transfer(
        &self,
        sender: &AccountInfo,
        recipient: &str,
        amount: &str,
    ) -> Result<TransferReceipt>;
}
