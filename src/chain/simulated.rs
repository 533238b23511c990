use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::provisioner::models::AccountInfo;

use super::{ChainAccount, ChainClient, TransferReceipt};

const ADDRESS_PREFIX: &str = "sim1";
const ADDRESS_BODY_LEN: usize = 38;

/// Faults the simulated chain injects on purpose
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// Probability in `[0, 1]` that any call fails outright
    pub failure_rate: f64,

    /// Key names whose creation fails
    pub failing_keys: HashSet<String>,

    /// Key names whose creation never completes
    pub stalled_keys: HashSet<String>,

    /// Key names (of recipients) whose incoming transfers are rejected
    pub rejected_recipients: HashSet<String>,

    /// Addresses or key names the query primitive refuses to answer for
    pub hidden_accounts: HashSet<String>,
}

/// One attempted transfer, accepted or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub sender: String,
    pub recipient: String,
    pub sequence: u64,
    pub accepted: bool,
}

#[derive(Debug, Default)]
struct Ledger {
    /// key name -> address
    keys: HashMap<String, String>,
    /// address -> key name
    names: HashMap<String, String>,
    accounts: HashMap<String, ChainAccount>,
    next_account_number: u64,
    height: u64,
    transfers: Vec<TransferRecord>,
}

/// In-memory chain enforcing per-sender sequence ordering
#[derive(Debug, Default)]
pub struct SimulatedChain {
    ledger: Mutex<Ledger>,
    faults: FaultPlan,
}

impl SimulatedChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fault plan
    pub fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    /// Seed an existing on-chain account, e.g. a funding account
    pub fn with_account(self, address: impl Into<String>, sequence: u64) -> Self {
        {
            let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
            let account_number = ledger.next_account_number;
            ledger.next_account_number += 1;
            ledger.accounts.insert(
                address.into(),
                ChainAccount {
                    account_number,
                    sequence,
                },
            );
        }
        self
    }

    /// Every transfer attempt seen so far, in submission order
    pub fn transfer_log(&self) -> Vec<TransferRecord> {
        self.lock().map(|l| l.transfers.clone()).unwrap_or_default()
    }

    /// Accepted sequences of `sender`, in submission order
    pub fn accepted_sequences(&self, sender: &str) -> Vec<u64> {
        self.transfer_log()
            .into_iter()
            .filter(|t| t.sender == sender && t.accepted)
            .map(|t| t.sequence)
            .collect()
    }

    /// Current on-chain state of `address`, if it exists
    pub fn account(&self, address: &str) -> Option<ChainAccount> {
        self.lock().ok().and_then(|l| l.accounts.get(address).copied())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Ledger>> {
        self.ledger
            .lock()
            .map_err(|_| anyhow!("simulated ledger lock poisoned"))
    }

    fn roll_failure(&self, call: &str) -> Result<()> {
        if self.faults.failure_rate > 0.0
            && rand::thread_rng().gen_bool(self.faults.failure_rate.min(1.0))
        {
            return Err(anyhow!("injected failure in {}", call));
        }
        Ok(())
    }

    fn random_address() -> String {
        let body: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ADDRESS_BODY_LEN)
            .map(|c| (c as char).to_ascii_lowercase())
            .collect();
        format!("{}{}", ADDRESS_PREFIX, body)
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    async fn create_key(&self, name: &str, _password: &str) -> Result<String> {
        if self.faults.stalled_keys.contains(name) {
            std::future::pending::<()>().await;
        }
        self.roll_failure("create_key")?;
        if self.faults.failing_keys.contains(name) {
            return Err(anyhow!("keybase refused to create {}", name));
        }

        let mut ledger = self.lock()?;
        if ledger.keys.contains_key(name) {
            return Err(anyhow!("key {} already exists", name));
        }
        let address = Self::random_address();
        ledger.keys.insert(name.to_string(), address.clone());
        ledger.names.insert(address.clone(), name.to_string());
        Ok(address)
    }

    async fn query_account(&self, address: &str) -> Result<ChainAccount> {
        self.roll_failure("query_account")?;
        let ledger = self.lock()?;
        let hidden = self.faults.hidden_accounts.contains(address)
            || ledger
                .names
                .get(address)
                .is_some_and(|name| self.faults.hidden_accounts.contains(name));
        if hidden {
            return Err(anyhow!("account {} is unavailable", address));
        }
        ledger
            .accounts
            .get(address)
            .copied()
            .ok_or_else(|| anyhow!("account {} not found", address))
    }

    async fn submit_transfer(
        &self,
        sender: &AccountInfo,
        recipient: &str,
        _amount: &str,
    ) -> Result<TransferReceipt> {
        let sequence = sender
            .sequence
            .ok_or_else(|| anyhow!("sender {} has no sequence", sender.address))?;

        let mut ledger = self.lock()?;
        let mut record = TransferRecord {
            sender: sender.address.clone(),
            recipient: recipient.to_string(),
            sequence,
            accepted: false,
        };

        let rejected = ledger
            .names
            .get(recipient)
            .is_some_and(|name| self.faults.rejected_recipients.contains(name));
        if rejected || self.roll_failure("submit_transfer").is_err() {
            ledger.transfers.push(record);
            return Err(anyhow!("transfer to {} rejected", recipient));
        }

        let Some(on_chain) = ledger.accounts.get(&sender.address).copied() else {
            ledger.transfers.push(record);
            return Err(anyhow!("sender {} not found", sender.address));
        };
        if sender.account_number != Some(on_chain.account_number) {
            ledger.transfers.push(record);
            return Err(anyhow!(
                "account number mismatch for {}: expected {}, got {:?}",
                sender.address,
                on_chain.account_number,
                sender.account_number
            ));
        }
        if on_chain.sequence != sequence {
            ledger.transfers.push(record);
            return Err(anyhow!(
                "sequence mismatch for {}: expected {}, got {}",
                sender.address,
                on_chain.sequence,
                sequence
            ));
        }

        if let Some(account) = ledger.accounts.get_mut(&sender.address) {
            account.sequence += 1;
        }
        if !ledger.accounts.contains_key(recipient) {
            let account_number = ledger.next_account_number;
            ledger.next_account_number += 1;
            ledger.accounts.insert(
                recipient.to_string(),
                ChainAccount {
                    account_number,
                    sequence: 0,
                },
            );
        }
        ledger.height += 1;
        record.accepted = true;
        ledger.transfers.push(record);

        Ok(TransferReceipt {
            tx_hash: Uuid::new_v4().simple().to_string().to_uppercase(),
            height: Some(ledger.height),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(address: &str, account_number: u64, sequence: u64) -> AccountInfo {
        AccountInfo {
            local_name: "faucet".to_string(),
            address: address.to_string(),
            password: String::new(),
            account_number: Some(account_number),
            sequence: Some(sequence),
        }
    }

    #[tokio::test]
    async fn test_create_key_rejects_duplicates() {
        let chain = SimulatedChain::new();
        let address = chain.create_key("alice", "pw").await.unwrap();
        assert!(address.starts_with(ADDRESS_PREFIX));
        assert_eq!(address.len(), ADDRESS_PREFIX.len() + ADDRESS_BODY_LEN);
        assert!(chain.create_key("alice", "pw").await.is_err());
    }

    #[tokio::test]
    async fn test_transfer_enforces_exact_sequence() {
        let chain = SimulatedChain::new().with_account("faucet", 5);
        let number = chain.account("faucet").unwrap().account_number;

        assert!(chain
            .submit_transfer(&sender("faucet", number, 6), "bob", "")
            .await
            .is_err());
        chain
            .submit_transfer(&sender("faucet", number, 5), "bob", "")
            .await
            .unwrap();
        chain
            .submit_transfer(&sender("faucet", number, 6), "carol", "")
            .await
            .unwrap();

        assert_eq!(chain.accepted_sequences("faucet"), vec![5, 6]);
        assert_eq!(chain.account("faucet").unwrap().sequence, 7);
        assert_eq!(chain.account("bob").unwrap().sequence, 0);
        assert_eq!(chain.transfer_log().len(), 3);
    }

    #[tokio::test]
    async fn test_unfunded_account_is_not_queryable() {
        let chain = SimulatedChain::new();
        let address = chain.create_key("dave", "pw").await.unwrap();
        assert!(chain.query_account(&address).await.is_err());
    }

    #[tokio::test]
    async fn test_fault_plan_hides_and_rejects_by_key_name() {
        let faults = FaultPlan {
            rejected_recipients: ["erin".to_string()].into(),
            hidden_accounts: ["faucet".to_string()].into(),
            ..Default::default()
        };
        let chain = SimulatedChain::new()
            .with_faults(faults)
            .with_account("faucet", 0);
        let number = chain.account("faucet").unwrap().account_number;
        let erin = chain.create_key("erin", "pw").await.unwrap();

        assert!(chain.query_account("faucet").await.is_err());
        assert!(chain
            .submit_transfer(&sender("faucet", number, 0), &erin, "")
            .await
            .is_err());
        assert_eq!(chain.account("faucet").unwrap().sequence, 0);
    }
}
