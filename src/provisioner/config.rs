use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::error::ProvisionError;
use super::models::AccountInfo;
use super::settlement::SettlementPolicy;

pub const ENV_LCD_URL: &str = "PROVISIONER_LCD_URL";
pub const ENV_CHAIN_ID: &str = "PROVISIONER_CHAIN_ID";
pub const ENV_BLOCK_INTERVAL_SECS: &str = "PROVISIONER_BLOCK_INTERVAL_SECS";

/// A sub-faucet holding funds to distribute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FundingAccount {
    /// Key name of the faucet in the keybase
    pub name: String,

    /// Password of the faucet key
    pub password: String,

    /// Faucet chain address
    pub address: String,
}

impl FundingAccount {
    pub fn new(
        name: impl Into<String>,
        password: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            address: address.into(),
        }
    }

    /// Sender record used to sign transfers from this faucet
    pub fn as_sender(&self, account_number: u64) -> AccountInfo {
        AccountInfo {
            local_name: self.name.clone(),
            address: self.address.clone(),
            password: self.password.clone(),
            account_number: Some(account_number),
            sequence: None,
        }
    }
}

/// How new key names are derived
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamingScheme {
    pub prefix: String,
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            prefix: "mock_account".to_string(),
        }
    }
}

impl NamingScheme {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Key name for the 1-based slot `index`
    pub fn key_name(&self, index: usize) -> String {
        format!("{}_{}", self.prefix, index)
    }
}

/// Configuration of a provisioning run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionerConfig {
    /// Chain the accounts are created on
    pub chain_id: String,

    /// Base URL of the light-client REST daemon
    pub lcd_url: String,

    /// Block interval of the network in seconds
    pub block_interval_secs: u64,

    /// Coin amount sent to every new account, empty for the client default
    pub transfer_amount: String,

    /// Fee paid by funding transfers
    pub fee: String,

    /// Gas limit of funding transfers
    pub gas: u64,

    /// Password protecting every created key
    pub key_password: String,

    /// Naming scheme of created keys
    pub naming: NamingScheme,

    /// Upper bound on any single chain call in seconds
    pub call_timeout_secs: u64,

    /// How to wait for funding transfers to settle
    pub settlement: SettlementPolicy,

    /// Sub-faucets sharing the funding work
    pub funding_accounts: Vec<FundingAccount>,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            chain_id: "test-chain".to_string(),
            lcd_url: "http://localhost:1317".to_string(),
            block_interval_secs: 5,
            transfer_amount: String::new(),
            fee: "4stake".to_string(),
            gas: 200_000,
            key_password: "1234567890".to_string(),
            naming: NamingScheme::default(),
            call_timeout_secs: 30,
            settlement: SettlementPolicy::FixedDelay,
            funding_accounts: Vec::new(),
        }
    }
}

impl ProvisionerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = chain_id.into();
        self
    }

    pub fn with_lcd_url(mut self, url: impl Into<String>) -> Self {
        self.lcd_url = url.into();
        self
    }

    pub fn with_block_interval_secs(mut self, secs: u64) -> Self {
        self.block_interval_secs = secs;
        self
    }

    pub fn with_transfer_amount(mut self, amount: impl Into<String>) -> Self {
        self.transfer_amount = amount.into();
        self
    }

    pub fn with_key_password(mut self, password: impl Into<String>) -> Self {
        self.key_password = password.into();
        self
    }

    pub fn with_naming(mut self, naming: NamingScheme) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_call_timeout_secs(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    pub fn with_settlement(mut self, settlement: SettlementPolicy) -> Self {
        self.settlement = settlement;
        self
    }

    pub fn with_funding_accounts(mut self, accounts: Vec<FundingAccount>) -> Self {
        self.funding_accounts = accounts;
        self
    }

    pub fn block_interval(&self) -> Duration {
        Duration::from_secs(self.block_interval_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.funding_accounts.is_empty() {
            return Err(ProvisionError::Config(
                "at least one funding account is required".to_string(),
            ));
        }
        if let Some(faucet) = self.funding_accounts.iter().find(|f| f.address.is_empty()) {
            return Err(ProvisionError::Config(format!(
                "funding account {} has no address",
                faucet.name
            )));
        }
        if self.call_timeout_secs == 0 {
            return Err(ProvisionError::Config(
                "call_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.naming.prefix.is_empty() {
            return Err(ProvisionError::Config("naming prefix is empty".to_string()));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!("Config file not found: {}", path.display()));
        }

        let raw = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config from {}: {}", path.display(), e))?;

        serde_json::from_str(&raw).map_err(|e| anyhow!("Failed to parse config: {}", e))
    }

    /// Overlay values from the process environment
    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values looked up by environment variable name
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_LCD_URL) {
            self.lcd_url = url;
        }
        if let Some(chain_id) = lookup(ENV_CHAIN_ID) {
            self.chain_id = chain_id;
        }
        if let Some(secs) = lookup(ENV_BLOCK_INTERVAL_SECS) {
            self.block_interval_secs = secs
                .parse()
                .map_err(|e| anyhow!("Invalid {}: {}", ENV_BLOCK_INTERVAL_SECS, e))?;
        }
        Ok(self)
    }
}
