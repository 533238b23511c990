use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single account flowing through the pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountInfo {
    /// Key name chosen by the provisioner (not on-chain)
    pub local_name: String,

    /// Chain address, empty until creation succeeds
    pub address: String,

    /// Credential authorizing later signing by this account
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// On-chain account number, set once resolved
    pub account_number: Option<u64>,

    /// On-chain sequence, set once resolved
    pub sequence: Option<u64>,
}

impl AccountInfo {
    /// Record for a freshly created key
    pub fn created(local_name: String, password: String, address: String) -> Self {
        Self {
            local_name,
            address,
            password,
            account_number: None,
            sequence: None,
        }
    }

    pub fn is_created(&self) -> bool {
        !self.address.is_empty()
    }

    pub fn is_resolved(&self) -> bool {
        self.account_number.is_some()
    }
}

/// Lifecycle of one account record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountState {
    /// Requested, creation not finished
    Pending,
    /// Key created, address known
    Created,
    /// Not funded because funders outnumbered recipients
    FundingSkipped,
    /// Funding transfer accepted
    Funded,
    /// Account number and sequence known
    Resolved,
    /// Failed at some stage, terminal
    Dropped,
}

/// Per-stage counters of one provisioning run
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProvisionStats {
    pub requested: usize,
    pub created: usize,
    pub funding_skipped: usize,
    pub funded: usize,
    pub resolved: usize,
    pub dropped: usize,
}

impl ProvisionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `count` records reaching `state`
    pub fn record(&mut self, state: AccountState, count: usize) {
        match state {
            AccountState::Pending => self.requested += count,
            AccountState::Created => self.created += count,
            AccountState::FundingSkipped => self.funding_skipped += count,
            AccountState::Funded => self.funded += count,
            AccountState::Resolved => self.resolved += count,
            AccountState::Dropped => self.dropped += count,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.requested == 0 {
            return 0.0;
        }
        (self.resolved as f64 / self.requested as f64) * 100.0
    }

    /// True when fewer accounts came out than were requested
    pub fn is_short(&self) -> bool {
        self.resolved < self.requested
    }
}

/// Outcome of a provisioning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionReport {
    /// Unique run identifier
    pub run_id: Uuid,

    /// Chain the accounts live on
    pub chain_id: String,

    pub stats: ProvisionStats,

    /// Fully resolved accounts only
    pub accounts: Vec<AccountInfo>,

    pub started_at: DateTime<Utc>,

    /// None while the run is in progress
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProvisionReport {
    pub fn new(chain_id: String) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            chain_id,
            stats: ProvisionStats::new(),
            accounts: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn mark_completed(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn duration_seconds(&self) -> f64 {
        let end = self.completed_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_record_is_not_resolved() {
        let account = AccountInfo::created("a_1".into(), "pw".into(), "addr".into());
        assert!(account.is_created());
        assert!(!account.is_resolved());
        assert!(!AccountInfo::default().is_created());
    }

    #[test]
    fn test_stats_record_and_rate() {
        let mut stats = ProvisionStats::new();
        stats.record(AccountState::Pending, 4);
        stats.record(AccountState::Resolved, 3);
        stats.record(AccountState::Dropped, 1);
        assert_eq!(stats.success_rate(), 75.0);
        assert!(stats.is_short());
        assert_eq!(ProvisionStats::new().success_rate(), 0.0);
    }

    #[test]
    fn test_password_omitted_when_empty() {
        let account = AccountInfo {
            local_name: "faucet".into(),
            address: "addr".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("password").is_none());
        assert!(json["account_number"].is_null());
    }
}
