use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::chain::ChainClient;

use super::config::ProvisionerConfig;
use super::context::StageContext;
use super::creator::create_accounts;
use super::distribution::distribute_tokens;
use super::models::{AccountState, ProvisionReport};
use super::resolver::resolve_accounts;
use super::settlement::wait_for_settlement;

/// Creates, funds and resolves batches of test accounts
pub struct AccountProvisioner {
    config: ProvisionerConfig,
    ctx: StageContext,
}

impl AccountProvisioner {
    /// Create a provisioner, rejecting unusable configurations
    pub fn new(config: ProvisionerConfig, client: Arc<dyn ChainClient>) -> Result<Self> {
        config.validate()?;
        let ctx = StageContext::new(client, config.call_timeout());
        Ok(Self { config, ctx })
    }

    /// Run the full pipeline for `count` new accounts.
    ///
    /// Units that fail at any stage are dropped; a report holding fewer
    /// accounts than requested is the only sign of failure.
    pub async fn provision(&self, count: usize) -> Result<ProvisionReport> {
        let mut report = ProvisionReport::new(self.config.chain_id.clone());
        report.stats.record(AccountState::Pending, count);

        info!(run_id = %report.run_id, count, "starting provisioning run");

        let created = create_accounts(
            &self.ctx,
            count,
            &self.config.naming,
            &self.config.key_password,
        )
        .await;
        report.stats.record(AccountState::Created, created.len());

        let funders = &self.config.funding_accounts;
        let funded = distribute_tokens(
            &self.ctx,
            &created,
            funders,
            &self.config.transfer_amount,
        )
        .await;
        if created.len() < funders.len() {
            report.stats.record(AccountState::FundingSkipped, created.len());
        }
        report.stats.record(AccountState::Funded, funded.len());

        wait_for_settlement(
            &self.ctx,
            &self.config.settlement,
            self.config.block_interval(),
            &funded,
        )
        .await;

        let resolved = resolve_accounts(&self.ctx, funded).await;
        report.stats.record(AccountState::Resolved, resolved.len());

        let dropped = count
            .saturating_sub(resolved.len())
            .saturating_sub(report.stats.funding_skipped);
        report.stats.record(AccountState::Dropped, dropped);

        report.accounts = resolved;
        report.mark_completed();

        info!(
            run_id = %report.run_id,
            requested = count,
            resolved = report.stats.resolved,
            dropped = report.stats.dropped,
            "provisioning run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::SimulatedChain;
    use crate::provisioner::config::FundingAccount;

    #[test]
    fn test_new_rejects_config_without_funders() {
        let result =
            AccountProvisioner::new(ProvisionerConfig::new(), Arc::new(SimulatedChain::new()));
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipped_funding_is_counted() {
        let chain = Arc::new(
            SimulatedChain::new()
                .with_account("sim1f1", 0)
                .with_account("sim1f2", 0)
                .with_account("sim1f3", 0),
        );
        let config = ProvisionerConfig::new().with_funding_accounts(vec![
            FundingAccount::new("f1", "pw", "sim1f1"),
            FundingAccount::new("f2", "pw", "sim1f2"),
            FundingAccount::new("f3", "pw", "sim1f3"),
        ]);
        let provisioner = AccountProvisioner::new(config, chain.clone()).unwrap();

        let report = provisioner.provision(2).await.unwrap();
        assert!(report.accounts.is_empty());
        assert_eq!(report.stats.created, 2);
        assert_eq!(report.stats.funding_skipped, 2);
        assert_eq!(report.stats.dropped, 0);
        assert!(chain.transfer_log().is_empty());
        assert!(report.completed_at.is_some());
    }
}
