use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::chain::{ChainAccount, ChainClient, TransferReceipt};

use super::config::FundingAccount;
use super::error::{ProvisionError, Stage};
use super::models::AccountInfo;

/// Chain client handle shared by stage tasks.
///
/// Every call is bounded by `call_timeout` and its failure is mapped onto the
/// stage's error variant.
#[derive(Clone)]
pub struct StageContext {
    client: Arc<dyn ChainClient>,
    call_timeout: Duration,
}

impl StageContext {
    pub fn new(client: Arc<dyn ChainClient>, call_timeout: Duration) -> Self {
        Self {
            client,
            call_timeout,
        }
    }

    async fn bounded<T, Fut, E>(
        &self,
        stage: Stage,
        subject: &str,
        call: Fut,
        on_error: E,
    ) -> Result<T, ProvisionError>
    where
        Fut: Future<Output = Result<T>>,
        E: FnOnce(String) -> ProvisionError,
    {
        match timeout(self.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(on_error(format!("{:#}", err))),
            Err(_) => Err(ProvisionError::Timeout {
                stage,
                subject: subject.to_string(),
                limit: self.call_timeout,
            }),
        }
    }

    pub async fn create_key(&self, name: &str, password: &str) -> Result<String, ProvisionError> {
        self.bounded(
            Stage::Creation,
            name,
            self.client.create_key(name, password),
            |reason| ProvisionError::CreationFailure {
                name: name.to_string(),
                reason,
            },
        )
        .await
    }

    /// Current on-chain state of a funding account
    pub async fn query_funder(
        &self,
        funder: &FundingAccount,
    ) -> Result<ChainAccount, ProvisionError> {
        self.bounded(
            Stage::Funding,
            &funder.name,
            self.client.query_account(&funder.address),
            |reason| ProvisionError::SequenceQueryFailure {
                funder: funder.name.clone(),
                reason,
            },
        )
        .await
    }

    pub async fn submit_transfer(
        &self,
        sender: &AccountInfo,
        recipient: &AccountInfo,
        amount: &str,
    ) -> Result<TransferReceipt, ProvisionError> {
        let sequence = sender.sequence.unwrap_or_default();
        self.bounded(
            Stage::Funding,
            &recipient.local_name,
            self.client.submit_transfer(sender, &recipient.address, amount),
            |reason| ProvisionError::SubmissionFailure {
                funder: sender.local_name.clone(),
                recipient: recipient.local_name.clone(),
                sequence,
                reason,
            },
        )
        .await
    }

    /// On-chain state of a newly funded account
    pub async fn resolve(&self, account: &AccountInfo) -> Result<ChainAccount, ProvisionError> {
        self.bounded(
            Stage::Resolution,
            &account.local_name,
            self.client.query_account(&account.address),
            |reason| ProvisionError::ResolutionFailure {
                name: account.local_name.clone(),
                reason,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{FaultPlan, SimulatedChain};

    #[tokio::test(start_paused = true)]
    async fn test_stalled_call_times_out() {
        let faults = FaultPlan {
            stalled_keys: ["stuck".to_string()].into(),
            ..Default::default()
        };
        let ctx = StageContext::new(
            Arc::new(SimulatedChain::new().with_faults(faults)),
            Duration::from_secs(3),
        );

        let err = ctx.create_key("stuck", "pw").await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::Timeout {
                stage: Stage::Creation,
                ..
            }
        ));
        assert!(ctx.create_key("fine", "pw").await.is_ok());
    }

    #[tokio::test]
    async fn test_collaborator_error_maps_to_stage_variant() {
        let ctx = StageContext::new(Arc::new(SimulatedChain::new()), Duration::from_secs(1));
        let missing = AccountInfo::created("ghost".into(), String::new(), "sim1ghost".into());

        let err = ctx.resolve(&missing).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::ResolutionFailure { ref name, .. } if name == "ghost"
        ));

        let faucet = FundingAccount::new("faucet", "pw", "sim1faucet");
        let err = ctx.query_funder(&faucet).await.unwrap_err();
        assert!(matches!(err, ProvisionError::SequenceQueryFailure { .. }));
    }
}
