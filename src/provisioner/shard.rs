use tracing::{debug, info, warn};

use super::config::FundingAccount;
use super::context::StageContext;
use super::error::ProvisionError;
use super::models::AccountInfo;

/// Funds one slice of recipients from a single funding account.
///
/// Transfers from one sender must reach the chain in sequence order, so the
/// worker submits them one at a time. The sequence counter is owned by the
/// worker and never shared.
pub struct ShardWorker {
    ctx: StageContext,
    funder: FundingAccount,
    recipients: Vec<AccountInfo>,
    amount: String,
}

impl ShardWorker {
    pub fn new(
        ctx: StageContext,
        funder: FundingAccount,
        recipients: Vec<AccountInfo>,
        amount: String,
    ) -> Self {
        Self {
            ctx,
            funder,
            recipients,
            amount,
        }
    }

    /// Fund every recipient in list order, returning the funded ones.
    ///
    /// Fails as a whole only when the funder's sequence cannot be queried up
    /// front. A timed-out submission may still land on chain, so the sequence
    /// is re-read before moving on; if that re-read fails the shard stops with
    /// what it has funded so far.
    pub async fn run(self) -> Result<Vec<AccountInfo>, ProvisionError> {
        let on_chain = self.ctx.query_funder(&self.funder).await?;
        let mut sender = self.funder.as_sender(on_chain.account_number);
        let mut next_sequence = on_chain.sequence;
        let mut funded = Vec::with_capacity(self.recipients.len());

        for recipient in self.recipients {
            sender.sequence = Some(next_sequence);

            match self
                .ctx
                .submit_transfer(&sender, &recipient, &self.amount)
                .await
            {
                Ok(receipt) => {
                    debug!(
                        funder = %sender.local_name,
                        recipient = %recipient.local_name,
                        sequence = next_sequence,
                        tx_hash = %receipt.tx_hash,
                        "transfer token success"
                    );
                    next_sequence += 1;
                    funded.push(recipient);
                }
                Err(err @ ProvisionError::Timeout { .. }) => {
                    let attempted = next_sequence;
                    match self.ctx.query_funder(&self.funder).await {
                        Ok(on_chain) if on_chain.sequence > attempted => {
                            info!(
                                funder = %sender.local_name,
                                recipient = %recipient.local_name,
                                sequence = attempted,
                                "timed out transfer landed on chain"
                            );
                            next_sequence = on_chain.sequence;
                            funded.push(recipient);
                        }
                        Ok(on_chain) => {
                            warn!(
                                funder = %sender.local_name,
                                recipient = %recipient.local_name,
                                sequence = attempted,
                                error = %err,
                                "transfer token timed out, recipient dropped"
                            );
                            next_sequence = on_chain.sequence;
                        }
                        Err(query_err) => {
                            warn!(
                                funder = %sender.local_name,
                                recipient = %recipient.local_name,
                                error = %query_err,
                                "sequence unknown after timeout, stopping shard"
                            );
                            break;
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        funder = %sender.local_name,
                        recipient = %recipient.local_name,
                        sequence = next_sequence,
                        error = %err,
                        "transfer token failed, recipient dropped"
                    );
                }
            }
        }

        info!(
            funder = %sender.local_name,
            funded = funded.len(),
            next_sequence,
            "sub faucet finished its shard"
        );
        Ok(funded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainAccount, ChainClient, FaultPlan, SimulatedChain, TransferReceipt};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Accepts the first transfer on chain, then never answers the caller
    struct SlowFirstReceipt {
        chain: SimulatedChain,
        stalled: AtomicBool,
        hide_after_stall: bool,
    }

    #[async_trait]
    impl ChainClient for SlowFirstReceipt {
        async fn create_key(&self, name: &str, password: &str) -> Result<String> {
            self.chain.create_key(name, password).await
        }

        async fn query_account(&self, address: &str) -> Result<ChainAccount> {
            if self.hide_after_stall && self.stalled.load(Ordering::SeqCst) {
                return Err(anyhow::anyhow!("node unreachable"));
            }
            self.chain.query_account(address).await
        }

        async fn submit_transfer(
            &self,
            sender: &AccountInfo,
            recipient: &str,
            amount: &str,
        ) -> Result<TransferReceipt> {
            let receipt = self.chain.submit_transfer(sender, recipient, amount).await?;
            if !self.stalled.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(receipt)
        }
    }

    async fn slow_first_receipt(
        hide_after_stall: bool,
        names: &[&str],
    ) -> (Arc<SlowFirstReceipt>, Vec<AccountInfo>) {
        let client = Arc::new(SlowFirstReceipt {
            chain: SimulatedChain::new().with_account("sim1faucet", 9),
            stalled: AtomicBool::new(false),
            hide_after_stall,
        });
        let mut accounts = Vec::new();
        for name in names {
            let address = client.create_key(name, "pw").await.unwrap();
            accounts.push(AccountInfo::created(name.to_string(), "pw".into(), address));
        }
        (client, accounts)
    }

    async fn setup(
        faults: FaultPlan,
        recipients: &[&str],
        start_sequence: u64,
    ) -> (Arc<SimulatedChain>, StageContext, Vec<AccountInfo>) {
        let chain = Arc::new(
            SimulatedChain::new()
                .with_faults(faults)
                .with_account("sim1faucet", start_sequence),
        );
        let mut accounts = Vec::new();
        for name in recipients {
            let address = chain.create_key(name, "pw").await.unwrap();
            accounts.push(AccountInfo::created(name.to_string(), "pw".into(), address));
        }
        let ctx = StageContext::new(chain.clone(), Duration::from_secs(5));
        (chain, ctx, accounts)
    }

    fn faucet() -> FundingAccount {
        FundingAccount::new("faucet", "pw", "sim1faucet")
    }

    #[tokio::test]
    async fn test_sequences_advance_in_list_order() {
        let (chain, ctx, recipients) = setup(FaultPlan::default(), &["a", "b", "c"], 17).await;
        let funded = ShardWorker::new(ctx, faucet(), recipients.clone(), "1stake".into())
            .run()
            .await
            .unwrap();

        assert_eq!(funded, recipients);
        assert_eq!(chain.accepted_sequences("sim1faucet"), vec![17, 18, 19]);
        let order: Vec<_> = chain.transfer_log().into_iter().map(|t| t.recipient).collect();
        let expected: Vec<_> = recipients.iter().map(|r| r.address.clone()).collect();
        assert_eq!(order, expected);
    }

    #[tokio::test]
    async fn test_failed_submission_reuses_sequence() {
        let faults = FaultPlan {
            rejected_recipients: ["b".to_string()].into(),
            ..Default::default()
        };
        let (chain, ctx, recipients) = setup(faults, &["a", "b", "c"], 4).await;
        let funded = ShardWorker::new(ctx, faucet(), recipients, String::new())
            .run()
            .await
            .unwrap();

        let names: Vec<_> = funded.iter().map(|a| a.local_name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);

        let attempted: Vec<_> = chain.transfer_log().iter().map(|t| t.sequence).collect();
        assert_eq!(attempted, vec![4, 5, 5]);
        assert_eq!(chain.accepted_sequences("sim1faucet"), vec![4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_but_accepted_transfer_keeps_shard_going() {
        let (client, recipients) = slow_first_receipt(false, &["a", "b", "c", "d"]).await;
        let ctx = StageContext::new(client.clone(), Duration::from_secs(5));

        let funded = ShardWorker::new(ctx, faucet(), recipients.clone(), String::new())
            .run()
            .await
            .unwrap();

        assert_eq!(funded, recipients);
        assert_eq!(client.chain.accepted_sequences("sim1faucet"), vec![9, 10, 11, 12]);
        assert!(client.chain.transfer_log().iter().all(|t| t.accepted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_sequence_after_timeout_stops_shard() {
        let (client, recipients) = slow_first_receipt(true, &["a", "b", "c"]).await;
        let ctx = StageContext::new(client.clone(), Duration::from_secs(5));

        let funded = ShardWorker::new(ctx, faucet(), recipients, String::new())
            .run()
            .await
            .unwrap();

        assert!(funded.is_empty());
        assert_eq!(client.chain.transfer_log().len(), 1);
    }

    #[tokio::test]
    async fn test_sequence_query_failure_fails_shard() {
        let faults = FaultPlan {
            hidden_accounts: ["sim1faucet".to_string()].into(),
            ..Default::default()
        };
        let (chain, ctx, recipients) = setup(faults, &["a", "b"], 0).await;
        let result = ShardWorker::new(ctx, faucet(), recipients, String::new())
            .run()
            .await;

        assert!(matches!(
            result,
            Err(ProvisionError::SequenceQueryFailure { .. })
        ));
        assert!(chain.transfer_log().is_empty());
    }
}
