use tracing::info;

use super::context::StageContext;
use super::error::Stage;
use super::fan_in::FanIn;
use super::models::AccountInfo;

/// Query account number and sequence of every funded account concurrently.
/// Accounts whose query fails are left out.
pub async fn resolve_accounts(ctx: &StageContext, funded: Vec<AccountInfo>) -> Vec<AccountInfo> {
    let requested = funded.len();
    let mut fan_in: FanIn<AccountInfo> = FanIn::new(Stage::Resolution);

    for mut account in funded {
        let ctx = ctx.clone();
        fan_in.launch(async move {
            let on_chain = ctx.resolve(&account).await?;
            account.account_number = Some(on_chain.account_number);
            account.sequence = Some(on_chain.sequence);
            Ok(account)
        });
    }

    let resolved: Vec<AccountInfo> = fan_in
        .successes()
        .await
        .into_iter()
        .filter(AccountInfo::is_resolved)
        .collect();

    info!(
        requested,
        resolved = resolved.len(),
        "get account info over"
    );
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainClient, FaultPlan, SimulatedChain};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unresolvable_accounts_are_dropped() {
        let faults = FaultPlan {
            hidden_accounts: ["hidden".to_string()].into(),
            ..Default::default()
        };
        let chain = Arc::new(
            SimulatedChain::new()
                .with_faults(faults)
                .with_account("sim1visible", 3),
        );
        let hidden = chain.create_key("hidden", "pw").await.unwrap();
        let ctx = StageContext::new(chain.clone(), Duration::from_secs(5));

        let funded = vec![
            AccountInfo::created("visible".into(), "pw".into(), "sim1visible".into()),
            AccountInfo::created("hidden".into(), "pw".into(), hidden),
            AccountInfo::created("unknown".into(), "pw".into(), "sim1unknown".into()),
        ];
        let resolved = resolve_accounts(&ctx, funded).await;

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].local_name, "visible");
        assert_eq!(resolved[0].sequence, Some(3));
        assert_eq!(
            resolved[0].account_number,
            chain.account("sim1visible").map(|a| a.account_number)
        );
    }

    #[tokio::test]
    async fn test_empty_input_resolves_nothing() {
        let ctx = StageContext::new(Arc::new(SimulatedChain::new()), Duration::from_secs(5));
        assert!(resolve_accounts(&ctx, Vec::new()).await.is_empty());
    }
}
