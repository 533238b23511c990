use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use super::context::StageContext;
use super::error::Stage;
use super::fan_in::FanIn;
use super::models::AccountInfo;

/// Waiting strategy between funding and resolution
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SettlementPolicy {
    /// Sleep for two block intervals
    #[default]
    FixedDelay,

    /// Poll until every funded account is queryable or `timeout_secs` elapse
    PollUntilVisible {
        poll_interval_ms: u64,
        timeout_secs: u64,
    },
}

/// Funded accounts only become queryable once their transfer is in a block
pub fn settlement_delay(block_interval: Duration) -> Duration {
    block_interval.saturating_mul(2)
}

/// Hold the pipeline until funding transfers have had the chance to settle
pub async fn wait_for_settlement(
    ctx: &StageContext,
    policy: &SettlementPolicy,
    block_interval: Duration,
    funded: &[AccountInfo],
) {
    match policy {
        SettlementPolicy::FixedDelay => {
            let delay = settlement_delay(block_interval);
            info!(delay_secs = delay.as_secs_f64(), "sleep before get account sequence");
            sleep(delay).await;
            info!("sleep over");
        }
        SettlementPolicy::PollUntilVisible {
            poll_interval_ms,
            timeout_secs,
        } => {
            poll_until_visible(
                ctx,
                funded,
                Duration::from_millis(*poll_interval_ms),
                Duration::from_secs(*timeout_secs),
            )
            .await;
        }
    }
}

async fn poll_until_visible(
    ctx: &StageContext,
    funded: &[AccountInfo],
    poll_interval: Duration,
    limit: Duration,
) {
    let started = Instant::now();
    let mut pending = funded.to_vec();

    loop {
        let mut fan_in: FanIn<(AccountInfo, bool)> = FanIn::new(Stage::Settlement);
        for account in pending {
            let ctx = ctx.clone();
            fan_in.launch(async move {
                let visible = ctx.resolve(&account).await.is_ok();
                Ok((account, visible))
            });
        }

        pending = fan_in
            .successes()
            .await
            .into_iter()
            .filter(|(_, visible)| !visible)
            .map(|(account, _)| account)
            .collect();

        if pending.is_empty() {
            info!(waited_ms = started.elapsed().as_millis() as u64, "all funded accounts visible");
            return;
        }
        if started.elapsed() >= limit {
            warn!(
                still_pending = pending.len(),
                limit_secs = limit.as_secs(),
                "settlement poll timed out, continuing"
            );
            return;
        }
        sleep(poll_interval).await;
    }
}
