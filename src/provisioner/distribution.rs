use std::ops::Range;
use tracing::{info, warn};

use super::config::FundingAccount;
use super::context::StageContext;
use super::error::Stage;
use super::fan_in::FanIn;
use super::models::AccountInfo;
use super::shard::ShardWorker;

/// Split `total` items into `shards` contiguous ranges of `total / shards`
/// items, the last range taking the remainder.
///
/// Returns no ranges when `shards` is zero or exceeds `total`.
pub fn partition(total: usize, shards: usize) -> Vec<Range<usize>> {
    if shards == 0 || total < shards {
        return Vec::new();
    }

    let each = total / shards;
    (0..shards)
        .map(|index| {
            let start = index * each;
            let end = if index == shards - 1 { total } else { start + each };
            start..end
        })
        .collect()
}

/// Fund `created` accounts from `funders`, one shard per funder.
///
/// Distribution is skipped entirely when there are fewer accounts than
/// funders. Returns only the accounts whose funding transfer was accepted.
pub async fn distribute_tokens(
    ctx: &StageContext,
    created: &[AccountInfo],
    funders: &[FundingAccount],
    amount: &str,
) -> Vec<AccountInfo> {
    if created.is_empty() || created.len() < funders.len() {
        warn!(
            accounts = created.len(),
            funders = funders.len(),
            "fewer accounts than sub faucets, skipping distribution"
        );
        return Vec::new();
    }

    info!(
        accounts = created.len(),
        funders = funders.len(),
        "distribute token task assigned to sub faucets"
    );

    let mut fan_in: FanIn<Vec<AccountInfo>> = FanIn::new(Stage::Funding);
    for (funder, range) in funders.iter().zip(partition(created.len(), funders.len())) {
        info!(
            funder = %funder.name,
            start = range.start,
            end = range.end,
            "sub faucet handles accounts"
        );
        let worker = ShardWorker::new(
            ctx.clone(),
            funder.clone(),
            created[range].to_vec(),
            amount.to_string(),
        );
        fan_in.launch(worker.run());
    }

    let funded: Vec<AccountInfo> = fan_in.successes().await.into_iter().flatten().collect();
    info!(funded = funded.len(), "all sub faucet distribute token over");
    funded
}
