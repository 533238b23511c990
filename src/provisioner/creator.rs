use tracing::info;

use super::config::NamingScheme;
use super::context::StageContext;
use super::error::Stage;
use super::fan_in::FanIn;
use super::models::AccountInfo;

/// Create `count` keys concurrently, returning the successes in completion
/// order. Failed slots are logged and left out.
pub async fn create_accounts(
    ctx: &StageContext,
    count: usize,
    naming: &NamingScheme,
    password: &str,
) -> Vec<AccountInfo> {
    let mut fan_in: FanIn<AccountInfo> = FanIn::new(Stage::Creation);

    for index in 1..=count {
        let key_name = naming.key_name(index);
        let password = password.to_string();
        let ctx = ctx.clone();

        fan_in.launch(async move {
            let address = ctx.create_key(&key_name, &password).await?;
            info!(key_name = %key_name, address = %address, "account created");
            Ok(AccountInfo::created(key_name, password, address))
        });
    }

    let created: Vec<AccountInfo> = fan_in
        .successes()
        .await
        .into_iter()
        .filter(AccountInfo::is_created)
        .collect();

    info!(
        requested = count,
        created = created.len(),
        "all create key tasks finished"
    );
    created
}
