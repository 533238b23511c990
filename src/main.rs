use anyhow::{anyhow, Result};
use clap::Parser;
use colored::Colorize;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use faucet_provisioner::chain::{ChainClient, FaultPlan, LcdClient, SimulatedChain};
use faucet_provisioner::cli_utils::{
    print_error, print_info, print_report_summary, print_success, print_warning,
};
use faucet_provisioner::provisioner::{
    save_report_to_json, AccountProvisioner, FundingAccount, NamingScheme, ProvisionerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "faucet-provisioner")]
#[command(about = "Create, fund and resolve a batch of test accounts", long_about = None)]
struct Args {
    /// Number of accounts to create
    #[arg(long, short = 'n', default_value_t = 10)]
    count: usize,

    /// Provisioner config file (JSON)
    #[arg(long, short = 'c', env = "PROVISIONER_CONFIG")]
    config: Option<PathBuf>,

    /// Output file for the provisioning report
    #[arg(long, short = 'o', default_value = "provisioned_accounts.json")]
    output: PathBuf,

    /// Override the key name prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Run against an in-memory chain instead of the LCD endpoint
    #[arg(long)]
    simulate: bool,

    /// Failure probability of every simulated chain call
    #[arg(long, default_value_t = 0.0)]
    simulated_failure_rate: f64,
}

/// Sub faucets seeded into the simulated chain when the config names none
const SIMULATED_FAUCETS: usize = 2;

fn load_config(args: &Args) -> Result<ProvisionerConfig> {
    let config = match &args.config {
        Some(path) => ProvisionerConfig::load_from_file(path)?,
        None => ProvisionerConfig::default(),
    };
    let mut config = config.apply_env_overrides()?;

    if let Some(prefix) = &args.prefix {
        config = config.with_naming(NamingScheme::new(prefix.clone()));
    }
    if args.simulate && config.funding_accounts.is_empty() {
        let faucets = (1..=SIMULATED_FAUCETS)
            .map(|i| {
                FundingAccount::new(
                    format!("sim_faucet_{}", i),
                    config.key_password.clone(),
                    format!("sim1faucet{}", i),
                )
            })
            .collect();
        config = config.with_funding_accounts(faucets);
    }
    Ok(config)
}

fn build_client(args: &Args, config: &ProvisionerConfig) -> Result<Arc<dyn ChainClient>> {
    if !args.simulate {
        return Ok(Arc::new(LcdClient::new(
            config.lcd_url.clone(),
            config.chain_id.clone(),
            config.fee.clone(),
            config.gas,
        )));
    }

    if !(0.0..=1.0).contains(&args.simulated_failure_rate) {
        return Err(anyhow!(
            "Invalid --simulated-failure-rate {}: expected a value between 0 and 1",
            args.simulated_failure_rate
        ));
    }
    let faults = FaultPlan {
        failure_rate: args.simulated_failure_rate,
        ..Default::default()
    };
    let chain = config
        .funding_accounts
        .iter()
        .fold(SimulatedChain::new().with_faults(faults), |chain, faucet| {
            chain.with_account(faucet.address.clone(), 0)
        });
    Ok(Arc::new(chain))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string())
                .as_str(),
        )
        .init();

    let args = Args::parse();

    eprintln!(
        "{}",
        "╔═══════════════════════════════════════════════════════╗".bright_cyan()
    );
    eprintln!(
        "{}",
        "║        Faucet Provisioner (Batch Account Setup)       ║".bright_cyan()
    );
    eprintln!(
        "{}",
        "╚═══════════════════════════════════════════════════════╝".bright_cyan()
    );

    let config = load_config(&args)?;
    let client = build_client(&args, &config)?;

    if args.simulate {
        print_info("Using simulated chain");
    } else {
        print_info(&format!("Using LCD endpoint {}", config.lcd_url));
    }
    print_info(&format!(
        "{} accounts, {} sub faucets, block interval {}s",
        args.count,
        config.funding_accounts.len(),
        config.block_interval_secs
    ));

    let provisioner = match AccountProvisioner::new(config, client) {
        Ok(p) => p,
        Err(e) => {
            print_error(&format!("Configuration rejected: {}", e));
            return Err(e);
        }
    };

    let report = provisioner.provision(args.count).await?;
    print_report_summary(&report);

    if report.stats.is_short() {
        print_warning(&format!(
            "Only {} of {} requested accounts were provisioned",
            report.stats.resolved, report.stats.requested
        ));
    }

    save_report_to_json(&report, &args.output)?;
    print_success(&format!("Saved to: {}", args.output.display()));

    Ok(())
}
