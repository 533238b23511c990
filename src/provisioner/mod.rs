pub mod config;
pub mod context;
pub mod creator;
pub mod distribution;
pub mod error;
pub mod fan_in;
pub mod models;
pub mod pipeline;
pub mod resolver;
pub mod settlement;
pub mod shard;
pub mod storage;

pub use config::{FundingAccount, NamingScheme, ProvisionerConfig};
pub use error::{ProvisionError, Stage};
pub use models::{AccountInfo, AccountState, ProvisionReport, ProvisionStats};
pub use pipeline::AccountProvisioner;
pub use settlement::SettlementPolicy;
pub use storage::{load_report_from_json, save_report_to_json};
