use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Pipeline stage a failure originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Creation,
    Funding,
    Settlement,
    Resolution,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Creation => "create_key",
            Stage::Funding => "distribute_token",
            Stage::Settlement => "settlement",
            Stage::Resolution => "get_account_info",
        };
        f.write_str(name)
    }
}

/// Every way a unit of work can drop out of the pipeline
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("create key {name} failed: {reason}")]
    CreationFailure { name: String, reason: String },

    /// Fatal to the whole shard of the funding account
    #[error("query sequence of funding account {funder} failed: {reason}")]
    SequenceQueryFailure { funder: String, reason: String },

    #[error("{funder} transfer to {recipient} with sequence {sequence} failed: {reason}")]
    SubmissionFailure {
        funder: String,
        recipient: String,
        sequence: u64,
        reason: String,
    },

    #[error("get account info of {name} failed: {reason}")]
    ResolutionFailure { name: String, reason: String },

    #[error("{stage} call for {subject} timed out after {limit:?}")]
    Timeout {
        stage: Stage,
        subject: String,
        limit: Duration,
    },

    #[error("{stage} task panicked: {reason}")]
    TaskPanicked { stage: Stage, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ProvisionError {
    /// Stage the failure belongs to, `None` for configuration errors
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ProvisionError::CreationFailure { .. } => Some(Stage::Creation),
            ProvisionError::SequenceQueryFailure { .. }
            | ProvisionError::SubmissionFailure { .. } => Some(Stage::Funding),
            ProvisionError::ResolutionFailure { .. } => Some(Stage::Resolution),
            ProvisionError::Timeout { stage, .. } | ProvisionError::TaskPanicked { stage, .. } => {
                Some(*stage)
            }
            ProvisionError::Config(_) => None,
        }
    }
}
