// Public library interface for faucet-provisioner
pub mod chain;
pub mod cli_utils;
pub mod provisioner;
