use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::provisioner::models::AccountInfo;

use super::{ChainAccount, ChainClient, TransferReceipt};

/// Used when a transfer is submitted with an empty amount
pub const DEFAULT_TRANSFER_AMOUNT: &str = "10stake";

/// Chain client backed by a light-client REST daemon
#[derive(Debug, Clone)]
pub struct LcdClient {
    http: Client,
    base_url: String,
    chain_id: String,
    fee: String,
    gas: u64,
}

#[derive(Serialize)]
struct CreateKeyBody<'a> {
    name: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct KeyOutput {
    address: String,
}

#[derive(Deserialize)]
struct AccountEnvelope {
    value: AccountValue,
}

/// Numbers come back as decimal strings
#[derive(Deserialize)]
struct AccountValue {
    #[serde(default)]
    account_number: String,
    #[serde(default)]
    sequence: String,
}

#[derive(Serialize)]
struct BaseTx<'a> {
    name: &'a str,
    password: &'a str,
    chain_id: &'a str,
    account_number: String,
    sequence: String,
    gas: String,
    fee: &'a str,
    simulate: bool,
}

#[derive(Serialize)]
struct TransferBody<'a> {
    base_tx: BaseTx<'a>,
    amount: &'a str,
}

/// Daemons differ on the hash key and on whether height is a string
#[derive(Deserialize, Default)]
struct BroadcastOutput {
    #[serde(default, alias = "txhash")]
    hash: String,
    #[serde(default)]
    height: Option<Value>,
}

impl BroadcastOutput {
    /// Decode a 2xx broadcast body. An unreadable body only loses the
    /// receipt details, the transfer itself was accepted.
    fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|err| {
            warn!(error = %err, "undecodable broadcast receipt");
            Self::default()
        })
    }

    fn into_receipt(self) -> TransferReceipt {
        let height = match self.height {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        TransferReceipt {
            tx_hash: self.hash,
            height,
        }
    }
}

impl LcdClient {
    pub fn new(
        base_url: impl Into<String>,
        chain_id: impl Into<String>,
        fee: impl Into<String>,
        gas: u64,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chain_id: chain_id.into(),
            fee: fee.into(),
            gas,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() && status != StatusCode::NO_CONTENT {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(anyhow!("lcd responded with {}: {}", status, body))
    }
}

impl TryFrom<AccountValue> for ChainAccount {
    type Error = anyhow::Error;

    fn try_from(value: AccountValue) -> Result<Self> {
        let account_number = value
            .account_number
            .parse::<u64>()
            .with_context(|| format!("invalid account_number {:?}", value.account_number))?;
        let sequence = value
            .sequence
            .parse::<u64>()
            .with_context(|| format!("invalid sequence {:?}", value.sequence))?;
        Ok(ChainAccount {
            account_number,
            sequence,
        })
    }
}

impl<'a> TransferBody<'a> {
    fn new(client: &'a LcdClient, sender: &'a AccountInfo, amount: &'a str) -> Result<Self> {
        let account_number = sender
            .account_number
            .ok_or_else(|| anyhow!("sender {} has no account number", sender.local_name))?;
        let sequence = sender
            .sequence
            .ok_or_else(|| anyhow!("sender {} has no sequence", sender.local_name))?;
        let amount = if amount.is_empty() {
            DEFAULT_TRANSFER_AMOUNT
        } else {
            amount
        };

        Ok(Self {
            base_tx: BaseTx {
                name: &sender.local_name,
                password: &sender.password,
                chain_id: &client.chain_id,
                account_number: account_number.to_string(),
                sequence: sequence.to_string(),
                gas: client.gas.to_string(),
                fee: &client.fee,
                simulate: false,
            },
            amount,
        })
    }
}

#[async_trait]
impl ChainClient for LcdClient {
    async fn create_key(&self, name: &str, password: &str) -> Result<String> {
        let response = self
            .http
            .post(self.url("/keys"))
            .json(&CreateKeyBody { name, password })
            .send()
            .await
            .with_context(|| format!("create key {} request failed", name))?;

        let output: KeyOutput = Self::ensure_success(response).await?.json().await?;
        if output.address.is_empty() {
            return Err(anyhow!("lcd returned an empty address for key {}", name));
        }
        Ok(output.address)
    }

    async fn query_account(&self, address: &str) -> Result<ChainAccount> {
        let response = self
            .http
            .get(self.url(&format!("/auth/accounts/{}", address)))
            .send()
            .await
            .with_context(|| format!("query account {} request failed", address))?;

        let envelope: AccountEnvelope = Self::ensure_success(response).await?.json().await?;
        ChainAccount::try_from(envelope.value)
    }

    async fn submit_transfer(
        &self,
        sender: &AccountInfo,
        recipient: &str,
        amount: &str,
    ) -> Result<TransferReceipt> {
        let body = TransferBody::new(self, sender, amount)?;
        let response = self
            .http
            .post(self.url(&format!("/bank/accounts/{}/transfers", recipient)))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("transfer to {} request failed", recipient))?;

        let body = Self::ensure_success(response)
            .await?
            .text()
            .await
            .unwrap_or_default();
        Ok(BroadcastOutput::from_body(&body).into_receipt())
    }
}
