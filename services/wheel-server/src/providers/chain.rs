use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::{Transaction, VersionedTransaction};
use tokio::time::timeout;
use tracing::info;

use super::ChainClient;

/// Finality can lag well behind submission.
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(90);

/// Chain access through a Solana RPC node, plus the external claim service
/// that builds creator-fee collection transactions.
pub struct RpcChainClient {
    rpc: RpcClient,
    http: reqwest::Client,
    claim_url: String,
    request_timeout: Duration,
}

impl RpcChainClient {
    pub fn new(rpc_url: &str, claim_url: &str, request_timeout: Duration) -> Result<Self> {
        Ok(RpcChainClient {
            rpc: RpcClient::new_with_commitment(
                rpc_url.to_string(),
                CommitmentConfig::finalized(),
            ),
            http: reqwest::Client::builder()
                .timeout(request_timeout)
                .build()
                .context("failed to build claim service http client")?,
            claim_url: claim_url.to_string(),
            request_timeout,
        })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        timeout(self.request_timeout, self.rpc.get_balance(address))
            .await
            .map_err(|_| anyhow!("balance lookup timed out"))?
            .context("balance lookup failed")
    }

    async fn transfer(&self, from: &Keypair, to: &Pubkey, lamports: u64) -> Result<String> {
        let instruction = system_instruction::transfer(&from.pubkey(), to, lamports);
        let blockhash = timeout(self.request_timeout, self.rpc.get_latest_blockhash())
            .await
            .map_err(|_| anyhow!("blockhash lookup timed out"))?
            .context("blockhash lookup failed")?;
        let transaction = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&from.pubkey()),
            &[from],
            blockhash,
        );
        let signature = timeout(
            CONFIRM_TIMEOUT,
            self.rpc.send_and_confirm_transaction(&transaction),
        )
        .await
        .map_err(|_| anyhow!("transfer confirmation timed out"))?
        .context("transfer failed")?;
        Ok(signature.to_string())
    }

    async fn claim_creator_fees(&self, operator: &Keypair) -> Result<Option<String>> {
        let body = json!({
            "publicKey": operator.pubkey().to_string(),
            "action": "collectCreatorFee",
        });
        let response = self
            .http
            .post(&self.claim_url)
            .json(&body)
            .send()
            .await
            .context("claim service request failed")?;

        // The service answers 400 when there is nothing to collect.
        if response.status() == reqwest::StatusCode::BAD_REQUEST {
            let message = response.text().await.unwrap_or_default();
            info!(message = %message, "no creator fees available to claim");
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .context("claim service returned an error status")?;

        let build: ClaimBuildResponse = response
            .json()
            .await
            .context("claim service returned invalid json")?;
        if let Some(error) = build.error {
            return Err(anyhow!("claim service error: {error}"));
        }
        let Some(encoded) = build.transaction else {
            return Ok(None);
        };

        let bytes = BASE64
            .decode(encoded.as_bytes())
            .context("claim transaction is not valid base64")?;
        let unsigned: VersionedTransaction =
            bincode::deserialize(&bytes).context("claim transaction is not deserializable")?;
        let signed = VersionedTransaction::try_new(unsigned.message, &[operator])
            .context("failed to sign claim transaction")?;

        let signature = timeout(
            CONFIRM_TIMEOUT,
            self.rpc.send_and_confirm_transaction(&signed),
        )
        .await
        .map_err(|_| anyhow!("claim confirmation timed out"))?
        .context("claim submission failed")?;
        Ok(Some(signature.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ClaimBuildResponse {
    /// Base64-encoded unsigned transaction; absent when nothing is claimable.
    transaction: Option<String>,
    #[serde(default)]
    error: Option<String>,
}
