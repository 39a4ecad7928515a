use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use fortune_wheel_common::Holder;

use super::HolderProvider;

const PAGE_LIMIT: usize = 1000;
/// Hard cap on pagination so a pathological mint cannot stall the refresh
/// timer indefinitely.
const MAX_PAGES: usize = 20;

/// Holder lookup against a DAS-style indexer (`getTokenAccounts`), with
/// cursor-based pagination aggregated per owner.
pub struct DasHolderProvider {
    http: reqwest::Client,
    url: String,
}

impl DasHolderProvider {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        Ok(DasHolderProvider {
            http: reqwest::Client::builder()
                .timeout(request_timeout)
                .build()
                .context("failed to build holder provider http client")?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl HolderProvider for DasHolderProvider {
    async fn fetch_holders(&self, mint: &str) -> Result<Vec<Holder>> {
        let mut balances: HashMap<String, u64> = HashMap::new();
        let mut page = 1;

        loop {
            let body = json!({
                "jsonrpc": "2.0",
                "id": "fortune-wheel",
                "method": "getTokenAccounts",
                "params": { "mint": mint, "page": page, "limit": PAGE_LIMIT },
            });

            let envelope: RpcEnvelope = self
                .http
                .post(&self.url)
                .json(&body)
                .send()
                .await
                .context("holder provider request failed")?
                .error_for_status()
                .context("holder provider returned an error status")?
                .json()
                .await
                .context("holder provider returned invalid json")?;

            let result = envelope
                .result
                .ok_or_else(|| anyhow!("holder provider error: {:?}", envelope.error))?;

            let fetched = result.token_accounts.len();
            debug!(page, fetched, "holder page fetched");
            for account in result.token_accounts {
                *balances.entry(account.owner).or_insert(0) += account.amount;
            }

            if fetched < PAGE_LIMIT {
                break;
            }
            page += 1;
            if page > MAX_PAGES {
                warn!(max_pages = MAX_PAGES, "holder list truncated at page cap");
                break;
            }
        }

        let mut holders: Vec<Holder> = balances
            .into_iter()
            .map(|(address, amount)| Holder { address, amount })
            .collect();
        // Descending by amount; address as tiebreak keeps the order stable
        // across refreshes.
        holders.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.address.cmp(&b.address)));
        Ok(holders)
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<TokenAccountsPage>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TokenAccountsPage {
    #[serde(default)]
    token_accounts: Vec<TokenAccount>,
}

#[derive(Debug, Deserialize)]
struct TokenAccount {
    owner: String,
    #[serde(default)]
    amount: u64,
}
