use anyhow::Result;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;

use fortune_wheel_common::Holder;

pub mod chain;
pub mod holders;
pub mod notify;

pub use chain::RpcChainClient;
pub use holders::DasHolderProvider;
pub use notify::WebhookNotifier;

/// Ranked holder lookup for the configured mint.
#[async_trait]
pub trait HolderProvider: Send + Sync {
    /// Aggregated holder list, sorted descending by amount. Implementations
    /// page through the provider until exhausted.
    async fn fetch_holders(&self, mint: &str) -> Result<Vec<Holder>>;
}

/// Outbound ledger operations: balances, finality-confirmed transfers, and
/// creator-fee claims.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64>;

    /// Sign, submit, and wait for finalized confirmation. Returns the
    /// transaction signature.
    async fn transfer(&self, from: &Keypair, to: &Pubkey, lamports: u64) -> Result<String>;

    /// Claim accrued creator fees into the operator's balance. `Ok(None)`
    /// means nothing was claimable, which is not an error.
    async fn claim_creator_fees(&self, operator: &Keypair) -> Result<Option<String>>;
}

/// Fire-and-forget event sink. Implementations log delivery failures and
/// never let them reach the caller.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &str, payload: serde_json::Value);
}
