use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use solana_sdk::signature::Keypair;

/// Process configuration, read once at startup from the environment.
pub struct WheelConfig {
    pub rpc_url: String,
    /// DAS-style indexer endpoint used for holder lookups.
    pub holder_api_url: String,
    /// Claim service endpoint that builds the creator-fee claim transaction.
    pub claim_api_url: String,
    pub token_mint: String,
    /// Absent key permanently disables distribution for the process lifetime.
    pub operator_keypair: Option<Keypair>,
    pub bind_addr: SocketAddr,
    pub webhook_url: Option<String>,
    /// Ledger snapshot file; absent means memory-only operation.
    pub data_file: Option<PathBuf>,

    pub spin_interval: Duration,
    pub holder_refresh_interval: Duration,
    pub cooldown_size: usize,

    /// Fraction of claimed fees kept by the operator.
    pub keep_fraction: f64,
    /// Lamports reserved off the payout for network fees across the chain.
    pub reserved_fee_lamports: u64,
    /// Floor payout, sent from the operating balance when fees fall short.
    pub guaranteed_min_lamports: u64,
    /// Claims below this are treated as no fees claimed.
    pub min_claim_lamports: u64,
    /// Flat network fee deducted at each hop.
    pub hop_fee_lamports: u64,
    pub cumulative_baseline_lamports: u64,

    /// Pause after claiming so the ledger reflects the claim.
    pub settle_delay: Duration,
    /// Defensive slack between confirmed hops.
    pub hop_delay: Duration,
    /// Cosmetic pause between announcement and distribution so client-side
    /// presentation finishes first.
    pub announce_delay: Duration,
    pub request_timeout: Duration,
}

impl WheelConfig {
    pub fn from_env() -> Result<Self> {
        let rpc_url = env::var("RPC_URL").context("RPC_URL is required")?;
        let token_mint = env::var("TOKEN_MINT").context("TOKEN_MINT is required")?;
        let holder_api_url = env::var("HOLDER_API_URL").unwrap_or_else(|_| rpc_url.clone());
        let claim_api_url = env::var("CLAIM_API_URL")
            .unwrap_or_else(|_| "https://pumpportal.fun/api/trade-local".to_string());

        let operator_keypair = match env::var("OPERATOR_SECRET_KEY") {
            Ok(encoded) => Some(parse_keypair(&encoded)?),
            Err(_) => None,
        };

        let port: u16 = env_or("PORT", 3000)?;
        let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));

        Ok(WheelConfig {
            rpc_url,
            holder_api_url,
            claim_api_url,
            token_mint,
            operator_keypair,
            bind_addr,
            webhook_url: env::var("WEBHOOK_URL").ok(),
            data_file: env::var("DATA_FILE").ok().map(PathBuf::from),
            spin_interval: Duration::from_secs(env_or("SPIN_INTERVAL_SECS", 120)?),
            holder_refresh_interval: Duration::from_secs(env_or("HOLDER_REFRESH_SECS", 60)?),
            cooldown_size: env_or("WINNER_COOLDOWN_SIZE", 2)?,
            keep_fraction: env_or("KEEP_FRACTION", 0.10)?,
            reserved_fee_lamports: env_or("RESERVED_FEE_LAMPORTS", 3_000_000)?,
            guaranteed_min_lamports: env_or("GUARANTEED_MIN_LAMPORTS", 2_000_000)?,
            min_claim_lamports: env_or("MIN_CLAIM_LAMPORTS", 1_000_000)?,
            hop_fee_lamports: env_or("HOP_FEE_LAMPORTS", 5_000)?,
            cumulative_baseline_lamports: env_or("CUMULATIVE_BASELINE_LAMPORTS", 0)?,
            settle_delay: Duration::from_millis(env_or("SETTLE_DELAY_MS", 15_000)?),
            hop_delay: Duration::from_millis(env_or("HOP_DELAY_MS", 2_000)?),
            announce_delay: Duration::from_millis(env_or("ANNOUNCE_DELAY_MS", 8_000)?),
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", 10)?),
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw}")),
        Err(_) => Ok(default),
    }
}

/// Decode a base58-encoded 64-byte secret key.
fn parse_keypair(encoded: &str) -> Result<Keypair> {
    let bytes = solana_sdk::bs58::decode(encoded.trim())
        .into_vec()
        .context("OPERATOR_SECRET_KEY is not valid base58")?;
    Keypair::from_bytes(&bytes).context("OPERATOR_SECRET_KEY is not a valid keypair")
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signer::Signer;

    #[test]
    fn test_parse_keypair_round_trip() {
        let keypair = Keypair::new();
        let encoded = solana_sdk::bs58::encode(keypair.to_bytes()).into_string();
        let parsed = parse_keypair(&encoded).unwrap();
        assert_eq!(parsed.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_parse_keypair_rejects_garbage() {
        assert!(parse_keypair("not-base58!!").is_err());
        assert!(parse_keypair("abcd").is_err());
    }
}
