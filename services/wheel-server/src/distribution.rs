use std::str::FromStr;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use tracing::{error, info, warn};

use fortune_wheel_common::DistributionOutcome;

use crate::config::WheelConfig;
use crate::error::DistributeError;
use crate::providers::ChainClient;

/// Tunables for one distribution attempt, lifted out of `WheelConfig` so the
/// state machine can be driven directly in tests with zeroed delays.
#[derive(Debug, Clone)]
pub struct DistributionParams {
    pub keep_fraction: f64,
    pub reserved_fee_lamports: u64,
    pub guaranteed_min_lamports: u64,
    pub min_claim_lamports: u64,
    pub hop_fee_lamports: u64,
    pub settle_delay: Duration,
    pub hop_delay: Duration,
}

impl DistributionParams {
    pub fn from_config(config: &WheelConfig) -> Self {
        DistributionParams {
            keep_fraction: config.keep_fraction,
            reserved_fee_lamports: config.reserved_fee_lamports,
            guaranteed_min_lamports: config.guaranteed_min_lamports,
            min_claim_lamports: config.min_claim_lamports,
            hop_fee_lamports: config.hop_fee_lamports,
            settle_delay: config.settle_delay,
            hop_delay: config.hop_delay,
        }
    }
}

/// The amount that leaves the operator wallet, and whether claimed fees
/// funded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub lamports: u64,
    pub funded_by_fees: bool,
}

/// Decide the payout for a claim of `claimed_lamports`.
///
/// A claim below the significance threshold pays the guaranteed minimum from
/// the operating balance. Otherwise the payout is the claim minus the keep
/// fraction and the reserved network fees, clamped up to the guaranteed
/// minimum; a clamped payout is flagged as not funded by fees.
pub fn decide_payout(claimed_lamports: u64, params: &DistributionParams) -> Payout {
    if claimed_lamports < params.min_claim_lamports {
        return Payout {
            lamports: params.guaranteed_min_lamports,
            funded_by_fees: false,
        };
    }
    let after_keep = (claimed_lamports as f64 * (1.0 - params.keep_fraction)) as u64;
    let candidate = after_keep.saturating_sub(params.reserved_fee_lamports);
    if candidate < params.guaranteed_min_lamports {
        Payout {
            lamports: params.guaranteed_min_lamports,
            funded_by_fees: false,
        }
    } else {
        Payout {
            lamports: candidate,
            funded_by_fees: true,
        }
    }
}

/// Run one distribution attempt for `winner_address`:
///
/// 1. Snapshot the operator balance.
/// 2. Claim creator fees ("none available" is not an error; a claim-service
///    outage degrades to zero claimed).
/// 3. Wait for the claim to settle on the ledger.
/// 4. Snapshot again; `claimed = after - before`, clamped at zero.
/// 5. Decide the payout amount.
/// 6. Route the payout operator → hop1 → hop2 → winner through two
///    disposable keypairs, strictly sequentially, confirming finality at
///    each hop. Once a hop confirms, those funds are irrevocably in transit:
///    a later failure is reported, never rolled back.
pub async fn distribute(
    chain: &dyn ChainClient,
    operator: Option<&Keypair>,
    winner_address: &str,
    params: &DistributionParams,
) -> Result<DistributionOutcome, DistributeError> {
    let operator = operator.ok_or(DistributeError::NotConfigured)?;
    let winner = Pubkey::from_str(winner_address).map_err(|_| DistributeError::InvalidRecipient {
        address: winner_address.to_string(),
    })?;

    // 1. Balance before the claim.
    let before = chain
        .get_balance(&operator.pubkey())
        .await
        .map_err(|e| network_failure("balance before claim", &[], e))?;

    // 2 + 3. Claim, then let the ledger catch up.
    match chain.claim_creator_fees(operator).await {
        Ok(Some(signature)) => {
            info!(%signature, "creator fees claimed");
            tokio::time::sleep(params.settle_delay).await;
        }
        Ok(None) => info!("no creator fees available to claim"),
        Err(error) => {
            warn!(%error, "claim service unavailable, continuing with zero claimed");
        }
    }

    // 4. Balance after; negative deltas are RPC noise, not income.
    let after = chain
        .get_balance(&operator.pubkey())
        .await
        .map_err(|e| network_failure("balance after claim", &[], e))?;
    let claimed = after.saturating_sub(before);

    // 5. Payout decision.
    let payout = decide_payout(claimed, params);
    if payout.lamports <= 2 * params.hop_fee_lamports {
        return Err(DistributeError::TransferTooSmall {
            lamports: payout.lamports,
        });
    }
    if after < payout.lamports + params.hop_fee_lamports {
        warn!(
            balance = after,
            payout = payout.lamports,
            "operating balance cannot cover the payout"
        );
        return Ok(DistributionOutcome::NoFundsAvailable);
    }
    info!(
        claimed,
        payout = payout.lamports,
        funded_by_fees = payout.funded_by_fees,
        winner = winner_address,
        "starting hop chain"
    );

    // 6. The hop chain. Each hop's funding source is the previous hop's
    // destination, so the steps cannot overlap.
    let hop1 = Keypair::new();
    let hop2 = Keypair::new();
    let mut hop_signatures: Vec<String> = Vec::with_capacity(3);

    let signature = chain
        .transfer(operator, &hop1.pubkey(), payout.lamports)
        .await
        .map_err(|e| network_failure("operator to hop1", &hop_signatures, e))?;
    hop_signatures.push(signature);
    tokio::time::sleep(params.hop_delay).await;

    let hop2_amount = payout.lamports - params.hop_fee_lamports;
    let signature = chain
        .transfer(&hop1, &hop2.pubkey(), hop2_amount)
        .await
        .map_err(|e| network_failure("hop1 to hop2", &hop_signatures, e))?;
    hop_signatures.push(signature);
    tokio::time::sleep(params.hop_delay).await;

    let distributed = payout.lamports - 2 * params.hop_fee_lamports;
    let signature = chain
        .transfer(&hop2, &winner, distributed)
        .await
        .map_err(|e| network_failure("hop2 to winner", &hop_signatures, e))?;
    hop_signatures.push(signature);

    info!(
        distributed,
        signature = %hop_signatures[hop_signatures.len() - 1],
        "payout delivered"
    );
    Ok(DistributionOutcome::Success {
        claimed_lamports: claimed,
        distributed_lamports: distributed,
        funded_by_fees: payout.funded_by_fees,
        hop_signatures,
    })
}

/// Confirmed hop signatures are logged for manual reconciliation before the
/// failure is reported.
fn network_failure(step: &str, confirmed: &[String], error: anyhow::Error) -> DistributeError {
    error!(
        step,
        confirmed_hops = ?confirmed,
        %error,
        "distribution step failed"
    );
    DistributeError::NetworkFailure {
        step: step.to_string(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> DistributionParams {
        DistributionParams {
            keep_fraction: 0.10,
            reserved_fee_lamports: 3_000_000,
            guaranteed_min_lamports: 2_000_000,
            min_claim_lamports: 1_000_000,
            hop_fee_lamports: 5_000,
            settle_delay: Duration::ZERO,
            hop_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_insignificant_claim_pays_guaranteed_minimum() {
        let payout = decide_payout(0, &params());
        assert_eq!(payout.lamports, 2_000_000);
        assert!(!payout.funded_by_fees);

        let payout = decide_payout(999_999, &params());
        assert!(!payout.funded_by_fees);
    }

    #[test]
    fn test_small_claim_clamps_up_to_guaranteed_minimum() {
        // 5_200_000 * 0.9 - 3_000_000 = 1_680_000, below the 2_000_000 floor.
        let payout = decide_payout(5_200_000, &params());
        assert_eq!(payout.lamports, 2_000_000);
        assert!(!payout.funded_by_fees);
    }

    #[test]
    fn test_healthy_claim_pays_from_fees() {
        // 10_000_000 * 0.9 - 3_000_000 = 6_000_000.
        let payout = decide_payout(10_000_000, &params());
        assert_eq!(payout.lamports, 6_000_000);
        assert!(payout.funded_by_fees);
    }

    #[test]
    fn test_reserved_fees_never_underflow() {
        let mut p = params();
        p.min_claim_lamports = 0;
        p.reserved_fee_lamports = u64::MAX;
        let payout = decide_payout(10_000_000, &p);
        assert_eq!(payout.lamports, p.guaranteed_min_lamports);
    }
}
