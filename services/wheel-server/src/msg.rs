use serde::Serialize;

use fortune_wheel_common::types::lamports_to_sol;
use fortune_wheel_common::{DistributionOutcome, Segment, SpinRecord, Winner};

/// Push events fanned out to every connected client.
///
/// `init` is sent once per connection as the full snapshot; the rest are
/// incremental updates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WsEvent {
    Init {
        segments: Vec<Segment>,
        total_eligible_supply: u64,
        holder_count: usize,
        last_winner: Option<Winner>,
        history: Vec<SpinRecord>,
        countdown_seconds: i64,
        spinning: bool,
        balance_sol: f64,
        cumulative_total_sol: f64,
    },
    HoldersUpdate {
        segments: Vec<Segment>,
        total_eligible_supply: u64,
        holder_count: usize,
    },
    SpinStart,
    SpinResult {
        winner: Winner,
        winner_index: usize,
        /// Wheel-stop position in degrees, cosmetic only.
        stop_angle: f64,
        record: SpinRecord,
    },
    SpinComplete {
        history: Vec<SpinRecord>,
        countdown_seconds: i64,
        outcome: DistributionSummary,
        balance_sol: f64,
        cumulative_total_sol: f64,
    },
    Countdown {
        seconds: i64,
    },
}

/// Presentation form of a distribution outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DistributionSummary {
    Success {
        claimed_sol: f64,
        distributed_sol: f64,
        funded_by_fees: bool,
        signature: String,
    },
    NoFundsAvailable,
    Failure {
        reason: String,
    },
}

impl From<&DistributionOutcome> for DistributionSummary {
    fn from(outcome: &DistributionOutcome) -> Self {
        match outcome {
            DistributionOutcome::Success {
                claimed_lamports,
                distributed_lamports,
                funded_by_fees,
                hop_signatures,
            } => DistributionSummary::Success {
                claimed_sol: lamports_to_sol(*claimed_lamports),
                distributed_sol: lamports_to_sol(*distributed_lamports),
                funded_by_fees: *funded_by_fees,
                signature: hop_signatures.last().cloned().unwrap_or_default(),
            },
            DistributionOutcome::NoFundsAvailable => DistributionSummary::NoFundsAvailable,
            DistributionOutcome::Failure { reason } => DistributionSummary::Failure {
                reason: reason.clone(),
            },
        }
    }
}

// ─── HTTP responses ───

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldersResponse {
    pub holders: Vec<Segment>,
    pub total_eligible_supply: u64,
    pub holder_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelDataResponse {
    pub segments: Vec<Segment>,
    pub countdown_seconds: i64,
    pub spinning: bool,
    pub last_winner: Option<Winner>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub records: Vec<SpinRecord>,
    pub cumulative_total_sol: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub token_mint: String,
    pub holder_count: usize,
    pub countdown_seconds: i64,
    pub spinning: bool,
    pub operator_address: Option<String>,
    pub operator_balance_sol: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub address: String,
    pub balance_sol: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinResponse {
    pub record: SpinRecord,
    pub winner_index: usize,
    pub stop_angle: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub signature: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerStatsResponse {
    pub address: String,
    pub wins: u64,
    pub total_won_sol: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_camel_case_tags() {
        let event = WsEvent::Countdown { seconds: 42 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "countdown");
        assert_eq!(json["seconds"], 42);

        let event = WsEvent::HoldersUpdate {
            segments: vec![],
            total_eligible_supply: 0,
            holder_count: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "holdersUpdate");
        assert_eq!(json["totalEligibleSupply"], 0);
    }

    #[test]
    fn test_summary_from_success_takes_final_hop_signature() {
        let outcome = DistributionOutcome::Success {
            claimed_lamports: 10_000_000,
            distributed_lamports: 5_990_000,
            funded_by_fees: true,
            hop_signatures: vec!["a".into(), "b".into(), "c".into()],
        };
        let summary = DistributionSummary::from(&outcome);
        match summary {
            DistributionSummary::Success {
                signature,
                distributed_sol,
                ..
            } => {
                assert_eq!(signature, "c");
                assert!((distributed_sol - 0.00599).abs() < 1e-9);
            }
            other => panic!("unexpected summary: {other:?}"),
        }
    }
}
