use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// A raw holder row as reported by the holder provider.
/// Provider results arrive sorted descending by `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub address: String,
    pub amount: u64,
}

/// A holder's normalized share of the wheel, proportional to eligible holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub address: String,
    /// Shortened address form shown on the wheel.
    pub label: String,
    /// Raw token amount, the selection weight.
    pub amount: u64,
    /// Share of the eligible supply, 0..=100.
    pub percentage: f64,
}

/// The winner of a single spin, as announced and recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub address: String,
    pub label: String,
    pub amount: u64,
    pub percentage: f64,
}

impl From<&Segment> for Winner {
    fn from(segment: &Segment) -> Self {
        Winner {
            address: segment.address.clone(),
            label: segment.label.clone(),
            amount: segment.amount,
            percentage: segment.percentage,
        }
    }
}

/// One spin in the history ledger.
///
/// Created at selection time with the distribution fields unset; the
/// distribution callback fills them at most once. Records are never mutated
/// again and never deleted except by eviction from the bounded ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinRecord {
    /// Monotonic, 1-based.
    pub sequence_id: u64,
    pub winner: Winner,
    pub occurred_at: DateTime<Utc>,
    pub distributed_lamports: Option<u64>,
    pub settlement_signature: Option<String>,
    pub settlement_url: Option<String>,
}

/// Result of one distribution attempt, folded into the latest `SpinRecord`
/// and the cumulative total by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DistributionOutcome {
    Success {
        claimed_lamports: u64,
        distributed_lamports: u64,
        /// False when the payout fell back to the guaranteed minimum paid
        /// from the operating balance instead of claimed fees.
        funded_by_fees: bool,
        /// Transfer signatures in hop order, the last being the payout to
        /// the winner.
        hop_signatures: Vec<String>,
    },
    NoFundsAvailable,
    Failure {
        reason: String,
    },
}

/// Shortened display form of an address: first and last four characters.
pub fn short_address(address: &str) -> String {
    if address.len() <= 8 {
        return address.to_string();
    }
    format!("{}...{}", &address[..4], &address[address.len() - 4..])
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64).round() as u64
}
