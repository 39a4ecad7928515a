use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{SpinRecord, Winner};

/// Oldest records beyond this are evicted.
pub const HISTORY_CAPACITY: usize = 50;

/// Per-winner aggregate across all recorded spins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerStats {
    pub wins: u64,
    pub total_won_lamports: u64,
}

/// Serializable ledger state, persisted atomically on every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub records: Vec<SpinRecord>,
    pub cumulative_total_lamports: u64,
    #[serde(default)]
    pub winner_stats: HashMap<String, WinnerStats>,
}

/// Append-only, capacity-bounded log of past spins plus the running
/// cumulative total of value distributed.
///
/// All mutation is funneled through the spin coordinator; sequence ids are
/// strictly increasing and survive eviction and restarts.
#[derive(Debug)]
pub struct HistoryLedger {
    records: VecDeque<SpinRecord>,
    next_sequence_id: u64,
    cumulative_total_lamports: u64,
    winner_stats: HashMap<String, WinnerStats>,
}

impl HistoryLedger {
    pub fn new(baseline_lamports: u64) -> Self {
        HistoryLedger {
            records: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
            next_sequence_id: 1,
            cumulative_total_lamports: baseline_lamports,
            winner_stats: HashMap::new(),
        }
    }

    /// Restore from a persisted snapshot. The cumulative total never goes
    /// below the configured baseline.
    pub fn from_snapshot(snapshot: LedgerSnapshot, baseline_lamports: u64) -> Self {
        let next_sequence_id = snapshot
            .records
            .iter()
            .map(|r| r.sequence_id)
            .max()
            .unwrap_or(0)
            + 1;
        HistoryLedger {
            records: snapshot.records.into(),
            next_sequence_id,
            cumulative_total_lamports: snapshot.cumulative_total_lamports.max(baseline_lamports),
            winner_stats: snapshot.winner_stats,
        }
    }

    /// Record a new spin at selection time. Distribution fields start unset;
    /// the oldest record is evicted past capacity.
    pub fn append(&mut self, winner: Winner, occurred_at: DateTime<Utc>) -> SpinRecord {
        let record = SpinRecord {
            sequence_id: self.next_sequence_id,
            winner,
            occurred_at,
            distributed_lamports: None,
            settlement_signature: None,
            settlement_url: None,
        };
        self.next_sequence_id += 1;
        self.records.push_back(record.clone());
        while self.records.len() > HISTORY_CAPACITY {
            self.records.pop_front();
        }
        record
    }

    /// Most recent records, newest first.
    pub fn recent(&self, n: usize) -> Vec<SpinRecord> {
        self.records.iter().rev().take(n).cloned().collect()
    }

    pub fn latest(&self) -> Option<&SpinRecord> {
        self.records.back()
    }

    /// Fill the latest record's distribution fields.
    ///
    /// A no-op when the ledger is empty, the amount is not positive, or the
    /// record already carries a distribution (so a repeated callback cannot
    /// double-count winner stats). Returns whether anything changed.
    pub fn update_latest_distribution(
        &mut self,
        lamports: u64,
        signature: &str,
        url: &str,
    ) -> bool {
        if lamports == 0 {
            return false;
        }
        let Some(record) = self.records.back_mut() else {
            return false;
        };
        if record.distributed_lamports.is_some() {
            // Mutated at most once.
            record.settlement_signature = Some(signature.to_string());
            record.settlement_url = Some(url.to_string());
            return false;
        }
        record.distributed_lamports = Some(lamports);
        record.settlement_signature = Some(signature.to_string());
        record.settlement_url = Some(url.to_string());

        let stats = self
            .winner_stats
            .entry(record.winner.address.clone())
            .or_default();
        stats.wins += 1;
        stats.total_won_lamports += lamports;
        true
    }

    /// Bump the cumulative total; called exactly once per successful
    /// distribution.
    pub fn add_to_cumulative_total(&mut self, lamports: u64) {
        self.cumulative_total_lamports += lamports;
    }

    pub fn cumulative_total(&self) -> u64 {
        self.cumulative_total_lamports
    }

    pub fn winner_stats(&self, address: &str) -> WinnerStats {
        self.winner_stats.get(address).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            records: self.records.iter().cloned().collect(),
            cumulative_total_lamports: self.cumulative_total_lamports,
            winner_stats: self.winner_stats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winner(address: &str) -> Winner {
        Winner {
            address: address.to_string(),
            label: address.to_string(),
            amount: 100,
            percentage: 50.0,
        }
    }

    #[test]
    fn test_sequence_ids_are_monotonic_one_based() {
        let mut ledger = HistoryLedger::new(0);
        let a = ledger.append(winner("a"), Utc::now());
        let b = ledger.append(winner("b"), Utc::now());
        assert_eq!(a.sequence_id, 1);
        assert_eq!(b.sequence_id, 2);
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let mut ledger = HistoryLedger::new(0);
        for _ in 0..HISTORY_CAPACITY + 10 {
            ledger.append(winner("a"), Utc::now());
        }
        assert_eq!(ledger.len(), HISTORY_CAPACITY);

        let recent = ledger.recent(HISTORY_CAPACITY);
        // Newest first; the oldest surviving record is id 11.
        assert_eq!(recent[0].sequence_id, (HISTORY_CAPACITY + 10) as u64);
        assert_eq!(recent.last().unwrap().sequence_id, 11);
    }

    #[test]
    fn test_update_latest_on_empty_ledger_is_noop() {
        let mut ledger = HistoryLedger::new(0);
        assert!(!ledger.update_latest_distribution(100, "sig", "url"));
    }

    #[test]
    fn test_update_latest_with_zero_amount_is_noop() {
        let mut ledger = HistoryLedger::new(0);
        ledger.append(winner("a"), Utc::now());
        assert!(!ledger.update_latest_distribution(0, "sig", "url"));
        assert_eq!(ledger.latest().unwrap().distributed_lamports, None);
    }

    #[test]
    fn test_update_latest_is_idempotent() {
        let mut ledger = HistoryLedger::new(0);
        ledger.append(winner("a"), Utc::now());

        assert!(ledger.update_latest_distribution(500, "sig", "url"));
        assert!(!ledger.update_latest_distribution(500, "sig", "url"));

        let record = ledger.latest().unwrap();
        assert_eq!(record.distributed_lamports, Some(500));

        // Winner stats counted once.
        let stats = ledger.winner_stats("a");
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.total_won_lamports, 500);
    }

    #[test]
    fn test_cumulative_total_is_monotonic_and_seeded() {
        let mut ledger = HistoryLedger::new(7_000_000);
        assert_eq!(ledger.cumulative_total(), 7_000_000);
        ledger.add_to_cumulative_total(2_000_000);
        assert_eq!(ledger.cumulative_total(), 9_000_000);
    }

    #[test]
    fn test_winner_stats_accumulate_across_wins() {
        let mut ledger = HistoryLedger::new(0);
        ledger.append(winner("a"), Utc::now());
        ledger.update_latest_distribution(500, "sig1", "url1");
        ledger.append(winner("a"), Utc::now());
        ledger.update_latest_distribution(300, "sig2", "url2");
        ledger.append(winner("b"), Utc::now());
        ledger.update_latest_distribution(100, "sig3", "url3");

        assert_eq!(ledger.winner_stats("a").wins, 2);
        assert_eq!(ledger.winner_stats("a").total_won_lamports, 800);
        assert_eq!(ledger.winner_stats("b").wins, 1);
        assert_eq!(ledger.winner_stats("nobody").wins, 0);
    }

    #[test]
    fn test_snapshot_round_trips_and_resumes_ids() {
        let mut ledger = HistoryLedger::new(1_000);
        ledger.append(winner("a"), Utc::now());
        ledger.append(winner("b"), Utc::now());
        ledger.update_latest_distribution(500, "sig", "url");
        ledger.add_to_cumulative_total(500);

        let snapshot = ledger.snapshot();
        let restored = HistoryLedger::from_snapshot(snapshot.clone(), 1_000);
        assert_eq!(restored.snapshot(), snapshot);

        let mut restored = restored;
        let next = restored.append(winner("c"), Utc::now());
        assert_eq!(next.sequence_id, 3);
    }
}
