use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{short_address, Holder, Segment};

/// Program, pool, and infrastructure addresses that can never appear on the
/// wheel, regardless of reported balance.
pub const EXCLUDED_ADDRESSES: &[&str] = &[
    "11111111111111111111111111111111",             // System Program
    "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",  // Token Program
    "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL", // Associated Token Program
    "1nc1nerator11111111111111111111111111111111",  // Incinerator
    "So11111111111111111111111111111111111111112",  // Wrapped SOL
    "pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA",  // Pump AMM
    "5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1", // Raydium Authority V4
];

/// The current wheel contents: eligible holders normalized to percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSet {
    pub segments: Vec<Segment>,
    pub total_eligible_supply: u64,
}

impl SegmentSet {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Transforms raw holder balances into normalized wheel segments.
///
/// The single largest holder is assumed to be the primary liquidity account
/// and is unconditionally dropped, along with the fixed denylist and any
/// addresses registered via `exclude` (the operator's own address, once
/// known).
#[derive(Debug, Clone)]
pub struct SegmentBuilder {
    denylist: HashSet<String>,
}

impl Default for SegmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentBuilder {
    pub fn new() -> Self {
        SegmentBuilder {
            denylist: EXCLUDED_ADDRESSES.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Permanently exclude an additional address.
    pub fn exclude(&mut self, address: impl Into<String>) -> &mut Self {
        self.denylist.insert(address.into());
        self
    }

    /// Build segments from a holder list sorted descending by amount.
    ///
    /// An empty eligible set yields empty segments and zero supply; callers
    /// must treat that as "no spin possible", not as an error.
    pub fn build(&self, holders: &[Holder]) -> SegmentSet {
        let eligible: Vec<&Holder> = holders
            .iter()
            .enumerate()
            .filter(|(i, h)| *i != 0 && h.amount > 0 && !self.denylist.contains(&h.address))
            .map(|(_, h)| h)
            .collect();

        let total_eligible_supply: u64 = eligible.iter().map(|h| h.amount).sum();
        if total_eligible_supply == 0 {
            return SegmentSet::default();
        }

        let segments = eligible
            .iter()
            .map(|h| Segment {
                address: h.address.clone(),
                label: short_address(&h.address),
                amount: h.amount,
                percentage: h.amount as f64 / total_eligible_supply as f64 * 100.0,
            })
            .collect();

        SegmentSet {
            segments,
            total_eligible_supply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder(address: &str, amount: u64) -> Holder {
        Holder {
            address: address.to_string(),
            amount,
        }
    }

    #[test]
    fn test_largest_holder_dropped_and_percentages_normalized() {
        let builder = SegmentBuilder::new();
        let holders = vec![
            holder("pool11111111111111111111111111111111111111", 1_000_000),
            holder("bbbb11111111111111111111111111111111111111", 400),
            holder("cccc11111111111111111111111111111111111111", 100),
        ];
        let set = builder.build(&holders);

        assert_eq!(set.segments.len(), 2);
        assert_eq!(set.total_eligible_supply, 500);
        assert!((set.segments[0].percentage - 80.0).abs() < 1e-9);
        assert!((set.segments[1].percentage - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let builder = SegmentBuilder::new();
        let holders = vec![
            holder("pool11111111111111111111111111111111111111", 999_999),
            holder("a111111111111111111111111111111111111111111", 333),
            holder("b111111111111111111111111111111111111111111", 331),
            holder("c111111111111111111111111111111111111111111", 173),
            holder("d111111111111111111111111111111111111111111", 7),
        ];
        let set = builder.build(&holders);
        let sum: f64 = set.segments.iter().map(|s| s.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_denylist_and_operator_excluded() {
        let mut builder = SegmentBuilder::new();
        builder.exclude("operator1111111111111111111111111111111111");
        let holders = vec![
            holder("pool11111111111111111111111111111111111111", 1_000_000),
            holder("So11111111111111111111111111111111111111112", 5_000),
            holder("operator1111111111111111111111111111111111", 2_000),
            holder("real111111111111111111111111111111111111111", 1_000),
        ];
        let set = builder.build(&holders);

        assert_eq!(set.segments.len(), 1);
        assert_eq!(
            set.segments[0].address,
            "real111111111111111111111111111111111111111"
        );
        assert!((set.segments[0].percentage - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_amount_holders_skipped() {
        let builder = SegmentBuilder::new();
        let holders = vec![
            holder("pool11111111111111111111111111111111111111", 100),
            holder("a111111111111111111111111111111111111111111", 50),
            holder("b111111111111111111111111111111111111111111", 0),
        ];
        let set = builder.build(&holders);
        assert_eq!(set.segments.len(), 1);
    }

    #[test]
    fn test_empty_or_all_excluded_yields_empty_set() {
        let builder = SegmentBuilder::new();
        assert_eq!(builder.build(&[]), SegmentSet::default());

        // Only the liquidity account holds anything.
        let holders = vec![holder("pool11111111111111111111111111111111111111", 100)];
        let set = builder.build(&holders);
        assert!(set.is_empty());
        assert_eq!(set.total_eligible_supply, 0);
    }

    #[test]
    fn test_labels_are_shortened_addresses() {
        let builder = SegmentBuilder::new();
        let holders = vec![
            holder("pool11111111111111111111111111111111111111", 100),
            holder("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU", 50),
        ];
        let set = builder.build(&holders);
        assert_eq!(set.segments[0].label, "7xKX...gAsU");
    }
}
