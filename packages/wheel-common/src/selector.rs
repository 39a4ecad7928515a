use std::collections::{HashSet, VecDeque};

use rand::Rng;
use thiserror::Error;

use crate::types::Segment;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectorError {
    #[error("cannot draw from an empty candidate set")]
    NoCandidates,

    #[error("total candidate weight is zero")]
    ZeroTotalWeight,
}

/// Result of one weighted draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Index of the winner in the candidate slice passed to `select_weighted`.
    pub index: usize,
    /// True when the exclusion set covered every candidate and was ignored
    /// for this draw.
    pub cooldown_bypassed: bool,
}

/// Draw one candidate proportional to its weight, skipping excluded addresses.
///
/// If the exclusion set covers the whole candidate list it is ignored for
/// this draw; otherwise a cooldown sized >= the candidate count would
/// deadlock the wheel. `r` is drawn over the eligible total weight and the
/// candidates are walked in input order accumulating weight; the last
/// eligible candidate is the explicit fallback at the floating upper
/// boundary.
pub fn select_weighted<R: Rng + ?Sized>(
    candidates: &[Segment],
    excluded: &HashSet<String>,
    rng: &mut R,
) -> Result<Selection, SelectorError> {
    if candidates.is_empty() {
        return Err(SelectorError::NoCandidates);
    }

    let mut eligible: Vec<usize> = (0..candidates.len())
        .filter(|&i| !excluded.contains(&candidates[i].address))
        .collect();

    let cooldown_bypassed = eligible.is_empty();
    if cooldown_bypassed {
        eligible = (0..candidates.len()).collect();
    }

    let total_weight: u64 = eligible.iter().map(|&i| candidates[i].amount).sum();
    if total_weight == 0 {
        return Err(SelectorError::ZeroTotalWeight);
    }

    let r = rng.gen_range(0.0..1.0) * total_weight as f64;
    let mut cumulative = 0.0;
    for &i in &eligible {
        cumulative += candidates[i].amount as f64;
        if cumulative >= r {
            return Ok(Selection {
                index: i,
                cooldown_bypassed,
            });
        }
    }

    // Floating accumulation can land just under r at the exact upper boundary.
    let last = eligible[eligible.len() - 1];
    Ok(Selection {
        index: last,
        cooldown_bypassed,
    })
}

/// FIFO of the last N winners, excluded from subsequent draws.
#[derive(Debug, Clone)]
pub struct CooldownTracker {
    recent: VecDeque<String>,
    capacity: usize,
}

impl CooldownTracker {
    pub fn new(capacity: usize) -> Self {
        CooldownTracker {
            recent: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Push a winner and trim the oldest entries down to capacity.
    pub fn record_win(&mut self, address: impl Into<String>) {
        self.recent.push_back(address.into());
        while self.recent.len() > self.capacity {
            self.recent.pop_front();
        }
    }

    pub fn excluded(&self) -> HashSet<String> {
        self.recent.iter().cloned().collect()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.recent.iter().any(|a| a == address)
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn segment(address: &str, amount: u64) -> Segment {
        Segment {
            address: address.to_string(),
            label: address.to_string(),
            amount,
            percentage: 0.0,
        }
    }

    #[test]
    fn test_empty_candidates_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = select_weighted(&[], &HashSet::new(), &mut rng).unwrap_err();
        assert_eq!(err, SelectorError::NoCandidates);
    }

    #[test]
    fn test_zero_total_weight_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let candidates = vec![segment("a", 0), segment("b", 0)];
        let err = select_weighted(&candidates, &HashSet::new(), &mut rng).unwrap_err();
        assert_eq!(err, SelectorError::ZeroTotalWeight);
    }

    #[test]
    fn test_winner_is_member_of_input() {
        let mut rng = StdRng::seed_from_u64(42);
        let candidates = vec![segment("a", 10), segment("b", 20), segment("c", 30)];
        for _ in 0..1000 {
            let selection = select_weighted(&candidates, &HashSet::new(), &mut rng).unwrap();
            assert!(selection.index < candidates.len());
            assert!(!selection.cooldown_bypassed);
        }
    }

    #[test]
    fn test_excluded_never_wins() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = vec![segment("a", 1_000_000), segment("b", 1)];
        let excluded: HashSet<String> = ["a".to_string()].into_iter().collect();
        for _ in 0..200 {
            let selection = select_weighted(&candidates, &excluded, &mut rng).unwrap();
            assert_eq!(selection.index, 1);
        }
    }

    #[test]
    fn test_total_exclusion_bypasses_cooldown() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = vec![segment("a", 10), segment("b", 20)];
        let excluded: HashSet<String> =
            ["a".to_string(), "b".to_string()].into_iter().collect();
        let selection = select_weighted(&candidates, &excluded, &mut rng).unwrap();
        assert!(selection.cooldown_bypassed);
        assert!(selection.index < 2);
    }

    #[test]
    fn test_frequency_converges_to_weight_share() {
        let mut rng = StdRng::seed_from_u64(1234);
        let candidates = vec![
            segment("a", 500_000),
            segment("b", 300_000),
            segment("c", 200_000),
        ];
        let trials = 100_000;
        let mut wins: HashMap<usize, u64> = HashMap::new();
        for _ in 0..trials {
            let selection = select_weighted(&candidates, &HashSet::new(), &mut rng).unwrap();
            *wins.entry(selection.index).or_insert(0) += 1;
        }

        let expected = [0.5, 0.3, 0.2];
        for (i, expect) in expected.iter().enumerate() {
            let observed = *wins.get(&i).unwrap_or(&0) as f64 / trials as f64;
            assert!(
                (observed - expect).abs() < 0.01,
                "candidate {i}: observed {observed}, expected {expect}"
            );
        }
    }

    #[test]
    fn test_cooldown_excludes_last_n_winners() {
        let mut cooldown = CooldownTracker::new(2);
        cooldown.record_win("a");
        assert!(cooldown.contains("a"));

        cooldown.record_win("b");
        assert!(cooldown.contains("a"));
        assert!(cooldown.contains("b"));

        // Third win evicts the oldest entry.
        cooldown.record_win("c");
        assert!(!cooldown.contains("a"));
        assert!(cooldown.contains("b"));
        assert!(cooldown.contains("c"));
        assert_eq!(cooldown.len(), 2);
    }

    #[test]
    fn test_winner_excluded_from_next_draws() {
        let mut rng = StdRng::seed_from_u64(99);
        let candidates = vec![
            segment("a", 100),
            segment("b", 100),
            segment("c", 100),
        ];
        let mut cooldown = CooldownTracker::new(2);

        let first = select_weighted(&candidates, &cooldown.excluded(), &mut rng).unwrap();
        cooldown.record_win(candidates[first.index].address.clone());

        for _ in 0..100 {
            let next = select_weighted(&candidates, &cooldown.excluded(), &mut rng).unwrap();
            assert_ne!(next.index, first.index);
        }
    }
}
