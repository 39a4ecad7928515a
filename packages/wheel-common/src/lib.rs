pub mod ledger;
pub mod segments;
pub mod selector;
pub mod types;

pub use ledger::{HistoryLedger, LedgerSnapshot, WinnerStats, HISTORY_CAPACITY};
pub use segments::{SegmentBuilder, SegmentSet, EXCLUDED_ADDRESSES};
pub use selector::{select_weighted, CooldownTracker, Selection, SelectorError};
pub use types::{DistributionOutcome, Holder, Segment, SpinRecord, Winner};
