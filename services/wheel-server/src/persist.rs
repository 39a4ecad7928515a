use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use fortune_wheel_common::LedgerSnapshot;

/// On-disk ledger persistence. A missing path degrades to memory-only
/// operation; read and write failures are logged and never crash the
/// process.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: Option<PathBuf>,
}

impl LedgerStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        if path.is_none() {
            info!("no data file configured, ledger is memory-only");
        }
        LedgerStore { path }
    }

    pub fn load(&self) -> Option<LedgerSnapshot> {
        let path = self.path.as_ref()?;
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no ledger snapshot yet, starting fresh");
                return None;
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to read ledger snapshot");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                warn!(path = %path.display(), %error, "ledger snapshot is corrupt, ignoring");
                None
            }
        }
    }

    /// Write the snapshot to a temp file and rename it into place, so a
    /// crash mid-write leaves the previous state intact.
    pub fn save(&self, snapshot: &LedgerSnapshot) {
        let Some(path) = &self.path else {
            return;
        };
        let raw = match serde_json::to_string_pretty(snapshot) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(%error, "failed to serialize ledger snapshot");
                return;
            }
        };
        let tmp = path.with_extension("json.tmp");
        if let Err(error) = fs::write(&tmp, raw) {
            warn!(path = %tmp.display(), %error, "failed to write ledger snapshot");
            return;
        }
        if let Err(error) = fs::rename(&tmp, path) {
            warn!(path = %path.display(), %error, "failed to replace ledger snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fortune_wheel_common::{HistoryLedger, Winner};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("wheel-store-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_memory_only_when_no_path() {
        let store = LedgerStore::new(None);
        assert!(store.load().is_none());
        store.save(&HistoryLedger::new(0).snapshot());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = temp_path("round-trip");
        let store = LedgerStore::new(Some(path.clone()));

        let mut ledger = HistoryLedger::new(1_000);
        ledger.append(
            Winner {
                address: "winner".to_string(),
                label: "winner".to_string(),
                amount: 10,
                percentage: 100.0,
            },
            Utc::now(),
        );
        ledger.update_latest_distribution(500, "sig", "url");
        ledger.add_to_cumulative_total(500);

        store.save(&ledger.snapshot());
        let loaded = store.load().unwrap();
        assert_eq!(loaded, ledger.snapshot());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let store = LedgerStore::new(Some(temp_path("missing")));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_corrupt_file_loads_as_none() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").unwrap();
        let store = LedgerStore::new(Some(path.clone()));
        assert!(store.load().is_none());
        let _ = fs::remove_file(path);
    }
}
