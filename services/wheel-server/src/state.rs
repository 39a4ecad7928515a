use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use solana_sdk::signer::Signer;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

use fortune_wheel_common::{CooldownTracker, HistoryLedger, SegmentBuilder, SegmentSet, Winner};

use crate::config::WheelConfig;
use crate::msg::WsEvent;
use crate::persist::LedgerStore;
use crate::providers::{ChainClient, HolderProvider, NotificationSink};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Phase of the spin state machine. Anything other than `Idle` rejects new
/// spin triggers; the phase transition and the guard are the same write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SpinPhase {
    Idle,
    Selecting,
    Announced,
    Distributing,
}

impl SpinPhase {
    pub fn is_spinning(self) -> bool {
        self != SpinPhase::Idle
    }
}

/// The mutable wheel state. The spin coordinator is the sole writer; HTTP
/// handlers and the broadcaster read consistent snapshots through the lock.
#[derive(Debug, Clone)]
pub struct WheelState {
    pub segments: SegmentSet,
    /// Total holders reported by the provider, before eligibility filtering.
    pub holder_count: usize,
    pub phase: SpinPhase,
    pub last_winner: Option<Winner>,
    pub next_spin_at: DateTime<Utc>,
    pub operator_balance_lamports: u64,
}

pub struct AppState {
    pub config: WheelConfig,
    pub wheel: RwLock<WheelState>,
    pub ledger: Mutex<HistoryLedger>,
    pub cooldown: Mutex<CooldownTracker>,
    pub segment_builder: SegmentBuilder,
    pub store: LedgerStore,
    pub events: broadcast::Sender<WsEvent>,
    /// Handle of the in-flight distribution task, owned by the coordinator's
    /// state machine rather than detached.
    pub distribution_task: Mutex<Option<JoinHandle<()>>>,

    pub holders: Arc<dyn HolderProvider>,
    pub chain: Arc<dyn ChainClient>,
    pub notifier: Arc<dyn NotificationSink>,
}

impl AppState {
    pub fn new(
        config: WheelConfig,
        ledger: HistoryLedger,
        store: LedgerStore,
        holders: Arc<dyn HolderProvider>,
        chain: Arc<dyn ChainClient>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Arc<Self> {
        let mut segment_builder = SegmentBuilder::new();
        if let Some(keypair) = &config.operator_keypair {
            segment_builder.exclude(keypair.pubkey().to_string());
        }
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let next_spin_at = Utc::now()
            + ChronoDuration::from_std(config.spin_interval).unwrap_or(ChronoDuration::zero());

        let cooldown = CooldownTracker::new(config.cooldown_size);
        Arc::new(AppState {
            config,
            wheel: RwLock::new(WheelState {
                segments: SegmentSet::default(),
                holder_count: 0,
                phase: SpinPhase::Idle,
                last_winner: None,
                next_spin_at,
                operator_balance_lamports: 0,
            }),
            ledger: Mutex::new(ledger),
            cooldown: Mutex::new(cooldown),
            segment_builder,
            store,
            events,
            distribution_task: Mutex::new(None),
            holders,
            chain,
            notifier,
        })
    }

    /// Fan out an event to all connected clients. Having no receivers is
    /// normal and not an error.
    pub fn broadcast(&self, event: WsEvent) {
        let _ = self.events.send(event);
    }

    pub fn operator_address(&self) -> Option<String> {
        self.config
            .operator_keypair
            .as_ref()
            .map(|k| k.pubkey().to_string())
    }

    /// Seconds until the next scheduled spin, clamped at zero.
    pub async fn countdown_seconds(&self) -> i64 {
        let wheel = self.wheel.read().await;
        (wheel.next_spin_at - Utc::now()).num_seconds().max(0)
    }
}
