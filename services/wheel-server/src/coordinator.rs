use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use serde_json::json;
use solana_sdk::signer::Signer;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use fortune_wheel_common::types::lamports_to_sol;
use fortune_wheel_common::{select_weighted, DistributionOutcome, Segment, Winner};

use crate::distribution::{distribute, DistributionParams};
use crate::error::SpinError;
use crate::msg::{DistributionSummary, SpinResponse, WsEvent};
use crate::state::{AppState, SpinPhase};

/// How many records ride along on snapshot-style events.
pub const HISTORY_PAGE: usize = 10;

/// Run one spin: guard, select, announce, then hand off to the distribution
/// task.
///
/// The spinning guard and the phase transition are the same write, so a
/// concurrent trigger cannot slip between check and set. Rejections
/// (`AlreadySpinning`, `NoHolders`) leave no trace: no sequence id is
/// consumed and nothing is appended to the ledger.
pub async fn trigger_spin(state: &Arc<AppState>) -> Result<SpinResponse, SpinError> {
    let segments = {
        let mut wheel = state.wheel.write().await;
        if wheel.phase.is_spinning() {
            return Err(SpinError::AlreadySpinning);
        }
        if wheel.segments.is_empty() {
            return Err(SpinError::NoHolders);
        }
        wheel.phase = SpinPhase::Selecting;
        wheel.segments.clone()
    };
    state.broadcast(WsEvent::SpinStart);

    let selection = {
        let cooldown = state.cooldown.lock().await;
        let excluded = cooldown.excluded();
        let mut rng = rand::thread_rng();
        select_weighted(&segments.segments, &excluded, &mut rng)
    };
    let selection = match selection {
        Ok(selection) => selection,
        Err(error) => {
            let mut wheel = state.wheel.write().await;
            wheel.phase = SpinPhase::Idle;
            return Err(error.into());
        }
    };
    if selection.cooldown_bypassed {
        warn!("cooldown covers every candidate, ignored for this draw");
    }

    let segment = &segments.segments[selection.index];
    state.cooldown.lock().await.record_win(segment.address.clone());
    let winner = Winner::from(segment);

    // The stop position is purely cosmetic and drawn separately from the
    // selection, so selection stays deterministic under an injected rng.
    let stop_angle = {
        let mut rng = rand::thread_rng();
        compute_stop_angle(&segments.segments, selection.index, &mut rng)
    };

    // Announce: the record exists before distribution is even attempted.
    let record = {
        let mut ledger = state.ledger.lock().await;
        let record = ledger.append(winner.clone(), Utc::now());
        state.store.save(&ledger.snapshot());
        record
    };
    {
        let mut wheel = state.wheel.write().await;
        wheel.phase = SpinPhase::Announced;
        wheel.last_winner = Some(winner.clone());
        wheel.next_spin_at = Utc::now() + to_chrono(state.config.spin_interval);
    }
    info!(
        sequence_id = record.sequence_id,
        winner = %winner.address,
        percentage = winner.percentage,
        "spin announced"
    );
    state.broadcast(WsEvent::SpinResult {
        winner: winner.clone(),
        winner_index: selection.index,
        stop_angle,
        record: record.clone(),
    });

    let notifier = state.notifier.clone();
    let payload = json!({
        "sequenceId": record.sequence_id,
        "winner": winner.address,
        "percentage": winner.percentage,
    });
    tokio::spawn(async move { notifier.notify("spin_result", payload).await });

    // Distribution is a task owned by the state machine, not a detached
    // callback; completion is what flips the phase back to Idle.
    let task_state = Arc::clone(state);
    let handle = tokio::spawn(async move { run_distribution_phase(task_state).await });
    *state.distribution_task.lock().await = Some(handle);

    Ok(SpinResponse {
        record,
        winner_index: selection.index,
        stop_angle,
    })
}

/// The `Distributing` phase: runs after the announcement pause, folds the
/// outcome into the ledger and the cumulative total, refreshes the cached
/// balance, broadcasts completion, and returns the machine to `Idle`.
async fn run_distribution_phase(state: Arc<AppState>) {
    // Cosmetic pacing: let clients finish the wheel animation before any
    // financial side effect surfaces.
    tokio::time::sleep(state.config.announce_delay).await;
    state.wheel.write().await.phase = SpinPhase::Distributing;

    let winner_address = {
        let wheel = state.wheel.read().await;
        wheel.last_winner.as_ref().map(|w| w.address.clone())
    };

    let outcome = match winner_address {
        Some(winner_address) => {
            let params = DistributionParams::from_config(&state.config);
            match distribute(
                state.chain.as_ref(),
                state.config.operator_keypair.as_ref(),
                &winner_address,
                &params,
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!(%error, "distribution failed");
                    DistributionOutcome::Failure {
                        reason: error.to_string(),
                    }
                }
            }
        }
        None => DistributionOutcome::Failure {
            reason: "no winner recorded".to_string(),
        },
    };

    let (history, cumulative_total) = {
        let mut ledger = state.ledger.lock().await;
        if let DistributionOutcome::Success {
            distributed_lamports,
            hop_signatures,
            ..
        } = &outcome
        {
            if *distributed_lamports > 0 {
                let signature = hop_signatures.last().map(String::as_str).unwrap_or("");
                ledger.update_latest_distribution(
                    *distributed_lamports,
                    signature,
                    &explorer_url(signature),
                );
                ledger.add_to_cumulative_total(*distributed_lamports);
                state.store.save(&ledger.snapshot());
            }
        }
        (ledger.recent(HISTORY_PAGE), ledger.cumulative_total())
    };

    refresh_balance(&state).await;

    let (balance_lamports, countdown_seconds) = {
        let mut wheel = state.wheel.write().await;
        wheel.phase = SpinPhase::Idle;
        (
            wheel.operator_balance_lamports,
            (wheel.next_spin_at - Utc::now()).num_seconds().max(0),
        )
    };

    let summary = DistributionSummary::from(&outcome);
    state.broadcast(WsEvent::SpinComplete {
        history,
        countdown_seconds,
        outcome: summary.clone(),
        balance_sol: lamports_to_sol(balance_lamports),
        cumulative_total_sol: lamports_to_sol(cumulative_total),
    });

    let notifier = state.notifier.clone();
    let payload = serde_json::to_value(&summary).unwrap_or(serde_json::Value::Null);
    tokio::spawn(async move { notifier.notify("spin_complete", payload).await });

    *state.distribution_task.lock().await = None;
}

/// Re-fetch holders and atomically replace the segment cache. Failures keep
/// the previous segments.
pub async fn refresh_holders(state: &Arc<AppState>) -> anyhow::Result<()> {
    let holders = state.holders.fetch_holders(&state.config.token_mint).await?;
    let holder_count = holders.len();
    let set = state.segment_builder.build(&holders);
    {
        let mut wheel = state.wheel.write().await;
        wheel.segments = set.clone();
        wheel.holder_count = holder_count;
    }
    debug!(
        holder_count,
        eligible = set.segments.len(),
        "holder segments refreshed"
    );
    state.broadcast(WsEvent::HoldersUpdate {
        segments: set.segments,
        total_eligible_supply: set.total_eligible_supply,
        holder_count,
    });
    Ok(())
}

/// Refresh the cached operator balance; keeps the previous value on error.
pub async fn refresh_balance(state: &Arc<AppState>) {
    let Some(operator) = state.config.operator_keypair.as_ref() else {
        return;
    };
    match state.chain.get_balance(&operator.pubkey()).await {
        Ok(balance) => state.wheel.write().await.operator_balance_lamports = balance,
        Err(error) => warn!(%error, "balance refresh failed, keeping cached value"),
    }
}

/// Timer-driven spins: sleep until the published deadline, then trigger.
pub async fn auto_spin_loop(state: Arc<AppState>) {
    loop {
        let next_spin_at = state.wheel.read().await.next_spin_at;
        let wait = (next_spin_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait).await;

        if let Err(error) = trigger_spin(&state).await {
            debug!(%error, "scheduled spin skipped");
            // Push the deadline forward so a no-holder wheel doesn't busy-loop.
            let mut wheel = state.wheel.write().await;
            if wheel.next_spin_at <= Utc::now() {
                wheel.next_spin_at = Utc::now() + to_chrono(state.config.spin_interval);
            }
        }
    }
}

/// Periodic holder refresh, decoupled from the spin cycle. The first tick
/// fires immediately on startup.
pub async fn holder_refresh_loop(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(state.config.holder_refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(error) = refresh_holders(&state).await {
            warn!(%error, "holder refresh failed, keeping previous segments");
        }
    }
}

/// One countdown tick per second to every client.
pub async fn countdown_loop(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let seconds = state.countdown_seconds().await;
        state.broadcast(WsEvent::Countdown { seconds });
    }
}

/// An angle inside the winner's arc, with a margin so the pointer never
/// lands on a segment boundary.
pub fn compute_stop_angle<R: Rng + ?Sized>(
    segments: &[Segment],
    winner_index: usize,
    rng: &mut R,
) -> f64 {
    let start: f64 = segments
        .iter()
        .take(winner_index)
        .map(|s| s.percentage)
        .sum::<f64>()
        / 100.0
        * 360.0;
    let width = segments[winner_index].percentage / 100.0 * 360.0;
    start + width * rng.gen_range(0.1..0.9)
}

pub fn explorer_url(signature: &str) -> String {
    format!("https://solscan.io/tx/{signature}")
}

fn to_chrono(duration: Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or_else(|_| ChronoDuration::seconds(120))
}
