//! Periodic eviction of idle sessions and their tool-call records.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::app::AppState;

/// Evicts sessions idle longer than `ttl` (skipping any with a turn in progress), drops
/// their tool-call records, then drops tool-call records untouched for `ttl`. Returns the
/// number of sessions evicted.
pub(crate) fn sweep(state: &AppState, ttl: Duration) -> usize {
    let evicted = state.sessions.evict_idle(ttl);
    for id in &evicted {
        state.tracker().remove_session(id);
    }
    let orphaned = state.tracker().evict_idle(ttl);
    if !evicted.is_empty() || !orphaned.is_empty() {
        tracing::warn!(
            sessions = evicted.len(),
            tool_call_groups = orphaned.len(),
            "evicted idle state"
        );
    }
    evicted.len()
}

pub(crate) fn spawn(state: AppState, ttl: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep(&state, ttl);
        }
    })
}
