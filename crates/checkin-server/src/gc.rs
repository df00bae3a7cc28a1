use anyhow::Result;
use checkin_core::now_ms;
use tokio::time::interval;
use tracing::{debug, warn};

use crate::http::AppState;

/// Periodically deletes expired sessions.
pub fn spawn_session_gc(state: AppState) {
    tokio::spawn(async move {
        let mut tick = interval(state.config.gc_interval);
        loop {
            tick.tick().await;
            if let Err(e) = gc_tick(&state) {
                warn!("session gc error: {e:?}");
            }
        }
    });
}

fn gc_tick(state: &AppState) -> Result<()> {
    let removed = state.db.prune_sessions(now_ms())?;
    if removed > 0 {
        debug!(removed, "pruned expired sessions");
    }
    Ok(())
}
