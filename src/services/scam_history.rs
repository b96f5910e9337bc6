//! In-memory scam-check history shared between the checker and the stats view.
//!
//! The list lives in a [`ScamHistoryProvider`]. Consumers get at it either
//! through an explicit [`ScamHistoryHandle`] or, inside
//! [`ScamHistoryProvider::scope`], through [`use_scam_history`]. Consuming it
//! anywhere else is a programmer error and panics.

use std::cell::RefCell;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::scam::{DistributionSlice, ScamCheckRecord, ScamStats, Verdict};
use crate::utils::fingerprint::message_fingerprint;

pub const SCAM_HISTORY_LIMIT: usize = 50;

const PROVIDER_NAME: &str = "scam history";

thread_local! {
    static ACTIVE_PROVIDERS: RefCell<Vec<ScamHistoryHandle>> = const { RefCell::new(Vec::new()) };
}

pub struct ScamHistoryProvider {
    state: Arc<watch::Sender<Vec<ScamCheckRecord>>>,
}

impl Default for ScamHistoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScamHistoryProvider {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Vec::new());
        Self {
            state: Arc::new(sender),
        }
    }

    pub fn handle(&self) -> ScamHistoryHandle {
        ScamHistoryHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Runs `f` with this provider installed for the current thread. Scopes
    /// nest; the innermost provider wins.
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        struct ScopeGuard;

        impl Drop for ScopeGuard {
            fn drop(&mut self) {
                ACTIVE_PROVIDERS.with(|providers| {
                    providers.borrow_mut().pop();
                });
            }
        }

        ACTIVE_PROVIDERS.with(|providers| providers.borrow_mut().push(self.handle()));
        let _guard = ScopeGuard;
        f()
    }
}

/// Returns the innermost active provider's handle.
///
/// # Panics
///
/// Panics when called outside [`ScamHistoryProvider::scope`].
pub fn use_scam_history() -> ScamHistoryHandle {
    match try_use_scam_history() {
        Ok(handle) => handle,
        Err(_) => panic!("use_scam_history must be used within a ScamHistoryProvider scope"),
    }
}

pub fn try_use_scam_history() -> AppResult<ScamHistoryHandle> {
    ACTIVE_PROVIDERS
        .with(|providers| providers.borrow().last().cloned())
        .ok_or_else(|| AppError::missing_provider(PROVIDER_NAME))
}

#[derive(Clone)]
pub struct ScamHistoryHandle {
    state: Arc<watch::Sender<Vec<ScamCheckRecord>>>,
}

impl ScamHistoryHandle {
    pub fn add_result(
        &self,
        message: &str,
        ml_verdict: &str,
        secondary_verdict: &str,
        final_verdict: &str,
    ) -> ScamCheckRecord {
        let record = ScamCheckRecord {
            message: message.to_string(),
            ml_verdict: Verdict::parse(ml_verdict),
            secondary_verdict: Verdict::parse(secondary_verdict),
            final_verdict: Verdict::parse(final_verdict),
            timestamp: Utc::now().timestamp_millis(),
        };

        let stored = record.clone();
        self.state.send_modify(move |history| {
            history.insert(0, stored);
            history.truncate(SCAM_HISTORY_LIMIT);
        });

        debug!(
            target: "app::scam",
            fingerprint = %message_fingerprint(message),
            final_verdict = %record.final_verdict,
            "scam check recorded"
        );
        record
    }

    pub fn clear_history(&self) {
        self.state.send_modify(|history| history.clear());
        info!(target: "app::scam", "scam history cleared");
    }

    pub fn history(&self) -> Vec<ScamCheckRecord> {
        self.state.borrow().clone()
    }

    /// Receives every new snapshot of the list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ScamCheckRecord>> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> ScamStats {
        scam_stats(&self.state.borrow())
    }
}

pub fn scam_stats(history: &[ScamCheckRecord]) -> ScamStats {
    let spam_count = history
        .iter()
        .filter(|record| record.final_verdict == Verdict::Spam)
        .count();
    let ham_count = history
        .iter()
        .filter(|record| record.final_verdict == Verdict::Ham)
        .count();

    ScamStats {
        spam_count,
        ham_count,
        total: history.len(),
    }
}

pub fn verdict_distribution(stats: &ScamStats) -> Vec<DistributionSlice> {
    vec![
        DistributionSlice {
            name: "Spam".to_string(),
            value: stats.spam_count,
        },
        DistributionSlice {
            name: "Ham".to_string(),
            value: stats.ham_count,
        },
    ]
}
