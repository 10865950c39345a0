//! Lifecycle sweeper
//!
//! Periodically expires remote sessions (deleting their credential
//! artifacts) and abandoned flow records (disconnecting their handles and
//! purging their tracked messages). Both passes remove entries under the
//! lock and do all I/O after releasing it.

use crate::context::GateContext;
use crate::flow;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What one sweep removed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired session entries
    pub sessions_expired: usize,
    /// Credential files deleted
    pub artifacts_removed: usize,
    /// Expired flow records
    pub flows_expired: usize,
}

/// Background expiry task
pub struct Sweeper {
    ctx: Arc<GateContext>,
}

impl Sweeper {
    /// Sweeper over a context
    #[must_use]
    pub const fn new(ctx: Arc<GateContext>) -> Self {
        Self { ctx }
    }

    /// Run one sweep as of `now`
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let (sessions, flows) = tokio::join!(self.expire_sessions(now), self.expire_flows(now));
        let report = SweepReport {
            sessions_expired: sessions.0,
            artifacts_removed: sessions.1,
            flows_expired: flows,
        };
        if report != SweepReport::default() {
            debug!(?report, "Sweep finished");
        }
        report
    }

    async fn expire_sessions(&self, now: DateTime<Utc>) -> (usize, usize) {
        let expired = self.ctx.sessions.remove_expired(now).await;
        let mut removed = 0;
        for entry in &expired {
            match self.ctx.artifacts.purge(&entry.key).await {
                Ok(count) => removed += count,
                Err(e) => warn!(session = %entry.key, error = %e, "Failed to list session artifacts"),
            }
            info!(
                target: "oxide_gate::session",
                session = %entry.key,
                user_id = entry.owner,
                "Session expired"
            );
        }
        (expired.len(), removed)
    }

    async fn expire_flows(&self, now: DateTime<Utc>) -> usize {
        let stale = self
            .ctx
            .flows
            .remove_stale(now, self.ctx.policy.flow_ttl())
            .await;
        let count = stale.len();
        for (caller, record) in stale {
            info!(user_id = caller, kind = ?record.kind(), "Flow expired");
            flow::teardown(&self.ctx.notifier, record.action, record.meta).await;
        }
        count
    }

    /// Sweep, then sleep for the configured interval, until cancelled
    pub async fn run(self, cancel: CancellationToken) {
        let interval = self.ctx.policy.sweep_interval;
        info!(interval_secs = interval.as_secs(), "Sweeper started");
        loop {
            self.sweep_at(Utc::now()).await;
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }
        info!("Sweeper stopped");
    }

    /// Run the sweeper on the current runtime
    #[must_use]
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
