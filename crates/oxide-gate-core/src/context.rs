//! Shared service context
//!
//! [`GateContext`] owns the two lock-guarded maps (flows and sessions) plus
//! every capability the handlers need. It is built once at startup and
//! passed explicitly to the dispatcher and the sweeper.

use crate::access_log::AccessLog;
use crate::artifacts::ArtifactStore;
use crate::config::GateSettings;
use crate::flow::FlowStore;
use crate::registry::SessionRegistry;
use crate::remote::RemoteAccount;
use crate::transport::{Notifier, Transport};
use crate::vault::RosterVault;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Timing and location policy of the gate
#[derive(Clone, Debug)]
pub struct LifecyclePolicy {
    /// Lifetime of session entries and flow records
    pub ttl: Duration,
    /// Pause between sweeper passes
    pub sweep_interval: Duration,
    /// Directory for transient export files
    pub exports_dir: PathBuf,
}

impl LifecyclePolicy {
    /// Flow lifetime as a chrono duration
    #[must_use]
    pub fn flow_ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX)
    }
}

impl From<&GateSettings> for LifecyclePolicy {
    fn from(settings: &GateSettings) -> Self {
        Self {
            ttl: settings.session_ttl(),
            sweep_interval: settings.sweep_interval(),
            exports_dir: settings.exports_dir(),
        }
    }
}

/// Everything the dispatcher, the flow machine and the sweeper share
#[derive(Clone)]
pub struct GateContext {
    /// Encrypted roster
    pub vault: Arc<RosterVault>,
    /// Per-caller flow records
    pub flows: Arc<FlowStore>,
    /// Authenticated remote sessions
    pub sessions: Arc<SessionRegistry>,
    /// Persisted remote credentials
    pub artifacts: ArtifactStore,
    /// Remote account factory
    pub remote: Arc<dyn RemoteAccount>,
    /// Best-effort outgoing messages
    pub notifier: Notifier,
    /// Access-violation log
    pub access_log: Arc<AccessLog>,
    /// Timing policy
    pub policy: LifecyclePolicy,
}

impl GateContext {
    /// Assemble a context from settings and the injected capabilities
    #[must_use]
    pub fn new(
        settings: &GateSettings,
        vault: Arc<RosterVault>,
        remote: Arc<dyn RemoteAccount>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let policy = LifecyclePolicy::from(settings);
        Self {
            vault,
            flows: Arc::new(FlowStore::new()),
            sessions: Arc::new(SessionRegistry::new(policy.ttl)),
            artifacts: ArtifactStore::new(settings.sessions_dir()),
            remote,
            notifier: Notifier::new(transport),
            access_log: Arc::new(AccessLog::new(settings.wrong_access_log())),
            policy,
        }
    }
}
