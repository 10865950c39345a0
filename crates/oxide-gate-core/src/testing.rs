//! Testing helpers and mock utilities.
//!
//! Builds a [`GateContext`] over a temporary data directory with mocked
//! transport and remote account.

use crate::config::GateSettings;
use crate::context::GateContext;
use crate::remote::{MockRemoteAccount, RemoteAccount};
use crate::transport::{MockTransport, Transport};
use crate::vault::RosterVault;
use std::path::Path;
use std::sync::Arc;

/// Admin id seeded by [`context_with`]
pub const ADMIN: i64 = 100;
/// Operator id seeded by [`context_with`]
pub const OPERATOR: i64 = 200;
/// Id with no role
pub const STRANGER: i64 = 300;

/// Settings rooted at `dir`
#[must_use]
pub fn settings_in(dir: &Path) -> GateSettings {
    GateSettings {
        data_dir: dir.to_path_buf(),
        ..GateSettings::default()
    }
}

/// Vault in `dir` holding [`ADMIN`] and [`OPERATOR`]
///
/// # Errors
///
/// Returns an error if the vault files cannot be created.
pub async fn seeded_vault(dir: &Path) -> Result<RosterVault, crate::vault::VaultError> {
    let settings = settings_in(dir);
    let vault = RosterVault::open(settings.users_file(), &settings.key_file()).await?;
    vault.add_admin(ADMIN).await?;
    vault.add_operator(OPERATOR).await?;
    Ok(vault)
}

/// A mock transport that accepts every call, numbering replies from 1000
#[must_use]
pub fn permissive_transport() -> MockTransport {
    let counter = std::sync::atomic::AtomicI32::new(1000);
    let mut transport = MockTransport::new();
    transport
        .expect_reply()
        .returning(move |_, _, _| Ok(counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst)));
    transport.expect_delete_message().returning(|_, _| Ok(()));
    transport.expect_send_document().returning(|_, _| Ok(()));
    transport
}

/// Context over a seeded vault in `dir`
///
/// # Errors
///
/// Returns an error if the vault files cannot be created.
pub async fn context_with(
    dir: &Path,
    transport: MockTransport,
    remote: MockRemoteAccount,
) -> Result<Arc<GateContext>, crate::vault::VaultError> {
    let vault = seeded_vault(dir).await?;
    let remote: Arc<dyn RemoteAccount> = Arc::new(remote);
    let transport: Arc<dyn Transport> = Arc::new(transport);
    Ok(Arc::new(GateContext::new(
        &settings_in(dir),
        Arc::new(vault),
        remote,
        transport,
    )))
}
