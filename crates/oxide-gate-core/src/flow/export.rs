//! Member export step of the chat-selection flow.

use crate::config::MEMBER_EXPORT_LIMIT;
use crate::context::GateContext;
use crate::export::{export_file_name, write_csv, ExportError, ExportFormat, MemberRow};
use crate::menu::texts;
use crate::remote::{ChatSummary, RemoteSession};
use crate::transport::ChatRef;
use chrono::Utc;
use std::path::PathBuf;
use tracing::{info, warn};

/// Fetch the members of `target`, write them to a file, upload it and delete
/// the local copy. Failures are reported to the caller, never propagated.
pub(super) async fn deliver_members(
    ctx: &GateContext,
    chat: ChatRef,
    handle: &dyn RemoteSession,
    target: &ChatSummary,
) {
    let participants = match handle.participants(target.id, MEMBER_EXPORT_LIMIT).await {
        Ok(participants) => participants,
        Err(e) => {
            warn!(chat_id = target.id, error = %e, "Failed to fetch participants");
            ctx.notifier.say(chat, texts::MEMBERS_FAILED, None).await;
            return;
        }
    };

    let rows: Vec<MemberRow> = participants
        .iter()
        .take(MEMBER_EXPORT_LIMIT)
        .map(MemberRow::from)
        .collect();
    if rows.is_empty() {
        ctx.notifier.say(chat, texts::NO_MEMBERS, None).await;
        return;
    }

    let path = match write_export(ctx, chat, target.id, &rows).await {
        Ok(path) => path,
        Err(e) => {
            warn!(chat_id = target.id, error = %e, "Failed to write export file");
            ctx.notifier.say(chat, texts::MEMBERS_FAILED, None).await;
            return;
        }
    };

    if ctx.notifier.upload(chat, &path).await {
        info!(chat_id = target.id, members = rows.len(), "Member export delivered");
    } else {
        ctx.notifier.say(chat, texts::UPLOAD_FAILED, None).await;
    }

    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove export file");
    }
}

async fn write_export(
    ctx: &GateContext,
    chat: ChatRef,
    chat_id: i64,
    rows: &[MemberRow],
) -> Result<PathBuf, ExportError> {
    let stamp = Utc::now().timestamp();
    let dir = ctx.policy.exports_dir.as_path();

    #[cfg(feature = "xlsx")]
    {
        let name = export_file_name(chat_id, stamp, ExportFormat::Xlsx);
        match crate::export::write_xlsx(dir, &name, rows).await {
            Ok(path) => return Ok(path),
            Err(e) => warn!(error = %e, "Spreadsheet export failed, falling back to CSV"),
        }
    }

    ctx.notifier.say(chat, texts::CSV_FALLBACK, None).await;
    write_csv(dir, &export_file_name(chat_id, stamp, ExportFormat::Csv), rows).await
}
