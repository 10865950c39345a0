//! Step handlers of the flow state machine.
//!
//! Each handler receives a record already taken out of the store, performs
//! the remote I/O of the step without holding any lock, and either parks the
//! successor record or tears the flow down.

use super::export::deliver_members;
use super::{release, FlowAction, FlowMeta, FlowRecord, LoginStep};
use crate::config::{CHAT_BUTTON_LIMIT, DIALOG_FETCH_LIMIT};
use crate::context::GateContext;
use crate::gate::Inbound;
use crate::menu::texts;
use crate::phone::{looks_like_phone, normalize_phone, SessionKey};
use crate::remote::{ChatSummary, CodeOutcome, RemoteError, RemoteSession};
use crate::tracker::{self, MessageOrigin};
use crate::transport::{Caller, ChatRef, Keyboard};
use crate::vault::{Role, RosterChange};
use chrono::Utc;
use tracing::{error, info, warn};

/// Feed one caller input into the caller's flow
pub(crate) async fn advance(ctx: &GateContext, input: &Inbound, role: Role, record: FlowRecord) {
    let FlowRecord { action, meta } = record;
    match action {
        FlowAction::Login(LoginStep::Phone) => on_phone(ctx, input, role, meta).await,
        FlowAction::Login(LoginStep::Code { phone, handle }) => {
            on_code(ctx, input, role, phone, handle, meta).await;
        }
        FlowAction::Login(LoginStep::Password { phone, handle }) => {
            on_password(ctx, input, role, phone, handle, meta).await;
        }
        FlowAction::ChooseChat { handle, candidates } => {
            on_chat_choice(ctx, input, role, handle, candidates, meta).await;
        }
        FlowAction::AddAdmin => on_roster_edit(ctx, input, role, RosterEdit::AddAdmin, meta).await,
        FlowAction::AddOperator => {
            on_roster_edit(ctx, input, role, RosterEdit::AddOperator, meta).await;
        }
        FlowAction::RemoveOperator => {
            on_roster_edit(ctx, input, role, RosterEdit::RemoveOperator, meta).await;
        }
    }
}

/// Tear down the caller's flow, if any, and show the menu
pub(crate) async fn cancel(ctx: &GateContext, caller: Caller, chat: ChatRef, role: Role) {
    if let Some(record) = ctx.flows.take(caller).await {
        info!(user_id = caller, kind = ?record.kind(), "Flow cancelled");
        super::teardown(&ctx.notifier, record.action, record.meta).await;
    }
    ctx.notifier
        .say(chat, texts::BACK_TO_MENU, Some(Keyboard::MainMenu(role)))
        .await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Send a prompt and track it for deletion
async fn prompt(ctx: &GateContext, chat: ChatRef, meta: &mut FlowMeta, text: &str, keyboard: Keyboard) {
    if let Some(message) = ctx.notifier.say(chat, text, Some(keyboard)).await {
        meta.tracked.record(chat, message, MessageOrigin::Bot);
    }
}

/// Store the successor record
async fn park(ctx: &GateContext, caller: Caller, action: FlowAction, meta: FlowMeta) {
    if let Some(stale) = ctx
        .flows
        .insert(caller, FlowRecord::resume(action, meta))
        .await
    {
        warn!(user_id = caller, kind = ?stale.kind(), "Replaced a concurrent flow record");
        super::teardown(&ctx.notifier, stale.action, stale.meta).await;
    }
}

/// Tear the flow down and return the caller to the menu with `text`
async fn finish(
    ctx: &GateContext,
    input: &Inbound,
    role: Role,
    handle: Option<Box<dyn RemoteSession>>,
    meta: FlowMeta,
    text: &str,
) {
    release(&ctx.notifier, handle, meta).await;
    ctx.notifier
        .say(input.chat, text, Some(Keyboard::MainMenu(role)))
        .await;
}

fn titles(candidates: &[ChatSummary]) -> Vec<String> {
    candidates.iter().map(|chat| chat.title.clone()).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Login
// ─────────────────────────────────────────────────────────────────────────────

async fn on_phone(ctx: &GateContext, input: &Inbound, role: Role, mut meta: FlowMeta) {
    if !looks_like_phone(&input.text) {
        prompt(ctx, input.chat, &mut meta, texts::INVALID_PHONE, Keyboard::Cancel).await;
        park(ctx, input.caller, FlowAction::Login(LoginStep::Phone), meta).await;
        return;
    }

    let phone = normalize_phone(&input.text);
    let key = SessionKey::for_phone(&phone);

    if ctx.sessions.get_live(&key, Utc::now()).await.is_some() {
        match ctx.remote.resume(&phone).await {
            Ok(handle) => {
                info!(target: "oxide_gate::session", session = %key, user_id = input.caller, "Session reused");
                ctx.sessions.put(key, input.caller).await;
                present_chats(ctx, input, role, handle, meta).await;
            }
            Err(e) => {
                warn!(target: "oxide_gate::session", session = %key, error = %e, "Failed to reuse session");
                finish(ctx, input, role, None, meta, texts::AUTH_FAILED).await;
            }
        }
        return;
    }

    prompt(ctx, input.chat, &mut meta, texts::SENDING_CODE, Keyboard::Cancel).await;
    match ctx.remote.request_code(&phone).await {
        Ok(handle) => {
            prompt(ctx, input.chat, &mut meta, texts::ASK_CODE, Keyboard::Cancel).await;
            park(
                ctx,
                input.caller,
                FlowAction::Login(LoginStep::Code { phone, handle }),
                meta,
            )
            .await;
        }
        Err(RemoteError::AlreadyExists) => {
            info!(target: "oxide_gate::session", session = %key, "Credential artifact exists without a tracked session");
            finish(ctx, input, role, None, meta, texts::SESSION_EXISTS).await;
        }
        Err(e) => {
            warn!(user_id = input.caller, error = %e, "Code request failed");
            let text = texts::code_request_failed(&e.to_string());
            finish(ctx, input, role, None, meta, &text).await;
        }
    }
}

async fn on_code(
    ctx: &GateContext,
    input: &Inbound,
    role: Role,
    phone: String,
    handle: Box<dyn RemoteSession>,
    mut meta: FlowMeta,
) {
    match handle.sign_in_with_code(&input.text).await {
        Ok(CodeOutcome::Authenticated) => authenticated(ctx, input, role, &phone, handle, meta).await,
        Ok(CodeOutcome::PasswordRequired) => {
            prompt(ctx, input.chat, &mut meta, texts::ASK_PASSWORD, Keyboard::Cancel).await;
            park(
                ctx,
                input.caller,
                FlowAction::Login(LoginStep::Password { phone, handle }),
                meta,
            )
            .await;
        }
        Err(e) => {
            warn!(user_id = input.caller, error = %e, "Code sign-in failed");
            finish(ctx, input, role, Some(handle), meta, texts::AUTH_FAILED).await;
        }
    }
}

async fn on_password(
    ctx: &GateContext,
    input: &Inbound,
    role: Role,
    phone: String,
    handle: Box<dyn RemoteSession>,
    meta: FlowMeta,
) {
    match handle.sign_in_with_password(&input.text).await {
        Ok(()) => authenticated(ctx, input, role, &phone, handle, meta).await,
        Err(e) => {
            warn!(user_id = input.caller, error = %e, "Password sign-in failed");
            finish(ctx, input, role, Some(handle), meta, texts::PASSWORD_FAILED).await;
        }
    }
}

async fn authenticated(
    ctx: &GateContext,
    input: &Inbound,
    role: Role,
    phone: &str,
    handle: Box<dyn RemoteSession>,
    meta: FlowMeta,
) {
    let key = SessionKey::for_phone(phone);
    info!(target: "oxide_gate::session", session = %key, user_id = input.caller, "Session created");
    ctx.sessions.put(key, input.caller).await;
    present_chats(ctx, input, role, handle, meta).await;
}

async fn present_chats(
    ctx: &GateContext,
    input: &Inbound,
    role: Role,
    handle: Box<dyn RemoteSession>,
    mut meta: FlowMeta,
) {
    let chats = match handle.list_chats(DIALOG_FETCH_LIMIT).await {
        Ok(chats) => chats,
        Err(e) => {
            warn!(user_id = input.caller, error = %e, "Failed to list chats");
            finish(ctx, input, role, Some(handle), meta, texts::CHATS_FAILED).await;
            return;
        }
    };

    let candidates: Vec<ChatSummary> = chats
        .into_iter()
        .filter(|chat| chat.is_exportable())
        .take(CHAT_BUTTON_LIMIT)
        .collect();
    if candidates.is_empty() {
        finish(ctx, input, role, Some(handle), meta, texts::NO_CHATS).await;
        return;
    }

    // Login secrets are no longer needed once the account is authenticated
    tracker::purge(&ctx.notifier, meta.tracked.take()).await;
    ctx.notifier
        .say(
            input.chat,
            texts::CHOOSE_CHAT,
            Some(Keyboard::Choices(titles(&candidates))),
        )
        .await;
    park(
        ctx,
        input.caller,
        FlowAction::ChooseChat { handle, candidates },
        meta,
    )
    .await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat selection
// ─────────────────────────────────────────────────────────────────────────────

async fn on_chat_choice(
    ctx: &GateContext,
    input: &Inbound,
    role: Role,
    handle: Box<dyn RemoteSession>,
    candidates: Vec<ChatSummary>,
    mut meta: FlowMeta,
) {
    let Some(chosen) = candidates.iter().find(|chat| chat.title == input.text).cloned() else {
        let keyboard = Keyboard::Choices(titles(&candidates));
        prompt(ctx, input.chat, &mut meta, texts::CHAT_NOT_FOUND, keyboard).await;
        park(
            ctx,
            input.caller,
            FlowAction::ChooseChat { handle, candidates },
            meta,
        )
        .await;
        return;
    };

    deliver_members(ctx, input.chat, handle.as_ref(), &chosen).await;
    finish(ctx, input, role, Some(handle), meta, texts::BACK_TO_MENU).await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Roster edits
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
enum RosterEdit {
    AddAdmin,
    AddOperator,
    RemoveOperator,
}

impl RosterEdit {
    const fn action(self) -> FlowAction {
        match self {
            Self::AddAdmin => FlowAction::AddAdmin,
            Self::AddOperator => FlowAction::AddOperator,
            Self::RemoveOperator => FlowAction::RemoveOperator,
        }
    }
}

async fn on_roster_edit(ctx: &GateContext, input: &Inbound, role: Role, edit: RosterEdit, meta: FlowMeta) {
    let Ok(user_id) = input.text.trim().parse::<i64>() else {
        ctx.notifier
            .say(input.chat, texts::ID_NOT_NUMBER, Some(Keyboard::Cancel))
            .await;
        park(ctx, input.caller, edit.action(), meta).await;
        return;
    };

    let result = match edit {
        RosterEdit::AddAdmin => ctx.vault.add_admin(user_id).await,
        RosterEdit::AddOperator => ctx.vault.add_operator(user_id).await,
        RosterEdit::RemoveOperator => ctx.vault.remove_operator(user_id).await,
    };
    let text = match (edit, result) {
        (RosterEdit::AddAdmin, Ok(RosterChange::Applied)) => texts::admin_added(user_id),
        (RosterEdit::AddAdmin, Ok(RosterChange::Unchanged)) => texts::ALREADY_ADMIN.to_string(),
        (RosterEdit::AddOperator, Ok(RosterChange::Applied)) => texts::operator_added(user_id),
        (RosterEdit::AddOperator, Ok(RosterChange::Unchanged)) => texts::ALREADY_OPERATOR.to_string(),
        (RosterEdit::RemoveOperator, Ok(RosterChange::Applied)) => texts::operator_removed(user_id),
        (RosterEdit::RemoveOperator, Ok(RosterChange::Unchanged)) => {
            texts::OPERATOR_NOT_FOUND.to_string()
        }
        (_, Err(e)) => {
            error!(user_id = input.caller, error = %e, "Roster update failed");
            texts::ROSTER_SAVE_FAILED.to_string()
        }
    };
    info!(user_id = input.caller, target_id = user_id, edit = ?edit, "Roster edit handled");

    let role = ctx.vault.role(input.caller).await.unwrap_or(role);
    finish(ctx, input, role, None, meta, &text).await;
}
