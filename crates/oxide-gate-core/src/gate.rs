//! Dispatch layer
//!
//! Resolves the caller's role, feeds input into an active flow, or matches it
//! against the menu. Callers without a role never get a reply; their
//! attempts only reach the access-violation log.

use crate::context::GateContext;
use crate::flow::machine;
use crate::flow::{FlowAction, FlowRecord, LoginStep};
use crate::menu::{texts, MenuItem};
use crate::tracker::MessageOrigin;
use crate::transport::{Caller, ChatRef, Keyboard, MessageRef};
use crate::vault::Role;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// One inbound text message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inbound {
    /// Sender
    pub caller: Caller,
    /// Chat the message arrived in
    pub chat: ChatRef,
    /// Message id
    pub message: MessageRef,
    /// Trimmed text
    pub text: String,
}

impl Inbound {
    /// Build an inbound message, trimming the text
    #[must_use]
    pub fn new(caller: Caller, chat: ChatRef, message: MessageRef, text: &str) -> Self {
        Self {
            caller,
            chat,
            message,
            text: text.trim().to_string(),
        }
    }
}

/// Message router shared by every update handler
#[derive(Clone)]
pub struct Gate {
    ctx: Arc<GateContext>,
}

impl Gate {
    /// Create a router over a context
    #[must_use]
    pub const fn new(ctx: Arc<GateContext>) -> Self {
        Self { ctx }
    }

    async fn authorize(&self, caller: Caller, attempt: &str) -> Option<Role> {
        let role = self.ctx.vault.role(caller).await;
        if role.is_none() {
            self.ctx.access_log.record(caller, attempt).await;
        }
        role
    }

    /// `/start`: usage warning followed by the role menu
    pub async fn handle_start(&self, input: &Inbound) {
        let Some(role) = self.authorize(input.caller, "/start without access").await else {
            return;
        };
        info!(user_id = input.caller, role = %role, "Start");
        self.ctx
            .notifier
            .say(input.chat, texts::USAGE_WARNING, None)
            .await;
        self.ctx
            .notifier
            .say(input.chat, texts::WELCOME, Some(Keyboard::MainMenu(role)))
            .await;
    }

    /// `/cancel`: same as the cancel button
    pub async fn handle_cancel(&self, input: &Inbound) {
        let Some(role) = self.authorize(input.caller, "/cancel without access").await else {
            return;
        };
        machine::cancel(&self.ctx, input.caller, input.chat, role).await;
    }

    /// Any other text message
    pub async fn handle_text(&self, input: &Inbound) {
        let attempt = format!("Unauthorized message: {}", input.text);
        let Some(role) = self.authorize(input.caller, &attempt).await else {
            return;
        };

        self.ctx
            .flows
            .record_message(input.caller, input.chat, input.message, MessageOrigin::Caller)
            .await;

        let item = MenuItem::parse(&input.text);
        if item == Some(MenuItem::Cancel) {
            machine::cancel(&self.ctx, input.caller, input.chat, role).await;
            return;
        }

        if let Some(record) = self.ctx.flows.take(input.caller).await {
            debug!(user_id = input.caller, kind = ?record.kind(), "Advancing flow");
            machine::advance(&self.ctx, input, role, record).await;
            return;
        }

        match item {
            Some(item) if item.admin_only() && role != Role::Admin => {
                self.ctx
                    .access_log
                    .record(input.caller, &format!("Operator selected {}", item.label()))
                    .await;
                self.ctx.notifier.say(input.chat, texts::ADMIN_ONLY, None).await;
            }
            Some(MenuItem::Scan) => self.start_login(input).await,
            Some(MenuItem::AddAdmin) => {
                self.start_roster_edit(input, FlowAction::AddAdmin, texts::ASK_ADMIN_ID, Keyboard::Cancel)
                    .await;
            }
            Some(MenuItem::AddOperator) => {
                self.start_roster_edit(
                    input,
                    FlowAction::AddOperator,
                    texts::ASK_OPERATOR_ID,
                    Keyboard::Cancel,
                )
                .await;
            }
            Some(MenuItem::RemoveOperator) => self.start_removal(input, role).await,
            Some(MenuItem::ListOperators) => self.list_operators(input, role).await,
            Some(MenuItem::Cancel) | None => {
                self.ctx
                    .notifier
                    .say(input.chat, texts::UNKNOWN_COMMAND, None)
                    .await;
            }
        }
    }

    async fn start_flow(&self, caller: Caller, record: FlowRecord) {
        if let Some(previous) = self.ctx.flows.insert(caller, record).await {
            crate::flow::teardown(&self.ctx.notifier, previous.action, previous.meta).await;
        }
    }

    async fn start_login(&self, input: &Inbound) {
        let mut record = FlowRecord::new(FlowAction::Login(LoginStep::Phone), Utc::now());
        if let Some(message) = self
            .ctx
            .notifier
            .say(input.chat, texts::ASK_PHONE, Some(Keyboard::Cancel))
            .await
        {
            record.meta.tracked.record(input.chat, message, MessageOrigin::Bot);
        }
        info!(user_id = input.caller, "Login flow started");
        self.start_flow(input.caller, record).await;
    }

    async fn start_roster_edit(&self, input: &Inbound, action: FlowAction, prompt: &str, keyboard: Keyboard) {
        self.start_flow(input.caller, FlowRecord::new(action, Utc::now()))
            .await;
        self.ctx
            .notifier
            .say(input.chat, prompt, Some(keyboard))
            .await;
    }

    async fn start_removal(&self, input: &Inbound, role: Role) {
        let operators = self.ctx.vault.roster().await.operators;
        if operators.is_empty() {
            self.ctx
                .notifier
                .say(input.chat, texts::NO_OPERATORS, Some(Keyboard::MainMenu(role)))
                .await;
            return;
        }
        let choices = operators.iter().map(ToString::to_string).collect();
        self.start_roster_edit(
            input,
            FlowAction::RemoveOperator,
            texts::ASK_REMOVE_ID,
            Keyboard::Choices(choices),
        )
        .await;
    }

    async fn list_operators(&self, input: &Inbound, role: Role) {
        let operators = self.ctx.vault.roster().await.operators;
        let text = if operators.is_empty() {
            texts::NO_OPERATORS.to_string()
        } else {
            texts::operator_list(&operators)
        };
        self.ctx
            .notifier
            .say(input.chat, &text, Some(Keyboard::MainMenu(role)))
            .await;
    }
}
