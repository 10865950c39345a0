//! Hand-written fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use oxide_gate_core::config::GateSettings;
use oxide_gate_core::remote::{
    ChatKind, ChatSummary, CodeOutcome, Participant, RemoteAccount, RemoteError, RemoteSession,
};
use oxide_gate_core::transport::{ChatRef, Keyboard, MessageRef, Transport, TransportError};
use oxide_gate_core::vault::RosterVault;
use oxide_gate_core::{Gate, GateContext, Inbound};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ADMIN: i64 = 100;
pub const OPERATOR: i64 = 200;
pub const PHONE: &str = "89161234567";
pub const NORMALIZED_PHONE: &str = "+79161234567";

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Reply {
        chat: ChatRef,
        id: MessageRef,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Deleted {
        chat: ChatRef,
        message: MessageRef,
    },
    Document {
        chat: ChatRef,
        path: PathBuf,
        existed: bool,
    },
}

#[derive(Default)]
pub struct RecordingTransport {
    next_id: AtomicI32,
    events: Mutex<Vec<Event>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(1000),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn replies(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Reply { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_reply(&self) -> Option<(String, Option<Keyboard>)> {
        self.events().into_iter().rev().find_map(|event| match event {
            Event::Reply { text, keyboard, .. } => Some((text, keyboard)),
            _ => None,
        })
    }

    pub fn reply_id(&self, text: &str) -> Option<MessageRef> {
        self.events().into_iter().find_map(|event| match event {
            Event::Reply { id, text: sent, .. } if sent == text => Some(id),
            _ => None,
        })
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Deleted { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn documents(&self) -> Vec<(PathBuf, bool)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Document { path, existed, .. } => Some((path, existed)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn reply(
        &self,
        chat: ChatRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.push(Event::Reply {
            chat,
            id,
            text: text.to_string(),
            keyboard,
        });
        Ok(id)
    }

    async fn delete_message(&self, chat: ChatRef, message: MessageRef) -> Result<(), TransportError> {
        self.push(Event::Deleted { chat, message });
        Ok(())
    }

    async fn send_document(&self, chat: ChatRef, path: &Path) -> Result<(), TransportError> {
        self.push(Event::Document {
            chat,
            path: path.to_path_buf(),
            existed: path.exists(),
        });
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Remote account
// ─────────────────────────────────────────────────────────────────────────────

/// Scripted answers of every session handed out by [`ScriptedAccount`]
#[derive(Clone)]
pub struct Script {
    pub request_code: Result<(), RemoteError>,
    pub resume: Result<(), RemoteError>,
    pub code: Result<CodeOutcome, RemoteError>,
    pub password: Result<(), RemoteError>,
    pub chats: Result<Vec<ChatSummary>, RemoteError>,
    pub participants: Result<Vec<Participant>, RemoteError>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            request_code: Ok(()),
            resume: Ok(()),
            code: Ok(CodeOutcome::Authenticated),
            password: Ok(()),
            chats: Ok(vec![
                chat(1, "Team", ChatKind::Group),
                chat(2, "Alice", ChatKind::Private),
                chat(3, "News", ChatKind::Channel),
            ]),
            participants: Ok(vec![
                Participant {
                    id: 11,
                    is_admin: true,
                    username: Some("owner".to_string()),
                    first_name: "Olga".to_string(),
                    ..Participant::default()
                },
                Participant {
                    id: 12,
                    first_name: "Ivan".to_string(),
                    last_name: Some("Petrov".to_string()),
                    phone: Some("79160000000".to_string()),
                    ..Participant::default()
                },
            ]),
        }
    }
}

pub fn chat(id: i64, title: &str, kind: ChatKind) -> ChatSummary {
    ChatSummary {
        id,
        title: title.to_string(),
        kind,
    }
}

#[derive(Default)]
pub struct Counters {
    pub request_code: AtomicUsize,
    pub resume: AtomicUsize,
    pub disconnect: AtomicUsize,
    pub participants: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct ScriptedSession {
    script: Script,
    counters: Arc<Counters>,
}

#[async_trait]
impl RemoteSession for ScriptedSession {
    async fn sign_in_with_code(&self, _code: &str) -> Result<CodeOutcome, RemoteError> {
        self.script.code.clone()
    }

    async fn sign_in_with_password(&self, _password: &str) -> Result<(), RemoteError> {
        self.script.password.clone()
    }

    async fn list_chats(&self, _limit: usize) -> Result<Vec<ChatSummary>, RemoteError> {
        self.script.chats.clone()
    }

    async fn participants(&self, _chat_id: i64, _limit: usize) -> Result<Vec<Participant>, RemoteError> {
        self.counters.participants.fetch_add(1, Ordering::SeqCst);
        self.script.participants.clone()
    }

    async fn disconnect(&self) {
        self.counters.disconnect.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct ScriptedAccount {
    pub script: Mutex<Script>,
    pub counters: Arc<Counters>,
}

impl ScriptedAccount {
    pub fn new(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            counters: Arc::new(Counters::default()),
        }
    }

    fn session(&self) -> Result<(Script, Box<dyn RemoteSession>), RemoteError> {
        let script = self
            .script
            .lock()
            .map(|s| s.clone())
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        let session = ScriptedSession {
            script: script.clone(),
            counters: self.counters.clone(),
        };
        Ok((script, Box::new(session)))
    }
}

#[async_trait]
impl RemoteAccount for ScriptedAccount {
    async fn request_code(&self, _phone: &str) -> Result<Box<dyn RemoteSession>, RemoteError> {
        self.counters.request_code.fetch_add(1, Ordering::SeqCst);
        let (script, session) = self.session()?;
        script.request_code.map(|()| session)
    }

    async fn resume(&self, _phone: &str) -> Result<Box<dyn RemoteSession>, RemoteError> {
        self.counters.resume.fetch_add(1, Ordering::SeqCst);
        let (script, session) = self.session()?;
        script.resume.map(|()| session)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub transport: Arc<RecordingTransport>,
    pub remote: Arc<ScriptedAccount>,
    pub ctx: Arc<GateContext>,
    pub gate: Gate,
    next_message: AtomicI32,
}

impl Harness {
    pub async fn new(script: Script) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let settings = GateSettings {
            data_dir: dir.path().to_path_buf(),
            ..GateSettings::default()
        };
        let vault = RosterVault::open(settings.users_file(), &settings.key_file()).await?;
        vault.add_admin(ADMIN).await?;
        vault.add_operator(OPERATOR).await?;

        let transport = Arc::new(RecordingTransport::new());
        let remote = Arc::new(ScriptedAccount::new(script));
        let ctx = Arc::new(GateContext::new(
            &settings,
            Arc::new(vault),
            remote.clone(),
            transport.clone(),
        ));

        Ok(Self {
            dir,
            transport,
            remote,
            gate: Gate::new(ctx.clone()),
            ctx,
            next_message: AtomicI32::new(1),
        })
    }

    /// Send a text as `caller`, returning the inbound message id
    pub async fn send(&self, caller: i64, text: &str) -> MessageRef {
        let id = self.next_message.fetch_add(1, Ordering::SeqCst);
        self.gate
            .handle_text(&Inbound::new(caller, caller, id, text))
            .await;
        id
    }

    pub fn counter(&self, pick: impl Fn(&Counters) -> &AtomicUsize) -> usize {
        Counters::get(pick(&self.remote.counters))
    }
}
