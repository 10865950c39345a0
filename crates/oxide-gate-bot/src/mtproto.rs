//! MTProto remote account backed by grammers.
//!
//! Credentials are only written to disk once a login completes, so a failed
//! or abandoned login never leaves an artifact that would block the next
//! attempt for the same phone.

use async_trait::async_trait;
use grammers_client::types::{Chat, LoginToken, PackedChat, PasswordToken, Role};
use grammers_client::{Client, Config, InitParams, SignInError};
use grammers_session::Session;
use oxide_gate_core::artifacts::ArtifactStore;
use oxide_gate_core::phone::SessionKey;
use oxide_gate_core::remote::{
    ChatKind, ChatSummary, CodeOutcome, Participant, RemoteAccount, RemoteError, RemoteSession,
};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info};

fn rpc(e: impl std::fmt::Display) -> RemoteError {
    RemoteError::Rpc(e.to_string())
}

/// [`RemoteAccount`] that logs in through MTProto
pub struct GrammersAccount {
    api_id: i32,
    api_hash: String,
    artifacts: ArtifactStore,
}

impl GrammersAccount {
    /// Account factory using the given application credentials
    #[must_use]
    pub const fn new(api_id: i32, api_hash: String, artifacts: ArtifactStore) -> Self {
        Self {
            api_id,
            api_hash,
            artifacts,
        }
    }

    async fn connect(&self, session: Session) -> Result<Client, RemoteError> {
        Client::connect(Config {
            session,
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| RemoteError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl RemoteAccount for GrammersAccount {
    async fn request_code(&self, phone: &str) -> Result<Box<dyn RemoteSession>, RemoteError> {
        let key = SessionKey::for_phone(phone);
        if self.artifacts.exists(&key).await {
            return Err(RemoteError::AlreadyExists);
        }

        let client = self.connect(Session::new()).await?;
        let token = client.request_login_code(phone).await.map_err(rpc)?;
        debug!(session = %key, "Login code requested");

        Ok(Box::new(GrammersSession::new(
            client,
            self.artifacts.path_for(&key),
            Login::Code(token),
        )))
    }

    async fn resume(&self, phone: &str) -> Result<Box<dyn RemoteSession>, RemoteError> {
        let key = SessionKey::for_phone(phone);
        let path = self.artifacts.path_for(&key);
        let session = Session::load_file(&path).map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        let client = self.connect(session).await?;
        if !client.is_authorized().await.map_err(rpc)? {
            return Err(RemoteError::Unavailable(
                "stored session is no longer authorized".to_string(),
            ));
        }
        info!(session = %key, "Stored session resumed");

        Ok(Box::new(GrammersSession::new(client, path, Login::Done)))
    }
}

enum Login {
    Code(LoginToken),
    Password(PasswordToken),
    Done,
}

/// One connected MTProto client
struct GrammersSession {
    client: Mutex<Option<Client>>,
    session_path: PathBuf,
    login: Mutex<Login>,
    chats: Mutex<HashMap<i64, PackedChat>>,
}

impl GrammersSession {
    fn new(client: Client, session_path: PathBuf, login: Login) -> Self {
        Self {
            client: Mutex::new(Some(client)),
            session_path,
            login: Mutex::new(login),
            chats: Mutex::new(HashMap::new()),
        }
    }

    async fn client(&self) -> Result<Client, RemoteError> {
        self.client
            .lock()
            .await
            .clone()
            .ok_or_else(|| RemoteError::Unavailable("client disconnected".to_string()))
    }

    async fn persist(&self, client: &Client) -> Result<(), RemoteError> {
        if let Some(parent) = self.session_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        }
        client
            .session()
            .save_to_file(&self.session_path)
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        *self.login.lock().await = Login::Done;
        Ok(())
    }
}

#[async_trait]
impl RemoteSession for GrammersSession {
    async fn sign_in_with_code(&self, code: &str) -> Result<CodeOutcome, RemoteError> {
        let client = self.client().await?;
        let token = match std::mem::replace(&mut *self.login.lock().await, Login::Done) {
            Login::Code(token) => token,
            _ => return Err(rpc("no verification code was requested")),
        };

        match client.sign_in(&token, code).await {
            Ok(_) => {
                self.persist(&client).await?;
                Ok(CodeOutcome::Authenticated)
            }
            Err(SignInError::PasswordRequired(password_token)) => {
                *self.login.lock().await = Login::Password(password_token);
                Ok(CodeOutcome::PasswordRequired)
            }
            Err(e) => Err(rpc(e)),
        }
    }

    async fn sign_in_with_password(&self, password: &str) -> Result<(), RemoteError> {
        let client = self.client().await?;
        let token = match std::mem::replace(&mut *self.login.lock().await, Login::Done) {
            Login::Password(token) => token,
            _ => return Err(rpc("no password was requested")),
        };

        client
            .check_password(token, password.as_bytes())
            .await
            .map_err(rpc)?;
        self.persist(&client).await
    }

    async fn list_chats(&self, limit: usize) -> Result<Vec<ChatSummary>, RemoteError> {
        let client = self.client().await?;
        let mut dialogs = client.iter_dialogs();
        let mut summaries = Vec::new();
        let mut packed = HashMap::new();

        while summaries.len() < limit {
            let Some(dialog) = dialogs.next().await.map_err(rpc)? else {
                break;
            };
            let chat = dialog.chat();
            let kind = match chat {
                Chat::User(_) => ChatKind::Private,
                Chat::Group(_) => ChatKind::Group,
                Chat::Channel(_) => ChatKind::Channel,
            };
            packed.insert(chat.id(), chat.pack());
            summaries.push(ChatSummary {
                id: chat.id(),
                title: chat.name().to_string(),
                kind,
            });
        }

        *self.chats.lock().await = packed;
        Ok(summaries)
    }

    async fn participants(&self, chat_id: i64, limit: usize) -> Result<Vec<Participant>, RemoteError> {
        let client = self.client().await?;
        let chat = self
            .chats
            .lock()
            .await
            .get(&chat_id)
            .copied()
            .ok_or_else(|| rpc(format!("chat {chat_id} was not listed")))?;

        let mut iter = client.iter_participants(chat);
        let mut participants = Vec::new();
        while participants.len() < limit {
            let Some(member) = iter.next().await.map_err(rpc)? else {
                break;
            };
            let user = &member.user;
            let (is_admin, joined_at) = match &member.role {
                Role::User(normal) => (false, Some(normal.date())),
                Role::Creator(_) => (true, None),
                Role::Admin(admin) => (true, Some(admin.date())),
                Role::Banned(banned) => (false, Some(banned.date())),
                Role::Left(_) => (false, None),
                _ => (false, None),
            };
            participants.push(Participant {
                id: user.id(),
                is_admin,
                username: user.username().map(str::to_string),
                first_name: user.first_name().to_string(),
                last_name: user.last_name().map(str::to_string),
                phone: user.phone().map(str::to_string),
                joined_at,
            });
        }
        Ok(participants)
    }

    async fn disconnect(&self) {
        if self.client.lock().await.take().is_some() {
            debug!(path = %self.session_path.display(), "MTProto client released");
        }
    }
}
