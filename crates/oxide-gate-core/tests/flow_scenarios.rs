mod common;

use chrono::Utc;
use common::{Harness, Script, ADMIN, NORMALIZED_PHONE, OPERATOR, PHONE};
use oxide_gate_core::flow::FlowKind;
use oxide_gate_core::menu::{texts, LABEL_CANCEL, LABEL_SCAN};
use oxide_gate_core::phone::SessionKey;
use oxide_gate_core::remote::{CodeOutcome, RemoteError};
use oxide_gate_core::transport::Keyboard;
use oxide_gate_core::vault::Role;

fn chat_keyboard() -> Option<Keyboard> {
    Some(Keyboard::Choices(vec!["Team".to_string(), "News".to_string()]))
}

#[tokio::test]
async fn admin_adds_operator() -> anyhow::Result<()> {
    let h = Harness::new(Script::default()).await?;

    h.send(ADMIN, "➕ Add operator").await;
    assert_eq!(h.ctx.flows.kind_of(ADMIN).await, Some(FlowKind::AddOperator));

    h.send(ADMIN, "12345").await;

    assert_eq!(h.ctx.vault.role(12345).await, Some(Role::Operator));
    assert!(!h.ctx.flows.contains(ADMIN).await);
    assert_eq!(
        h.transport.last_reply(),
        Some((texts::operator_added(12345), Some(Keyboard::MainMenu(Role::Admin))))
    );

    // Adding again is a no-op
    h.send(ADMIN, "➕ Add operator").await;
    h.send(ADMIN, "12345").await;
    assert_eq!(
        h.transport.last_reply().map(|(text, _)| text),
        Some(texts::ALREADY_OPERATOR.to_string())
    );
    assert_eq!(h.ctx.vault.roster().await.operators, vec![OPERATOR, 12345]);
    Ok(())
}

#[tokio::test]
async fn removing_unknown_operator_reports_not_found() -> anyhow::Result<()> {
    let h = Harness::new(Script::default()).await?;

    h.send(ADMIN, "➖ Remove operator").await;
    assert_eq!(
        h.transport.last_reply().and_then(|(_, keyboard)| keyboard),
        Some(Keyboard::Choices(vec![OPERATOR.to_string()]))
    );
    h.send(ADMIN, "999").await;

    assert_eq!(
        h.transport.last_reply().map(|(text, _)| text),
        Some(texts::OPERATOR_NOT_FOUND.to_string())
    );
    assert_eq!(h.ctx.vault.role(OPERATOR).await, Some(Role::Operator));
    Ok(())
}

#[tokio::test]
async fn login_without_second_factor_exports_members() -> anyhow::Result<()> {
    let h = Harness::new(Script::default()).await?;

    h.send(OPERATOR, LABEL_SCAN).await;
    let phone_msg = h.send(OPERATOR, PHONE).await;
    assert_eq!(h.ctx.flows.kind_of(OPERATOR).await, Some(FlowKind::LoginCode));

    let code_msg = h.send(OPERATOR, "12345").await;

    // Chat list presented, login messages purged
    assert_eq!(h.ctx.flows.kind_of(OPERATOR).await, Some(FlowKind::ChooseChat));
    assert_eq!(
        h.transport.last_reply(),
        Some((texts::CHOOSE_CHAT.to_string(), chat_keyboard()))
    );
    let deleted = h.transport.deleted();
    assert!(deleted.contains(&phone_msg));
    assert!(deleted.contains(&code_msg));
    for prompt in [texts::ASK_PHONE, texts::SENDING_CODE, texts::ASK_CODE] {
        let id = h.transport.reply_id(prompt);
        assert!(id.is_some_and(|id| deleted.contains(&id)), "{prompt} not purged");
    }

    // Session registered with a fixed window
    let key = SessionKey::for_phone(NORMALIZED_PHONE);
    let entry = h.ctx.sessions.get(&key).await;
    assert!(entry.as_ref().is_some_and(|e| e.owner == OPERATOR));
    assert!(entry.is_some_and(|e| e.expires_at - e.created_at == chrono::Duration::seconds(900)));

    h.send(OPERATOR, "Team").await;

    let documents = h.transport.documents();
    assert_eq!(documents.len(), 1);
    let (path, existed) = &documents[0];
    assert!(*existed);
    assert!(!path.exists());
    assert!(path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with("chat_members_1_")));

    assert!(!h.ctx.flows.contains(OPERATOR).await);
    assert_eq!(h.counter(|c| &c.disconnect), 1);
    assert_eq!(
        h.transport.last_reply(),
        Some((
            texts::BACK_TO_MENU.to_string(),
            Some(Keyboard::MainMenu(Role::Operator))
        ))
    );
    Ok(())
}

#[tokio::test]
async fn login_with_second_factor() -> anyhow::Result<()> {
    let h = Harness::new(Script {
        code: Ok(CodeOutcome::PasswordRequired),
        ..Script::default()
    })
    .await?;

    h.send(OPERATOR, LABEL_SCAN).await;
    h.send(OPERATOR, "+7 916 123 45 67").await;
    let started = h.ctx.flows.started_at(OPERATOR).await;
    h.send(OPERATOR, "12345").await;

    assert_eq!(h.ctx.flows.kind_of(OPERATOR).await, Some(FlowKind::LoginPassword));
    assert_eq!(h.ctx.flows.started_at(OPERATOR).await, started);
    assert!(h.transport.replies().contains(&texts::ASK_PASSWORD.to_string()));

    let password_msg = h.send(OPERATOR, "hunter2").await;

    assert_eq!(h.ctx.flows.kind_of(OPERATOR).await, Some(FlowKind::ChooseChat));
    assert!(h.transport.deleted().contains(&password_msg));
    assert!(h
        .ctx
        .sessions
        .get(&SessionKey::for_phone(NORMALIZED_PHONE))
        .await
        .is_some());
    Ok(())
}

#[tokio::test]
async fn existing_artifact_without_session_is_refused() -> anyhow::Result<()> {
    let h = Harness::new(Script {
        request_code: Err(RemoteError::AlreadyExists),
        ..Script::default()
    })
    .await?;

    h.send(OPERATOR, LABEL_SCAN).await;
    h.send(OPERATOR, PHONE).await;

    assert!(!h.ctx.flows.contains(OPERATOR).await);
    assert_eq!(
        h.transport.last_reply(),
        Some((
            texts::SESSION_EXISTS.to_string(),
            Some(Keyboard::MainMenu(Role::Operator))
        ))
    );
    assert!(h.ctx.sessions.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn tracked_session_is_reused() -> anyhow::Result<()> {
    let h = Harness::new(Script::default()).await?;

    h.send(OPERATOR, LABEL_SCAN).await;
    h.send(OPERATOR, PHONE).await;
    h.send(OPERATOR, "12345").await;
    h.send(OPERATOR, LABEL_CANCEL).await;

    h.send(ADMIN, LABEL_SCAN).await;
    h.send(ADMIN, "+79161234567").await;

    assert_eq!(h.counter(|c| &c.request_code), 1);
    assert_eq!(h.counter(|c| &c.resume), 1);
    assert_eq!(h.ctx.flows.kind_of(ADMIN).await, Some(FlowKind::ChooseChat));
    let entry = h
        .ctx
        .sessions
        .get(&SessionKey::for_phone(NORMALIZED_PHONE))
        .await;
    assert_eq!(entry.map(|e| e.owner), Some(ADMIN));
    Ok(())
}

#[tokio::test]
async fn failed_reuse_tears_down() -> anyhow::Result<()> {
    let h = Harness::new(Script::default()).await?;
    h.ctx
        .sessions
        .put(SessionKey::for_phone(NORMALIZED_PHONE), OPERATOR)
        .await;
    if let Ok(mut script) = h.remote.script.lock() {
        script.resume = Err(RemoteError::Unavailable("not authorized".to_string()));
    }

    h.send(OPERATOR, LABEL_SCAN).await;
    h.send(OPERATOR, PHONE).await;

    assert!(!h.ctx.flows.contains(OPERATOR).await);
    assert_eq!(
        h.transport.last_reply().map(|(text, _)| text),
        Some(texts::AUTH_FAILED.to_string())
    );
    Ok(())
}

#[tokio::test]
async fn expired_unswept_session_is_not_reused() -> anyhow::Result<()> {
    let h = Harness::new(Script::default()).await?;
    let key = SessionKey::for_phone(NORMALIZED_PHONE);
    h.ctx
        .sessions
        .put_at(key.clone(), OPERATOR, Utc::now() - chrono::Duration::seconds(1000))
        .await;

    h.send(OPERATOR, LABEL_SCAN).await;
    h.send(OPERATOR, PHONE).await;

    assert_eq!(h.counter(|c| &c.resume), 0);
    assert_eq!(h.counter(|c| &c.request_code), 1);
    assert_eq!(h.ctx.flows.kind_of(OPERATOR).await, Some(FlowKind::LoginCode));
    Ok(())
}

#[tokio::test]
async fn wrong_code_disconnects() -> anyhow::Result<()> {
    let h = Harness::new(Script {
        code: Err(RemoteError::Rpc("PHONE_CODE_INVALID".to_string())),
        ..Script::default()
    })
    .await?;

    h.send(OPERATOR, LABEL_SCAN).await;
    h.send(OPERATOR, PHONE).await;
    let code_msg = h.send(OPERATOR, "00000").await;

    assert!(!h.ctx.flows.contains(OPERATOR).await);
    assert_eq!(h.counter(|c| &c.disconnect), 1);
    assert!(h.transport.deleted().contains(&code_msg));
    assert!(h.ctx.sessions.is_empty().await);
    assert_eq!(
        h.transport.last_reply().map(|(text, _)| text),
        Some(texts::AUTH_FAILED.to_string())
    );
    Ok(())
}

#[tokio::test]
async fn no_exportable_chats_ends_flow() -> anyhow::Result<()> {
    let h = Harness::new(Script {
        chats: Ok(vec![common::chat(
            5,
            "Bob",
            oxide_gate_core::remote::ChatKind::Private,
        )]),
        ..Script::default()
    })
    .await?;

    h.send(OPERATOR, LABEL_SCAN).await;
    h.send(OPERATOR, PHONE).await;
    h.send(OPERATOR, "12345").await;

    assert!(!h.ctx.flows.contains(OPERATOR).await);
    assert_eq!(h.counter(|c| &c.disconnect), 1);
    assert_eq!(
        h.transport.last_reply().map(|(text, _)| text),
        Some(texts::NO_CHATS.to_string())
    );
    Ok(())
}

#[tokio::test]
async fn unknown_chat_title_reprompts() -> anyhow::Result<()> {
    let h = Harness::new(Script::default()).await?;

    h.send(OPERATOR, LABEL_SCAN).await;
    h.send(OPERATOR, PHONE).await;
    h.send(OPERATOR, "12345").await;
    // Private chats are never candidates
    h.send(OPERATOR, "Alice").await;

    assert_eq!(h.ctx.flows.kind_of(OPERATOR).await, Some(FlowKind::ChooseChat));
    assert_eq!(
        h.transport.last_reply(),
        Some((texts::CHAT_NOT_FOUND.to_string(), chat_keyboard()))
    );
    assert_eq!(h.counter(|c| &c.participants), 0);
    Ok(())
}

#[tokio::test]
async fn empty_chat_reports_no_members() -> anyhow::Result<()> {
    let h = Harness::new(Script {
        participants: Ok(Vec::new()),
        ..Script::default()
    })
    .await?;

    h.send(OPERATOR, LABEL_SCAN).await;
    h.send(OPERATOR, PHONE).await;
    h.send(OPERATOR, "12345").await;
    h.send(OPERATOR, "News").await;

    assert!(h.transport.documents().is_empty());
    assert!(h.transport.replies().contains(&texts::NO_MEMBERS.to_string()));
    assert!(!h.ctx.flows.contains(OPERATOR).await);
    assert_eq!(h.counter(|c| &c.disconnect), 1);
    Ok(())
}

#[tokio::test]
async fn cancel_is_accepted_at_every_step() -> anyhow::Result<()> {
    let second_factor = Script {
        code: Ok(CodeOutcome::PasswordRequired),
        ..Script::default()
    };
    // (script, inputs before cancel, step reached, expected disconnects)
    let cases: [(Script, &[&str], FlowKind, usize); 4] = [
        (Script::default(), &[], FlowKind::LoginPhone, 0),
        (Script::default(), &[PHONE], FlowKind::LoginCode, 1),
        (second_factor, &[PHONE, "12345"], FlowKind::LoginPassword, 1),
        (Script::default(), &[PHONE, "12345"], FlowKind::ChooseChat, 1),
    ];

    for (script, inputs, step, disconnects) in cases {
        let h = Harness::new(script).await?;
        h.send(OPERATOR, LABEL_SCAN).await;
        let mut sent = Vec::new();
        for input in inputs {
            sent.push(h.send(OPERATOR, input).await);
        }
        assert_eq!(h.ctx.flows.kind_of(OPERATOR).await, Some(step));

        let cancel_msg = h.send(OPERATOR, "/❌ cancel").await;

        assert!(!h.ctx.flows.contains(OPERATOR).await, "{step:?}");
        assert_eq!(h.counter(|c| &c.disconnect), disconnects, "{step:?}");
        let deleted = h.transport.deleted();
        assert!(deleted.contains(&cancel_msg), "{step:?}");
        assert!(sent.iter().all(|id| deleted.contains(id)), "{step:?}");
        assert_eq!(
            h.transport.last_reply(),
            Some((
                texts::BACK_TO_MENU.to_string(),
                Some(Keyboard::MainMenu(Role::Operator))
            ))
        );
    }
    Ok(())
}

#[tokio::test]
async fn failed_member_fetch_still_tears_down() -> anyhow::Result<()> {
    let h = Harness::new(Script {
        participants: Err(RemoteError::Rpc("CHAT_ADMIN_REQUIRED".to_string())),
        ..Script::default()
    })
    .await?;

    h.send(OPERATOR, LABEL_SCAN).await;
    h.send(OPERATOR, PHONE).await;
    h.send(OPERATOR, "12345").await;
    h.send(OPERATOR, "Team").await;

    assert_eq!(h.counter(|c| &c.participants), 1);
    assert!(h.transport.documents().is_empty());
    assert!(h.transport.replies().contains(&texts::MEMBERS_FAILED.to_string()));
    assert!(!h.ctx.flows.contains(OPERATOR).await);
    assert_eq!(h.counter(|c| &c.disconnect), 1);
    assert_eq!(
        h.transport.last_reply(),
        Some((
            texts::BACK_TO_MENU.to_string(),
            Some(Keyboard::MainMenu(Role::Operator))
        ))
    );
    Ok(())
}

#[tokio::test]
async fn one_flow_per_caller() -> anyhow::Result<()> {
    let h = Harness::new(Script::default()).await?;

    h.send(ADMIN, LABEL_SCAN).await;
    // Menu labels inside a flow are flow input, not a new flow
    h.send(ADMIN, "➕ Add admin").await;

    assert_eq!(h.ctx.flows.len().await, 1);
    assert_eq!(h.ctx.flows.kind_of(ADMIN).await, Some(FlowKind::LoginPhone));
    assert_eq!(
        h.transport.last_reply().map(|(text, _)| text),
        Some(texts::INVALID_PHONE.to_string())
    );
    Ok(())
}
