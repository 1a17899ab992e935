use anyhow::Result;

use super::ChatSession;
use crate::domain::models::ChatError;
use crate::domain::models::MessageType;
use crate::domain::models::Readiness;
use crate::domain::models::Role;
use crate::domain::models::UploadedFile;
use crate::domain::services::PipelineOptions;
use crate::infrastructure::backends::scripted::Script;
use crate::infrastructure::backends::scripted::ScriptedBackend;

fn options(streaming: bool) -> PipelineOptions {
    return PipelineOptions {
        streaming,
        ..PipelineOptions::default()
    };
}

fn handbook() -> UploadedFile {
    return UploadedFile::from_bytes("handbook.pdf", "application/pdf", b"%PDF-1.4".to_vec());
}

async fn ready_session(backend: ScriptedBackend, streaming: bool) -> Result<ChatSession> {
    let mut session = ChatSession::start(Box::new(backend), options(streaming)).await?;
    session.upload_files(vec![handbook()])?;
    session.settle().await?;

    return Ok(session);
}

#[tokio::test]
async fn it_warns_about_rejected_credentials_on_start() -> Result<()> {
    let backend = ScriptedBackend::reply("").unhealthy(ChatError::ModelAuth);
    let session = ChatSession::start(Box::new(backend), options(true)).await?;

    let messages = session.state().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, Role::System);
    assert_eq!(messages[1].message_type(), MessageType::Error);
    insta::assert_snapshot!(messages[1].content, @"Error: Invalid API Key. Please check your environment variables.");

    return Ok(());
}

#[tokio::test]
async fn it_warns_about_unreachable_backends_on_start() -> Result<()> {
    let backend = ScriptedBackend::reply("").unhealthy(ChatError::ModelCall(
        "Gemini is not reachable".to_string(),
    ));
    let session = ChatSession::start(Box::new(backend), options(true)).await?;

    insta::assert_snapshot!(session.state().messages()[1].content, @r###"
    Hey, it looks like gemini isn't reachable right now. Questions will fail until it is back.

    Error: Gemini is not reachable
    "###);

    return Ok(());
}

#[tokio::test]
async fn it_starts_quietly_with_a_healthy_backend() -> Result<()> {
    let session = ChatSession::start(Box::new(ScriptedBackend::reply("")), options(true)).await?;

    assert_eq!(session.state().messages().len(), 1);
    assert_eq!(session.state().readiness(), Readiness::Idle);

    return Ok(());
}

#[tokio::test]
async fn it_acknowledges_uploads() -> Result<()> {
    let mut session = ChatSession::start(Box::new(ScriptedBackend::reply("")), options(true)).await?;

    session.upload_files(vec![handbook()])?;
    assert_eq!(session.state().readiness(), Readiness::Ingesting);

    let err = session.upload_files(vec![handbook()]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ChatError>(),
        Some(&ChatError::IngestionInProgress)
    );

    session.settle().await?;

    assert_eq!(session.state().readiness(), Readiness::Ready);
    assert_eq!(session.state().documents().len(), 1);
    assert!(session
        .state()
        .messages()
        .last()
        .unwrap()
        .content
        .starts_with("I've successfully ingested: handbook.pdf."));

    return Ok(());
}

#[tokio::test]
async fn it_ignores_empty_uploads() -> Result<()> {
    let mut session = ChatSession::start(Box::new(ScriptedBackend::reply("")), options(true)).await?;

    session.upload_files(vec![])?;

    assert_eq!(session.state().readiness(), Readiness::Idle);
    assert!(session.try_next_event().is_none());

    return Ok(());
}

#[tokio::test]
async fn it_rejects_questions_before_uploads() -> Result<()> {
    let mut session = ChatSession::start(Box::new(ScriptedBackend::reply("")), options(true)).await?;
    let err = session.send_message("Where is the gym?").unwrap_err();

    assert_eq!(err.downcast_ref::<ChatError>(), Some(&ChatError::NotReady));
    assert_eq!(session.state().messages().len(), 1);

    return Ok(());
}

#[tokio::test]
async fn it_streams_answers_into_the_log() -> Result<()> {
    let mut session = ready_session(ScriptedBackend::chunks(&["Hello", " world"]), true).await?;

    let message_id = session.send_message("Say hello")?;
    let placeholder = session.state().message(&message_id).unwrap();
    assert_eq!(placeholder.content, "");

    let err = session.send_message("Again").unwrap_err();
    assert_eq!(err.downcast_ref::<ChatError>(), Some(&ChatError::Busy));

    session.settle().await?;

    let messages = session.state().messages();
    let answer = messages.last().unwrap();
    assert_eq!(answer.id, message_id);
    assert_eq!(answer.content, "Hello world");
    assert_eq!(answer.source, Some("1 Document(s)".to_string()));
    assert_eq!(answer.link, None);
    assert_eq!(messages[messages.len() - 2].content, "Say hello");

    return Ok(());
}

#[tokio::test]
async fn it_links_support_for_missing_answers() -> Result<()> {
    let mut session = ready_session(ScriptedBackend::reply("I cannot find that policy."), false).await?;

    session.send_message("Is parking free?")?;
    session.settle().await?;

    let answer = session.state().messages().last().unwrap();
    assert_eq!(answer.role, Role::Bot);
    assert_eq!(answer.content, "I cannot find that policy.");
    assert_eq!(answer.link, Some("mailto:thehub@sfc.edu".to_string()));

    return Ok(());
}

#[tokio::test]
async fn it_reports_rejected_credentials_in_the_log() -> Result<()> {
    let mut session = ready_session(ScriptedBackend::new(Script::Fail(ChatError::ModelAuth)), false).await?;

    session.send_message("Is parking free?")?;
    session.settle().await?;

    let answer = session.state().messages().last().unwrap();
    assert_eq!(answer.role, Role::Bot);
    assert_eq!(answer.message_type(), MessageType::Error);
    assert_eq!(
        answer.content,
        "Error: Invalid API Key. Please check your environment variables."
    );
    assert!(!session.state().is_loading());

    return Ok(());
}

#[tokio::test]
async fn it_cancels_answers() -> Result<()> {
    let mut session = ready_session(ScriptedBackend::new(Script::Hang), true).await?;

    let message_id = session.send_message("Is parking free?")?;
    session.cancel()?;
    session.settle().await?;

    assert_eq!(
        session.state().message(&message_id).unwrap().content,
        "(response cancelled)"
    );

    let message_id = session.send_message("Still there?")?;
    assert!(session.state().message(&message_id).is_some());

    return Ok(());
}

#[tokio::test]
async fn it_removes_documents() -> Result<()> {
    let mut session = ready_session(ScriptedBackend::reply(""), true).await?;

    let removed = session.remove_document(0)?;

    assert_eq!(removed.name, "handbook.pdf");
    assert_eq!(session.state().readiness(), Readiness::Idle);
    assert!(session.toggle_chat_open());

    return Ok(());
}
