#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use tokio::sync::mpsc;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Action;
use crate::domain::models::BackendBox;
use crate::domain::models::BackendName;
use crate::domain::models::ChatError;
use crate::domain::models::Document;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::MessageType;
use crate::domain::models::Readiness;
use crate::domain::models::Role;
use crate::domain::models::UploadedFile;
use crate::domain::services::actions::ActionsService;
use crate::domain::services::error_text;
use crate::domain::services::AnswerPipeline;
use crate::domain::services::PipelineOptions;
use crate::domain::services::SessionState;
use crate::infrastructure::backends::BackendManager;

fn health_check_message(backend_name: BackendName, err: &anyhow::Error) -> String {
    if ChatError::is_auth(err) {
        return error_text(&ChatError::ModelAuth.to_string());
    }

    return format!(
        "Hey, it looks like {backend_name} isn't reachable right now. Questions will fail until it is back.\n\nError: {err}"
    );
}

/// One user's conversation. Owns the session state and feeds it from the
/// background dispatcher. Dropping the session closes the action channel,
/// which cancels any answer still in flight.
pub struct ChatSession {
    state: SessionState,
    streaming: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    event_rx: mpsc::UnboundedReceiver<Event>,
}

impl ChatSession {
    pub async fn start(backend: BackendBox, options: PipelineOptions) -> Result<ChatSession> {
        let mut state = SessionState::default();

        if let Err(err) = backend.health_check().await {
            tracing::error!(error = ?err, backend = %backend.name(), "Backend health check failed");
            state.append_message(Message::new_with_type(
                Role::System,
                MessageType::Error,
                &health_check_message(backend.name(), &err),
            ));
        }

        let streaming = options.streaming;
        let pipeline = Arc::new(AnswerPipeline::new(backend, options));
        let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

        tokio::spawn(async move {
            let res = ActionsService::start(pipeline, event_tx, &mut action_rx).await;
            if let Err(err) = &res {
                tracing::error!(error = ?err, "Dispatcher stopped");
            }
            return res;
        });

        return Ok(ChatSession {
            state,
            streaming,
            action_tx,
            event_rx,
        });
    }

    /// Starts a session against the configured backend. Call after
    /// `Config::load`.
    pub async fn from_config() -> Result<ChatSession> {
        let backend_name = Config::get(ConfigKey::Backend);
        let Some(backend) = BackendName::parse(backend_name.to_string()) else {
            bail!(format!("Backend {backend_name} is not supported"));
        };

        return ChatSession::start(
            BackendManager::get(backend)?,
            PipelineOptions::from_config()?,
        )
        .await;
    }

    pub fn state(&self) -> &SessionState {
        return &self.state;
    }

    /// Records the question and hands it to the dispatcher. Returns the id of
    /// the bot message the answer will land in.
    pub fn send_message(&mut self, text: &str) -> Result<String> {
        let request = self.state.begin_send(text, self.streaming)?;
        let message_id = request.message_id.to_string();
        self.action_tx.send(Action::Ask(request))?;

        return Ok(message_id);
    }

    /// Queues a batch for ingestion. An empty batch changes nothing.
    pub fn upload_files(&mut self, files: Vec<UploadedFile>) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }

        self.state.begin_ingestion()?;
        self.action_tx.send(Action::IngestFiles(files))?;

        return Ok(());
    }

    pub fn remove_document(&mut self, index: usize) -> Result<Document> {
        return self.state.remove_document(index);
    }

    pub fn toggle_chat_open(&mut self) -> bool {
        return self.state.toggle_chat_open();
    }

    /// Stops the answer in flight, if any. Whatever streamed so far is kept.
    pub fn cancel(&mut self) -> Result<()> {
        if !self.state.is_loading() {
            return Ok(());
        }

        self.action_tx.send(Action::Abort())?;
        return Ok(());
    }

    fn handle(&mut self, event: Event) -> Event {
        self.state.apply(event.clone());
        return event;
    }

    /// Waits for the next dispatcher event and applies it. `None` once the
    /// dispatcher is gone.
    pub async fn next_event(&mut self) -> Option<Event> {
        let event = self.event_rx.recv().await?;
        return Some(self.handle(event));
    }

    /// Applies the next event if one is already queued.
    pub fn try_next_event(&mut self) -> Option<Event> {
        let event = self.event_rx.try_recv().ok()?;
        return Some(self.handle(event));
    }

    /// Applies events until no answer or ingestion is outstanding.
    pub async fn settle(&mut self) -> Result<()> {
        while self.state.is_loading() || self.state.readiness() == Readiness::Ingesting {
            if self.next_event().await.is_none() {
                bail!("Dispatcher stopped before the session settled");
            }
        }

        return Ok(());
    }
}
