#[cfg(test)]
#[path = "session_state_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;

use crate::domain::models::Annotations;
use crate::domain::models::AnswerRequest;
use crate::domain::models::ChatError;
use crate::domain::models::Document;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::MessagePatch;
use crate::domain::models::MessageType;
use crate::domain::models::Readiness;
use crate::domain::models::Role;

pub const EMPTY_ANSWER_TEXT: &str = "I'm sorry, I couldn't process that request.";
pub const CANCELLED_ANSWER_TEXT: &str = "(response cancelled)";

pub fn error_text(error: &str) -> String {
    return format!("Error: {error}");
}

/// Owns the message log, the ingested documents, and everything derived from
/// them. Transitions are synchronous and never touch the network or disk.
pub struct SessionState {
    messages: Vec<Message>,
    documents: Vec<Document>,
    ingesting: bool,
    pending_answer: Option<String>,
    chat_open: bool,
}

impl Default for SessionState {
    fn default() -> SessionState {
        return SessionState {
            messages: vec![Message::welcome()],
            documents: vec![],
            ingesting: false,
            pending_answer: None,
            chat_open: false,
        };
    }
}

impl SessionState {
    pub fn messages(&self) -> &[Message] {
        return &self.messages;
    }

    pub fn documents(&self) -> &[Document] {
        return &self.documents;
    }

    pub fn readiness(&self) -> Readiness {
        return Readiness::derive(self.documents.len(), self.ingesting);
    }

    pub fn is_loading(&self) -> bool {
        return self.pending_answer.is_some();
    }

    pub fn is_chat_open(&self) -> bool {
        return self.chat_open;
    }

    pub fn toggle_chat_open(&mut self) -> bool {
        self.chat_open = !self.chat_open;
        return self.chat_open;
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        return self.messages.iter().find(|e| return e.id == id);
    }

    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Patches the message with the given id in place. Unknown ids are
    /// ignored and reported with `false`.
    pub fn update_message(&mut self, id: &str, patch: MessagePatch) -> bool {
        if let Some(message) = self.messages.iter_mut().find(|e| return e.id == id) {
            message.apply(patch);
            return true;
        }

        return false;
    }

    pub fn begin_ingestion(&mut self) -> Result<()> {
        if self.ingesting {
            bail!(ChatError::IngestionInProgress);
        }

        self.ingesting = true;
        return Ok(());
    }

    pub fn complete_ingestion(&mut self, documents: Vec<Document>) {
        self.ingesting = false;
        if documents.is_empty() {
            return;
        }

        let file_names = documents
            .iter()
            .map(|e| return e.name.as_str())
            .collect::<Vec<&str>>()
            .join(", ");

        self.documents.extend(documents);
        self.append_message(Message::new(
            Role::Bot,
            &format!("I've successfully ingested: {file_names}. You can now ask questions about these documents or upload more."),
        ));
    }

    /// Drops the whole batch. Documents ingested by earlier batches stay.
    pub fn fail_ingestion(&mut self, error: &str) {
        self.ingesting = false;
        self.append_message(Message::new_with_type(
            Role::Bot,
            MessageType::Error,
            &error_text(error),
        ));
    }

    pub fn remove_document(&mut self, index: usize) -> Result<Document> {
        if index >= self.documents.len() {
            bail!(ChatError::DocumentIndexOutOfRange {
                index,
                len: self.documents.len(),
            });
        }

        return Ok(self.documents.remove(index));
    }

    /// Records the user's question and returns what the answer pipeline needs
    /// to answer it. With `streaming` set, the empty bot placeholder is
    /// appended before this returns, so it always precedes the first delta.
    pub fn begin_send(&mut self, text: &str, streaming: bool) -> Result<AnswerRequest> {
        let question = text.trim();
        if question.is_empty() {
            bail!(ChatError::EmptyMessage);
        }
        if self.readiness() != Readiness::Ready {
            bail!(ChatError::NotReady);
        }
        if self.is_loading() {
            bail!(ChatError::Busy);
        }

        let history = self.messages.clone();
        self.append_message(Message::new(Role::User, question));

        let message_id = Message::create_id();
        if streaming {
            self.append_message(Message::with_id(&message_id, Role::Bot, ""));
        }
        self.pending_answer = Some(message_id.to_string());

        return Ok(AnswerRequest {
            message_id,
            question: question.to_string(),
            history,
            documents: self.documents.clone(),
        });
    }

    /// Folds a dispatcher event into the state.
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::AnswerDelta { message_id, text } => {
                self.update_message(&message_id, MessagePatch::append(&text));
            }
            Event::AnswerCompleted {
                message_id,
                text,
                annotations,
            } => {
                self.complete_answer(&message_id, &text, annotations);
            }
            Event::AnswerFailed { message_id, error } => {
                self.fail_answer(&message_id, &error);
            }
            Event::AnswerCancelled { message_id } => {
                self.cancel_answer(&message_id);
            }
            Event::BackendMessage(message) => {
                self.append_message(message);
            }
            Event::IngestionCompleted(documents) => {
                self.complete_ingestion(documents);
            }
            Event::IngestionFailed(error) => {
                self.fail_ingestion(&error);
            }
        }
    }

    fn finish_answer(&mut self, message_id: &str) {
        if self.pending_answer.as_deref() == Some(message_id) {
            self.pending_answer = None;
        }
    }

    fn complete_answer(&mut self, message_id: &str, text: &str, annotations: Annotations) {
        let patch = MessagePatch {
            content: Some(text.to_string()),
            source: annotations.source.clone(),
            link: annotations.link.clone(),
            ..MessagePatch::default()
        };

        if !self.update_message(message_id, patch) {
            let mut message = Message::with_id(message_id, Role::Bot, text);
            message.source = annotations.source;
            message.link = annotations.link;
            self.append_message(message);
        }

        self.finish_answer(message_id);
    }

    /// Content streamed before the failure is kept and the error is appended
    /// after it. Without any content the message is just the error.
    fn fail_answer(&mut self, message_id: &str, error: &str) {
        let error = error_text(error);
        let partial = self
            .message(message_id)
            .map(|e| return e.content.to_string());

        match partial {
            Some(partial) => {
                let content = if partial.is_empty() {
                    error
                } else {
                    format!("{partial}\n\n{error}")
                };
                self.update_message(
                    message_id,
                    MessagePatch {
                        content: Some(content),
                        mtype: Some(MessageType::Error),
                        ..MessagePatch::default()
                    },
                );
            }
            None => {
                let mut message = Message::with_id(message_id, Role::Bot, &error);
                message.apply(MessagePatch {
                    mtype: Some(MessageType::Error),
                    ..MessagePatch::default()
                });
                self.append_message(message);
            }
        }

        self.finish_answer(message_id);
    }

    /// Streamed content is kept. Without any, the answer reads as cancelled.
    /// In synchronous mode the cancelled answer is appended, but only for the
    /// pending question.
    fn cancel_answer(&mut self, message_id: &str) {
        let partial = self
            .message(message_id)
            .map(|e| return e.content.to_string());

        match partial {
            Some(partial) if partial.is_empty() => {
                self.update_message(message_id, MessagePatch::content(CANCELLED_ANSWER_TEXT));
            }
            Some(_) => (),
            None if self.pending_answer.as_deref() == Some(message_id) => {
                self.append_message(Message::with_id(
                    message_id,
                    Role::Bot,
                    CANCELLED_ANSWER_TEXT,
                ));
            }
            None => (),
        }

        self.finish_answer(message_id);
    }
}
