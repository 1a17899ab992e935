use super::Annotations;
use super::Document;
use super::Message;

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    AnswerCancelled {
        message_id: String,
    },
    AnswerCompleted {
        message_id: String,
        text: String,
        annotations: Annotations,
    },
    AnswerDelta {
        message_id: String,
        text: String,
    },
    AnswerFailed {
        message_id: String,
        error: String,
    },
    BackendMessage(Message),
    IngestionCompleted(Vec<Document>),
    IngestionFailed(String),
}
