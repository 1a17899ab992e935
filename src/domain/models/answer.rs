use super::Document;
use super::Message;

/// A question together with the state it was asked against.
#[derive(Clone, Debug)]
pub struct AnswerRequest {
    /// Id the bot answer will carry. In streaming mode the placeholder
    /// already exists under this id.
    pub message_id: String,
    pub question: String,
    /// Messages as they were before the question was appended.
    pub history: Vec<Message>,
    pub documents: Vec<Document>,
}

/// Derived affordances attached to a finished answer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Annotations {
    pub source: Option<String>,
    pub link: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub annotations: Annotations,
}
