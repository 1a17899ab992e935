#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Deserialize;
use serde::Serialize;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BackendName {
    Gemini,
}

impl BackendName {
    pub fn parse(text: String) -> Option<BackendName> {
        return BackendName::iter().find(|e| return e.to_string() == text);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    Attachment { mime_type: String, data: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub content: Vec<Part>,
}

impl Turn {
    pub fn text(speaker: Speaker, text: &str) -> Turn {
        return Turn {
            speaker,
            content: vec![Part::Text(text.to_string())],
        };
    }
}

/// Everything a backend needs for one grounded answer. Backends translate
/// this into their own wire format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub system_instruction: String,
    pub temperature: f32,
    pub turns: Vec<Turn>,
}

/// Answer fragments in the order the model produced them. Consumed once.
pub type DeltaStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait Backend {
    fn name(&self) -> BackendName;

    /// Used at startup to verify the backend is reachable and accepts the
    /// configured credential.
    async fn health_check(&self) -> Result<()>;

    /// Requests a full answer in one response.
    ///
    /// A rejected credential must surface as `ChatError::ModelAuth` so callers
    /// can tell it apart from other failures.
    async fn complete(&self, request: ModelRequest) -> Result<String>;

    /// Requests an answer as a stream of text deltas. Failures before the
    /// first delta are returned directly, failures after it are yielded by
    /// the stream.
    async fn stream_completion(&self, request: ModelRequest) -> Result<DeltaStream>;
}

pub type BackendBox = Box<dyn Backend + Send + Sync>;
