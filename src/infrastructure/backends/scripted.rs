use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use futures::future;
use futures::stream;
use futures::StreamExt;

use crate::domain::models::Backend;
use crate::domain::models::BackendName;
use crate::domain::models::ChatError;
use crate::domain::models::DeltaStream;
use crate::domain::models::ModelRequest;

/// What the scripted backend answers with.
#[derive(Clone, Debug)]
pub enum Script {
    Reply(String),
    Chunks(Vec<String>),
    ChunksThenFail(Vec<String>, ChatError),
    ChunksThenHang(Vec<String>),
    Fail(ChatError),
    Hang,
}

/// Answers every request from a fixed script and records what it was asked.
pub struct ScriptedBackend {
    script: Script,
    health: Option<ChatError>,
    pub requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl ScriptedBackend {
    pub fn new(script: Script) -> ScriptedBackend {
        return ScriptedBackend {
            script,
            health: None,
            requests: Arc::new(Mutex::new(vec![])),
        };
    }

    pub fn chunks(chunks: &[&str]) -> ScriptedBackend {
        return ScriptedBackend::new(Script::Chunks(
            chunks.iter().map(|e| return e.to_string()).collect(),
        ));
    }

    pub fn reply(text: &str) -> ScriptedBackend {
        return ScriptedBackend::new(Script::Reply(text.to_string()));
    }

    pub fn unhealthy(mut self, err: ChatError) -> ScriptedBackend {
        self.health = Some(err);
        return self;
    }

    fn record(&self, request: ModelRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

fn ok_chunks(chunks: Vec<String>) -> impl futures::Stream<Item = Result<String>> {
    return stream::iter(chunks.into_iter().map(Ok));
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> BackendName {
        return BackendName::Gemini;
    }

    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if let Some(err) = &self.health {
            return Err(err.clone().into());
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn complete(&self, request: ModelRequest) -> Result<String> {
        self.record(request);

        match &self.script {
            Script::Reply(text) => return Ok(text.to_string()),
            Script::Chunks(chunks) => return Ok(chunks.join("")),
            Script::ChunksThenFail(_, err) | Script::Fail(err) => {
                return Err(err.clone().into());
            }
            Script::ChunksThenHang(_) | Script::Hang => {
                future::pending::<()>().await;
                return Ok("".to_string());
            }
        }
    }

    #[allow(clippy::implicit_return)]
    async fn stream_completion(&self, request: ModelRequest) -> Result<DeltaStream> {
        self.record(request);

        match &self.script {
            Script::Reply(text) => return Ok(ok_chunks(vec![text.to_string()]).boxed()),
            Script::Chunks(chunks) => return Ok(ok_chunks(chunks.clone()).boxed()),
            Script::ChunksThenFail(chunks, err) => {
                let failure = stream::once(future::ready(Result::<String>::Err(err.clone().into())));
                return Ok(ok_chunks(chunks.clone()).chain(failure).boxed());
            }
            Script::ChunksThenHang(chunks) => {
                return Ok(ok_chunks(chunks.clone()).chain(stream::pending::<Result<String>>()).boxed());
            }
            Script::Fail(err) => return Err(err.clone().into()),
            Script::Hang => {
                future::pending::<()>().await;
                return Ok(stream::empty::<Result<String>>().boxed());
            }
        }
    }
}
