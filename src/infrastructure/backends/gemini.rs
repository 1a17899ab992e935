#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream;
use futures::stream::TryStreamExt;
use serde::Deserialize;
use serde::Serialize;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::Lines;
use tokio_util::io::StreamReader;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Backend;
use crate::domain::models::BackendName;
use crate::domain::models::ChatError;
use crate::domain::models::DeltaStream;
use crate::domain::models::ModelRequest;
use crate::domain::models::Part;
use crate::domain::models::Speaker;

fn convert_err(err: reqwest::Error) -> std::io::Error {
    let err_msg = err.to_string();
    return std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg);
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentPartsBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum ContentParts {
    Text(String),
    InlineData(ContentPartsBlob),
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<ContentParts>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SystemInstruction {
    parts: Vec<ContentParts>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl From<&ModelRequest> for CompletionRequest {
    fn from(request: &ModelRequest) -> CompletionRequest {
        let contents = request
            .turns
            .iter()
            .map(|turn| {
                let role = match turn.speaker {
                    Speaker::User => "user",
                    Speaker::Assistant => "model",
                };
                let parts = turn
                    .content
                    .iter()
                    .map(|part| match part {
                        Part::Text(text) => return ContentParts::Text(text.to_string()),
                        Part::Attachment { mime_type, data } => {
                            return ContentParts::InlineData(ContentPartsBlob {
                                mime_type: mime_type.to_string(),
                                data: data.to_string(),
                            })
                        }
                    })
                    .collect::<Vec<ContentParts>>();

                return Content {
                    role: role.to_string(),
                    parts,
                };
            })
            .collect::<Vec<Content>>();

        return CompletionRequest {
            system_instruction: SystemInstruction {
                parts: vec![ContentParts::Text(request.system_instruction.to_string())],
            },
            contents,
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
        };
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        let Some(content) = self
            .candidates
            .first()
            .and_then(|candidate| return candidate.content.as_ref())
        else {
            return "".to_string();
        };

        return content
            .parts
            .iter()
            .map(|part| return part.text.as_str())
            .collect::<Vec<&str>>()
            .join("");
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Maps a failed response to a typed error. A rejected key comes back as 400
/// with a message about the key, or as 401/403.
async fn status_error(res: reqwest::Response) -> anyhow::Error {
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| return e.error.message)
        .unwrap_or(body);

    tracing::error!(
        status = status,
        message = message,
        "Failed to make completion request to Gemini"
    );

    if status == 401 || status == 403 || message.to_lowercase().contains("api key") {
        return ChatError::ModelAuth.into();
    }

    return ChatError::ModelCall(format!(
        "Gemini request failed with status {status}: {message}"
    ))
    .into();
}

/// Reads server-sent events until the next non-empty text fragment.
async fn next_delta<R>(mut lines: Lines<R>) -> Result<Option<(String, Lines<R>)>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(None),
            Err(err) => bail!(ChatError::StreamInterrupted(err.to_string())),
        };

        let cleaned_line = line.trim();
        let Some(payload) = cleaned_line.strip_prefix("data:") else {
            continue;
        };

        let ores = match serde_json::from_str::<GenerateContentResponse>(payload.trim()) {
            Ok(ores) => ores,
            Err(err) => bail!(ChatError::StreamInterrupted(format!(
                "unreadable chunk from Gemini, {err}"
            ))),
        };

        let text = ores.text();
        if text.is_empty() {
            continue;
        }

        return Ok(Some((text, lines)));
    }
}

pub struct Gemini {
    url: String,
    token: String,
    model: String,
    timeout: String,
}

impl Default for Gemini {
    fn default() -> Gemini {
        return Gemini::new(
            &Config::get(ConfigKey::GeminiUrl),
            &Config::get(ConfigKey::GeminiToken),
            &Config::get(ConfigKey::Model),
            &Config::get(ConfigKey::BackendHealthCheckTimeout),
        );
    }
}

impl Gemini {
    pub fn new(url: &str, token: &str, model: &str, timeout: &str) -> Gemini {
        return Gemini {
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            model: model.trim_start_matches("models/").to_string(),
            timeout: timeout.to_string(),
        };
    }

    fn endpoint(&self, method: &str, query: &str) -> String {
        return format!(
            "{url}/v1beta/models/{model}:{method}?{query}key={key}",
            url = self.url,
            model = self.model,
            key = self.token,
        );
    }

    async fn post(&self, url: String, request: &ModelRequest) -> Result<reqwest::Response> {
        if self.token.is_empty() {
            bail!(ChatError::ModelAuth);
        }

        let req = CompletionRequest::from(request);
        let res = reqwest::Client::new().post(url).json(&req).send().await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, "Gemini is not reachable");
                bail!(ChatError::ModelCall(format!("Gemini is not reachable, {err}")));
            }
        };

        if !res.status().is_success() {
            return Err(status_error(res).await);
        }

        return Ok(res);
    }
}

#[async_trait]
impl Backend for Gemini {
    fn name(&self) -> BackendName {
        return BackendName::Gemini;
    }

    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("Gemini URL is not defined");
        }
        if self.token.is_empty() {
            bail!(ChatError::ModelAuth);
        }

        let url = format!(
            "{url}/v1beta/models/{model}?key={key}",
            url = self.url,
            model = self.model,
            key = self.token
        );

        let res = reqwest::Client::new()
            .get(&url)
            .timeout(Duration::from_millis(self.timeout.parse::<u64>()?))
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, "Gemini is not reachable");
                bail!("Gemini is not reachable");
            }
        };

        if !res.status().is_success() {
            return Err(status_error(res).await);
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn complete(&self, request: ModelRequest) -> Result<String> {
        let url = self.endpoint("generateContent", "");
        let res = self.post(url, &request).await?;

        let body = res
            .json::<GenerateContentResponse>()
            .await
            .map_err(|err| {
                return ChatError::ModelCall(format!("Unreadable response from Gemini, {err}"));
            })?;

        return Ok(body.text());
    }

    #[allow(clippy::implicit_return)]
    async fn stream_completion(&self, request: ModelRequest) -> Result<DeltaStream> {
        let url = self.endpoint("streamGenerateContent", "alt=sse&");
        let res = self.post(url, &request).await?;

        let byte_stream = res.bytes_stream().map_err(convert_err);
        let lines_reader = StreamReader::new(byte_stream).lines();

        return Ok(Box::pin(stream::try_unfold(lines_reader, next_delta)));
    }
}
