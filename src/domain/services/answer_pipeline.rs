#[cfg(test)]
#[path = "answer_pipeline_test.rs"]
mod tests;

use anyhow::Result;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::session_state::EMPTY_ANSWER_TEXT;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Annotations;
use crate::domain::models::Answer;
use crate::domain::models::AnswerRequest;
use crate::domain::models::BackendBox;
use crate::domain::models::ChatError;
use crate::domain::models::Document;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::ModelRequest;
use crate::domain::models::Part;
use crate::domain::models::Speaker;
use crate::domain::models::Turn;

pub const SYSTEM_INSTRUCTION: &str = r#"
You are 'TerrierHelper', the smart and friendly official AI for St. Francis College.
Your goal is to answer questions strictly based on the official documents provided as context.

### FORMATTING RULES:
1. **Use Structure:** Use bullet points, numbered lists, and bold text to make answers easy to read.
2. **Break it up:** Use multiple paragraphs for complex answers.
3. **Be Specific:** Always cite the source document in bold (e.g., **The Cord**).

### YOUR THINKING PROCESS:
1. **Analyze:** Does the user's question match any text in the provided CONTEXT?
2. **Verify:** If the user asks for facilities (Food/Gym/Library), check context first.
3. **Safety Check:** No off-campus data? Politely explain limitation.

### YOUR FINAL ANSWER GUIDELINES:
- **If found:** "Here is what I found in **[Source Name]**:\n\n* [Key Point 1]\n* [Key Point 2]"
- **If facility exists but details are thin:** "I can confirm St. Francis has a **[Facility Name]** on campus! While specific details like menus aren't in my files, it's a key part of the campus."
- **If missing:** "I cannot find that specific policy in the official files. To get the right answer, please contact **[Department]** (e.g., Registrar or the Hub at thehub@sfc.edu)."

Avoid long, dense blocks of text. Use lists whenever possible.
"#;

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOptions {
    pub system_instruction: String,
    pub temperature: f32,
    /// Lower-cased phrases that mark an answer as not found.
    pub escalation_markers: Vec<String>,
    pub escalation_link: String,
    pub streaming: bool,
}

impl Default for PipelineOptions {
    fn default() -> PipelineOptions {
        return PipelineOptions {
            system_instruction: SYSTEM_INSTRUCTION.trim().to_string(),
            temperature: 0.2,
            escalation_markers: PipelineOptions::parse_markers(&Config::default(
                ConfigKey::EscalationMarkers,
            )),
            escalation_link: Config::default(ConfigKey::EscalationLink),
            streaming: true,
        };
    }
}

impl PipelineOptions {
    pub fn parse_markers(text: &str) -> Vec<String> {
        return text
            .split(',')
            .map(|e| return e.trim().to_lowercase())
            .filter(|e| return !e.is_empty())
            .collect();
    }

    /// Builds options from the loaded configuration. Call after
    /// `Config::load`.
    pub fn from_config() -> Result<PipelineOptions> {
        return Ok(PipelineOptions {
            temperature: Config::get(ConfigKey::Temperature).parse::<f32>()?,
            escalation_markers: PipelineOptions::parse_markers(&Config::get(
                ConfigKey::EscalationMarkers,
            )),
            escalation_link: Config::get(ConfigKey::EscalationLink),
            streaming: Config::get_bool(ConfigKey::Streaming),
            ..PipelineOptions::default()
        });
    }
}

/// Turns a question plus session snapshot into a grounded model call, and the
/// model's output back into answer text and annotations.
pub struct AnswerPipeline {
    backend: BackendBox,
    options: PipelineOptions,
}

impl AnswerPipeline {
    pub fn new(backend: BackendBox, options: PipelineOptions) -> AnswerPipeline {
        return AnswerPipeline { backend, options };
    }

    pub fn build_request(
        &self,
        question: &str,
        history: &[Message],
        documents: &[Document],
    ) -> ModelRequest {
        let mut turns = history
            .iter()
            .filter(|e| return !e.is_welcome())
            .map(|e| {
                let speaker = if e.role.is_assistant() {
                    Speaker::Assistant
                } else {
                    Speaker::User
                };
                return Turn::text(speaker, &e.content);
            })
            .collect::<Vec<Turn>>();

        let mut content = documents
            .iter()
            .map(|doc| {
                return Part::Attachment {
                    mime_type: doc.mime_type.to_string(),
                    data: doc.content.to_string(),
                };
            })
            .collect::<Vec<Part>>();
        content.push(Part::Text(question.to_string()));

        turns.push(Turn {
            speaker: Speaker::User,
            content,
        });

        return ModelRequest {
            system_instruction: self.options.system_instruction.to_string(),
            temperature: self.options.temperature,
            turns,
        };
    }

    /// Derives the source tag and escalation link for a finished answer. The
    /// link is a substring heuristic and breaks if the model rephrases.
    pub fn annotate(&self, text: &str, document_count: usize) -> Annotations {
        let lowered = text.to_lowercase();
        let escalate = self
            .options
            .escalation_markers
            .iter()
            .any(|marker| return lowered.contains(marker.as_str()));

        let mut annotations = Annotations::default();
        if escalate && !self.options.escalation_link.is_empty() {
            annotations.link = Some(self.options.escalation_link.to_string());
        }
        if document_count > 0 {
            annotations.source = Some(format!("{document_count} Document(s)"));
        }

        return annotations;
    }

    fn finish(&self, text: String, document_count: usize) -> Answer {
        let text = if text.is_empty() {
            EMPTY_ANSWER_TEXT.to_string()
        } else {
            text
        };
        let annotations = self.annotate(&text, document_count);

        return Answer { text, annotations };
    }

    /// Asks for the whole answer at once.
    pub async fn ask(&self, request: &AnswerRequest) -> Result<Answer> {
        let model_request =
            self.build_request(&request.question, &request.history, &request.documents);
        let text = self.backend.complete(model_request).await?;

        return Ok(self.finish(text, request.documents.len()));
    }

    /// Runs one request in the configured mode and reports the outcome as
    /// events. Model failures become `AnswerFailed`, only a closed channel is
    /// returned as an error.
    pub async fn answer(
        &self,
        request: AnswerRequest,
        tx: &mpsc::UnboundedSender<Event>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let message_id = request.message_id.to_string();
        let res = if self.options.streaming {
            self.stream_answer(&request, tx, &cancel).await
        } else {
            tokio::select! {
                res = self.ask(&request) => res.map(Some),
                _ = cancel.cancelled() => Ok(None),
            }
        };

        let event = match res {
            Ok(Some(answer)) => Event::AnswerCompleted {
                message_id,
                text: answer.text,
                annotations: answer.annotations,
            },
            Ok(None) => Event::AnswerCancelled { message_id },
            Err(err) => {
                tracing::error!(error = ?err, "Failed to answer question");
                Event::AnswerFailed {
                    message_id,
                    error: AnswerPipeline::error_message(&err),
                }
            }
        };
        tx.send(event)?;

        return Ok(());
    }

    /// Forwards deltas as they arrive, one at a time and in order. An empty
    /// stream yields the fallback answer as its only delta. Returns `None`
    /// when cancelled.
    pub async fn stream_answer(
        &self,
        request: &AnswerRequest,
        tx: &mpsc::UnboundedSender<Event>,
        cancel: &CancellationToken,
    ) -> Result<Option<Answer>> {
        let model_request =
            self.build_request(&request.question, &request.history, &request.documents);

        let mut deltas = tokio::select! {
            res = self.backend.stream_completion(model_request) => res?,
            _ = cancel.cancelled() => return Ok(None),
        };

        let mut accumulated = "".to_string();
        loop {
            let delta = tokio::select! {
                delta = deltas.next() => delta,
                _ = cancel.cancelled() => return Ok(None),
            };

            let Some(delta) = delta else {
                break;
            };

            let text = delta?;
            accumulated += &text;
            tx.send(Event::AnswerDelta {
                message_id: request.message_id.to_string(),
                text,
            })?;
        }

        // Deltas add up to the final text, fallback included.
        if accumulated.is_empty() {
            accumulated = EMPTY_ANSWER_TEXT.to_string();
            tx.send(Event::AnswerDelta {
                message_id: request.message_id.to_string(),
                text: accumulated.to_string(),
            })?;
        }

        return Ok(Some(self.finish(accumulated, request.documents.len())));
    }

    /// The text shown to the user for a failed answer, without the `Error: `
    /// prefix. Rejected credentials always get the actionable message, even
    /// when wrapped in context.
    pub fn error_message(err: &anyhow::Error) -> String {
        if ChatError::is_auth(err) {
            return ChatError::ModelAuth.to_string();
        }

        return err.to_string();
    }
}
