#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::AnswerPipeline;
use super::Ingestion;
use crate::domain::models::Action;
use crate::domain::models::Event;
use crate::domain::models::UploadedFile;

async fn ingest(files: Vec<UploadedFile>, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
    let event = match Ingestion::decode_all(&files).await {
        Ok(documents) => Event::IngestionCompleted(documents),
        Err(err) => {
            tracing::error!(error = ?err, "Failed to ingest uploads");
            Event::IngestionFailed(err.to_string())
        }
    };
    tx.send(event)?;

    return Ok(());
}

pub struct ActionsService {}

impl ActionsService {
    /// Runs until the action channel closes. Answers and ingestion batches run
    /// on their own tasks so an abort is handled while a request is in flight.
    pub async fn start(
        pipeline: Arc<AnswerPipeline>,
        tx: mpsc::UnboundedSender<Event>,
        rx: &mut mpsc::UnboundedReceiver<Action>,
    ) -> Result<()> {
        let mut cancel = CancellationToken::new();

        loop {
            let Some(action) = rx.recv().await else {
                tracing::debug!("Action channel closed, stopping dispatcher");
                cancel.cancel();
                return Ok(());
            };

            let worker_tx = tx.clone();
            match action {
                Action::Abort() => {
                    cancel.cancel();
                }
                Action::Ask(request) => {
                    tracing::debug!(message_id = request.message_id, "Dispatching question");
                    cancel = CancellationToken::new();
                    let worker_cancel = cancel.clone();
                    let worker_pipeline = pipeline.clone();

                    tokio::spawn(async move {
                        let res = worker_pipeline
                            .answer(request, &worker_tx, worker_cancel)
                            .await;

                        if let Err(err) = res {
                            tracing::error!(error = ?err, "Answer worker stopped early");
                        }
                    });
                }
                Action::IngestFiles(files) => {
                    tracing::debug!(count = files.len(), "Dispatching uploads");
                    tokio::spawn(async move {
                        if let Err(err) = ingest(files, &worker_tx).await {
                            tracing::error!(error = ?err, "Ingestion worker stopped early");
                        }
                    });
                }
            }
        }
    }
}
