#[cfg(test)]
#[path = "ingestion_test.rs"]
mod tests;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::fs;

use crate::domain::models::ChatError;
use crate::domain::models::Document;
use crate::domain::models::FileSource;
use crate::domain::models::UploadedFile;

pub struct Ingestion {}

impl Ingestion {
    /// Reads one upload in full and encodes it for the model.
    pub async fn decode(file: &UploadedFile) -> Result<Document> {
        let bytes = match &file.source {
            FileSource::Bytes(bytes) => bytes.clone(),
            FileSource::Path(file_path) => {
                fs::read(file_path).await.map_err(|err| {
                    return ChatError::Ingestion {
                        name: file.name.to_string(),
                        reason: err.to_string(),
                    };
                })?
            }
        };

        return Ok(Document {
            name: file.name.to_string(),
            content: STANDARD.encode(bytes),
            mime_type: file.resolved_mime_type(),
        });
    }

    /// Decodes a batch one file at a time, in order. The first failure aborts
    /// the batch and nothing decoded so far is returned.
    pub async fn decode_all(files: &[UploadedFile]) -> Result<Vec<Document>> {
        let mut documents = vec![];
        for file in files {
            let document = Ingestion::decode(file).await?;
            tracing::debug!(
                name = document.name,
                mime_type = document.mime_type,
                "decoded upload"
            );
            documents.push(document);
        }

        return Ok(documents);
    }
}
