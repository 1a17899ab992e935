#[cfg(test)]
#[path = "document_test.rs"]
mod tests;

use std::path;

use serde::Deserialize;
use serde::Serialize;

pub const DEFAULT_MIME_TYPE: &str = "application/pdf";

/// An ingested file, held in full and sent to the model on every turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    /// Standard base64 of the file's bytes.
    pub content: String,
    pub mime_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileSource {
    Bytes(Vec<u8>),
    Path(path::PathBuf),
}

/// A file handed over by the file picker, not yet read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub source: FileSource,
}

impl UploadedFile {
    pub fn from_bytes(name: &str, mime_type: &str, bytes: Vec<u8>) -> UploadedFile {
        return UploadedFile {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            source: FileSource::Bytes(bytes),
        };
    }

    /// Names the upload after the file itself. The MIME type is left empty
    /// and resolves to PDF during ingestion.
    pub fn from_path(file_path: path::PathBuf) -> UploadedFile {
        let name = file_path
            .file_name()
            .map(|e| return e.to_string_lossy().to_string())
            .unwrap_or_else(|| return file_path.to_string_lossy().to_string());

        return UploadedFile {
            name,
            mime_type: "".to_string(),
            source: FileSource::Path(file_path),
        };
    }

    pub fn resolved_mime_type(&self) -> String {
        if self.mime_type.trim().is_empty() {
            return DEFAULT_MIME_TYPE.to_string();
        }

        return self.mime_type.to_string();
    }
}
