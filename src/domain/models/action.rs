use super::AnswerRequest;
use super::UploadedFile;

pub enum Action {
    Abort(),
    Ask(AnswerRequest),
    IngestFiles(Vec<UploadedFile>),
}
