use std::path;

use super::FileSource;
use super::UploadedFile;

#[test]
fn it_defaults_mime_type_to_pdf() {
    let file = UploadedFile::from_bytes("handbook.pdf", "", vec![1, 2, 3]);
    assert_eq!(file.resolved_mime_type(), "application/pdf");

    let file = UploadedFile::from_bytes("handbook.pdf", "  ", vec![1, 2, 3]);
    assert_eq!(file.resolved_mime_type(), "application/pdf");
}

#[test]
fn it_keeps_declared_mime_type() {
    let file = UploadedFile::from_bytes("notes.txt", "text/plain", vec![]);
    assert_eq!(file.resolved_mime_type(), "text/plain");
}

#[test]
fn it_names_path_uploads_after_the_file() {
    let file = UploadedFile::from_path(path::PathBuf::from("/tmp/docs/syllabus.pdf"));
    assert_eq!(file.name, "syllabus.pdf");
    assert_eq!(file.mime_type, "");
    assert_eq!(
        file.source,
        FileSource::Path(path::PathBuf::from("/tmp/docs/syllabus.pdf"))
    );
}
