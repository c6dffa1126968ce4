//! Data-URL previews shown while the classifier is still working.

use crate::file::CandidateFile;
use base64::{Engine, engine::general_purpose::STANDARD};
use std::io;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("could not read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("preview is not a base64 data URL")]
    MalformedDataUrl,

    #[error("preview payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// `data:<content-type>;base64,<payload>` rendering of an upload.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewImage {
    file_name: String,
    content_type: String,
    data_url: Arc<str>,
}

impl PreviewImage {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// Recover the original bytes, e.g. to build a texture.
    pub fn decode_bytes(&self) -> Result<Vec<u8>, PreviewError> {
        let (header, payload) = self
            .data_url
            .split_once(',')
            .ok_or(PreviewError::MalformedDataUrl)?;
        if !header.starts_with("data:") || !header.ends_with(";base64") {
            return Err(PreviewError::MalformedDataUrl);
        }
        Ok(STANDARD.decode(payload)?)
    }
}

/// Read the file and encode it as a data URL.
pub fn encode(file: &CandidateFile) -> Result<PreviewImage, PreviewError> {
    let bytes = file.read_bytes().map_err(|source| PreviewError::Read {
        name: file.name().to_string(),
        source,
    })?;
    Ok(PreviewImage {
        file_name: file.name().to_string(),
        content_type: file.content_type().to_string(),
        data_url: to_data_url(file.content_type(), &bytes).into(),
    })
}

pub fn to_data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{content_type};base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn encode_builds_data_url() -> Result<(), PreviewError> {
        let file = CandidateFile::from_bytes("tiny.png", None, b"abc".to_vec());
        let preview = encode(&file)?;
        assert_eq!(preview.data_url(), "data:image/png;base64,YWJj");
        assert_eq!(preview.file_name(), "tiny.png");
        assert_eq!(preview.decode_bytes()?, b"abc".to_vec());
        Ok(())
    }

    #[test]
    fn encode_reports_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("gone.png");
        std::fs::write(&path, b"x").unwrap();
        let file = CandidateFile::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let err = encode(&file).unwrap_err();
        assert!(matches!(err, PreviewError::Read { ref name, .. } if name == "gone.png"));
    }

    #[test]
    fn decode_rejects_non_data_urls() {
        let preview = PreviewImage {
            file_name: "x".into(),
            content_type: "image/png".into(),
            data_url: "https://example.org/x.png".into(),
        };
        assert!(matches!(
            preview.decode_bytes(),
            Err(PreviewError::MalformedDataUrl)
        ));
    }
}
