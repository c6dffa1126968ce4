//! Acceptance checks run before a cycle starts.

use crate::file::CandidateFile;
use thiserror::Error;

/// Largest accepted upload: 10 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{name} is not an image (declared type {content_type})")]
    NotAnImage { name: String, content_type: String },

    #[error("{name} is {size} bytes, the limit is {limit} bytes")]
    TooLarge { name: String, size: u64, limit: u64 },
}

/// Check the declared type first, then the size. Pure; nothing is read.
pub fn validate(file: &CandidateFile) -> Result<(), ValidationError> {
    if !file
        .content_type()
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
    {
        return Err(ValidationError::NotAnImage {
            name: file.name().to_string(),
            content_type: file.content_type().to_string(),
        });
    }
    if file.size() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge {
            name: file.name().to_string(),
            size: file.size(),
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}
