//! Upload candidates: a file name, its declared content type and size, and
//! where its bytes live.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone)]
enum FileSource {
    Disk(PathBuf),
    Memory(Arc<[u8]>),
}

/// A file the user picked, dropped or chose from the samples.
///
/// Size and content type are known up front so validation never reads the
/// contents.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    name: String,
    content_type: String,
    size: u64,
    source: FileSource,
}

impl CandidateFile {
    /// Describe a file on disk. Only metadata is read here.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path)
            .with_context(|| format!("cannot stat {}", path.display()))?;
        if !meta.is_file() {
            anyhow::bail!("Not a regular file: {}", path.display());
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            content_type: content_type_for(path).to_string(),
            name,
            size: meta.len(),
            source: FileSource::Disk(path.to_path_buf()),
        })
    }

    /// Wrap bytes already in memory. Without a declared type the type is
    /// derived from the name's extension.
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let name = name.into();
        let bytes = bytes.into();
        let content_type = content_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| content_type_for(Path::new(&name)).to_string());
        Self {
            name,
            content_type,
            size: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            FileSource::Disk(p) => Some(p),
            FileSource::Memory(_) => None,
        }
    }

    /// Same candidate with its size taken from disk again, since the file
    /// may have changed after it was listed. In-memory files are unchanged.
    pub fn refreshed(&self) -> io::Result<Self> {
        let mut current = self.clone();
        if let FileSource::Disk(p) = &self.source {
            current.size = fs::metadata(p)?.len();
        }
        Ok(current)
    }

    pub fn read_bytes(&self) -> io::Result<Arc<[u8]>> {
        match &self.source {
            FileSource::Disk(p) => Ok(fs::read(p)?.into()),
            FileSource::Memory(bytes) => Ok(Arc::clone(bytes)),
        }
    }
}

/// Declared content type for a path, based on its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
        return OCTET_STREAM;
    };
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "dcm" => "application/dicom",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "json" => "application/json",
        _ => OCTET_STREAM,
    }
}

pub(crate) fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            matches!(
                ext.as_str(),
                "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp"
            )
        }
        None => false,
    }
}
