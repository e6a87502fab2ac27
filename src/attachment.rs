use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to read {}: {source}", path.display())]
pub struct AttachmentError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

pub fn read_attachment(path: &Path) -> Result<Vec<u8>, AttachmentError> {
    fs::read(path).map_err(|source| AttachmentError {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads `path` and returns its contents as standard base64, the encoding chat
/// requests carry images in.
pub fn encode_attachment(path: &Path) -> Result<String, AttachmentError> {
    read_attachment(path).map(|bytes| general_purpose::STANDARD.encode(bytes))
}
