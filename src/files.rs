//! Static files served below a public root.
//!
//! The request target is appended to the root as-is; the only guard is that
//! targets with `..` segments are treated as missing.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::ConnectionError;

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: String,
}

impl StaticFiles {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// `root + target`, e.g. `public/index.html`.
    pub fn resolve(&self, target: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.root, target))
    }

    /// Open the file for `target`. Anything that is not a readable regular
    /// file is reported as [`ConnectionError::FileNotFound`].
    pub async fn open(&self, target: &str) -> Result<File, ConnectionError> {
        let path = self.resolve(target);
        if target.split('/').any(|segment| segment == "..") {
            return Err(ConnectionError::FileNotFound(path));
        }

        let file = File::open(&path)
            .await
            .map_err(|_| ConnectionError::FileNotFound(path.clone()))?;
        match file.metadata().await {
            Ok(meta) if meta.is_file() => Ok(file),
            _ => Err(ConnectionError::FileNotFound(path)),
        }
    }

    /// Stream an opened file to the channel.
    pub async fn send_file<W>(&self, mut file: File, channel: &mut W) -> Result<u64, ConnectionError>
    where
        W: AsyncWrite + Unpin,
    {
        let sent = tokio::io::copy(&mut file, channel)
            .await
            .map_err(ConnectionError::from_write)?;
        channel.flush().await.map_err(ConnectionError::from_write)?;
        Ok(sent)
    }
}

/// `text/<ext>` for the target's extension, `text/` when it has none.
pub fn content_type(target: &str) -> String {
    let ext = Path::new(target)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    format!("text/{ext}")
}
