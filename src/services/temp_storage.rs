use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

const FALLBACK_FILENAME: &str = "upload";

/// An uploaded file written to a private per-job directory.
///
/// The directory is named after the job id, so concurrent uploads that share
/// a filename never touch each other's bytes. The file keeps its declared
/// name because the parser infers the document type from the extension.
/// Directory creation and removal run on the blocking pool. Dropping the
/// value still removes the directory synchronously; `close` is the path the
/// pipeline takes and it reports failures.
#[derive(Debug)]
pub struct ScopedUpload {
    dir: TempDir,
    path: PathBuf,
}

impl ScopedUpload {
    pub async fn write(root: &Path, job_id: Uuid, filename: &str, bytes: &[u8]) -> io::Result<Self> {
        tokio::fs::create_dir_all(root).await?;

        let root = root.to_path_buf();
        let prefix = format!("docparse-{job_id}-");
        let dir = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new().prefix(&prefix).tempdir_in(&root)
        })
        .await
        .map_err(io::Error::other)??;
        let path = dir.path().join(sanitize_filename(filename));

        tokio::fs::write(&path, bytes).await?;

        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn close(self) -> io::Result<()> {
        let dir = self.dir;
        tokio::task::spawn_blocking(move || dir.close())
            .await
            .map_err(io::Error::other)?
    }
}

/// Keep only the final path component of a client-supplied filename.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        FALLBACK_FILENAME.to_string()
    } else {
        name.to_string()
    }
}
