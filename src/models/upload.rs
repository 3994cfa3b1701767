use bytes::Bytes;

/// A file received on `POST /parse`, fully buffered in memory.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Filename declared by the client, unsanitised.
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }
}
