use serde::{Deserialize, Serialize};

/// Content of one selected repository file.
///
/// On the wire the path is carried as `file` (the shape the web client has
/// always used); `path` is accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the repository root.
    #[serde(rename = "file", alias = "path")]
    pub path: String,
    /// Full text content of the file.
    pub content: String,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}
