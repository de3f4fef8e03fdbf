//! Request and response bodies of the HTTP server.

use serde::{Deserialize, Serialize};

use crate::files::FileRecord;
use crate::state::{CodeGenerationState, StoreSnapshot};
use crate::summary::SummaryItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContentsRequest {
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSummariesRequest {
    #[serde(default)]
    pub files: Vec<FileRecord>,
}

/// Raw summary text, unparsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSummariesResponse {
    pub summaries: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummariesResponse {
    pub summaries: Vec<SummaryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateCodeRequest {
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeResponse {
    pub code: String,
}

/// Body of a code request against the stateful session. Without a summary
/// the live item's text is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestCodeBody {
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeStateResponse {
    pub index: usize,
    #[serde(flatten)]
    pub state: CodeGenerationState,
}

pub type SessionResponse = StoreSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
