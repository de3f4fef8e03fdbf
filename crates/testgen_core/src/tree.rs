use serde::{Deserialize, Serialize};

/// Recursive git tree response from the GitHub API.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GitTree {
    pub tree: Vec<GitTreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

/// Single entry of a git tree.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GitTreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
}

/// Keep only file (`blob`) entries, in the order the API returned them.
pub fn blob_paths(tree: GitTree) -> Vec<String> {
    tree.tree
        .into_iter()
        .filter(|entry| entry.entry_type == "blob")
        .map(|entry| entry.path)
        .collect()
}

/// Join a repository path onto a raw content base URL, percent-encoding
/// each path segment.
pub fn raw_content_url(
    base_url: &str,
    owner: &str,
    repo: &str,
    branch: &str,
    path: &str,
) -> String {
    let encoded = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    format!(
        "{}/{owner}/{repo}/{branch}/{encoded}",
        base_url.trim_end_matches('/')
    )
}
