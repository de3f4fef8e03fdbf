//! In-process stand-ins for the GitHub and model collaborators.

use crate::backend::GenerationBackend;
use crate::github::ContentAggregator;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use testgen_core::{Error, FileRecord};
use tokio::sync::oneshot;

/// Answers prompts from a queue of canned responses and records every prompt.
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String, Error>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(responses: impl IntoIterator<Item = Result<String, Error>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn complete(&self, prompt: &str) -> Result<String, Error> {
        self.prompts.lock().push(prompt.to_string());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Backend("no scripted response left".to_string())))
    }
}

/// Holds every call until the test releases the gate whose marker appears in
/// the prompt, so tests decide the order in which responses arrive.
#[derive(Default)]
pub struct GatedBackend {
    gates: Mutex<HashMap<String, oneshot::Receiver<Result<String, Error>>>>,
}

impl GatedBackend {
    /// Register a gate for prompts containing `marker`.
    pub fn gate(&self, marker: &str) -> oneshot::Sender<Result<String, Error>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(marker.to_string(), rx);
        tx
    }
}

#[async_trait]
impl GenerationBackend for GatedBackend {
    async fn complete(&self, prompt: &str) -> Result<String, Error> {
        let gate = {
            let mut gates = self.gates.lock();
            let marker = gates.keys().find(|m| prompt.contains(m.as_str())).cloned();
            marker.and_then(|m| gates.remove(&m))
        };

        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(Error::Backend("gate dropped".to_string()))),
            None => Err(Error::Backend("no gate for prompt".to_string())),
        }
    }
}

/// Serves files from memory.
#[derive(Default)]
pub struct MemoryAggregator {
    files: Vec<FileRecord>,
}

impl MemoryAggregator {
    pub fn new(files: Vec<FileRecord>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl ContentAggregator for MemoryAggregator {
    async fn list_files(&self) -> Result<Vec<String>, Error> {
        Ok(self.files.iter().map(|f| f.path.clone()).collect())
    }

    async fn fetch_contents(&self, paths: &[String]) -> Result<Vec<FileRecord>, Error> {
        if paths.is_empty() {
            return Err(Error::invalid_input("No files provided"));
        }

        paths
            .iter()
            .map(|path| {
                self.files
                    .iter()
                    .find(|f| &f.path == path)
                    .cloned()
                    .ok_or_else(|| Error::Fetch(format!("{path}: not found")))
            })
            .collect()
    }
}
