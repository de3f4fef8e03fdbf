use crate::config::{BackendConfig, Provider};
use crate::prelude::*;
use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::{gemini, ollama};
use std::time::Duration;
use testgen_core::Error;

const SYSTEM_PREAMBLE: &str = "\
You are an AI test case generator working on source files from a code repository.
Follow the output format requested in each prompt exactly.
When asked for test code, output only the code, with no surrounding prose.";

/// Text in, text out.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Send one prompt and return the whole response text.
    async fn complete(&self, prompt: &str) -> Result<String, Error>;
}

enum Client {
    Gemini(gemini::Client),
    Ollama(ollama::Client),
}

/// Generation backend backed by a rig provider client.
pub struct RigBackend {
    client: Client,
    model: String,
    timeout: Duration,
}

impl RigBackend {
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let client = match config.provider {
            Provider::Gemini => {
                let api_key = config
                    .api_key
                    .clone()
                    .ok_or_eyre("Missing GEMINI_API_KEY")?;
                Client::Gemini(
                    gemini::Client::builder()
                        .api_key(api_key)
                        .build()
                        .map_err(|e| eyre!("Failed to create Gemini client: {}", e))?,
                )
            }
            Provider::Ollama => {
                use rig::client::Nothing;

                Client::Ollama(
                    ollama::Client::builder()
                        .api_key(Nothing)
                        .base_url(&config.ollama_url)
                        .build()
                        .map_err(|e| eyre!("Failed to create Ollama client: {}", e))?,
                )
            }
        };

        Ok(Self {
            client,
            model: config.model.clone(),
            timeout: config.timeout,
        })
    }

    async fn prompt(&self, prompt: &str) -> Result<String, rig::completion::PromptError> {
        match &self.client {
            Client::Gemini(client) => {
                client
                    .agent(&self.model)
                    .preamble(SYSTEM_PREAMBLE)
                    .build()
                    .prompt(prompt)
                    .await
            }
            Client::Ollama(client) => {
                client
                    .agent(&self.model)
                    .preamble(SYSTEM_PREAMBLE)
                    .build()
                    .prompt(prompt)
                    .await
            }
        }
    }
}

#[async_trait]
impl GenerationBackend for RigBackend {
    async fn complete(&self, prompt: &str) -> Result<String, Error> {
        log::debug!(
            "Sending prompt to {} ({} chars)",
            self.model,
            prompt.len()
        );

        let response = tokio::time::timeout(self.timeout, self.prompt(prompt))
            .await
            .map_err(|_| {
                Error::Backend(format!(
                    "{} did not answer within {}s",
                    self.model,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::Backend(format!("Model generation failed: {e}")))?;

        log::debug!("{} answered with {} chars", self.model, response.len());

        Ok(response)
    }
}
