use crate::prelude::*;
use std::time::Duration;
use testgen_core::ResolutionPolicy;

/// Repository coordinates and credentials, from flags or environment.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct GithubOptions {
    /// GitHub token (sent as `Authorization: token <value>`)
    #[arg(long = "github-token", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Repository owner
    #[arg(long, env = "OWNER")]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long, env = "REPO")]
    pub repo: Option<String>,

    /// Branch to read from
    #[arg(long, env = "BRANCH")]
    pub branch: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = GithubConfig::DEFAULT_API_URL)]
    pub api_url: String,

    /// Base URL for raw file contents
    #[arg(long, env = "GITHUB_RAW_URL", default_value = GithubConfig::DEFAULT_RAW_URL)]
    pub raw_url: String,
}

/// Validated GitHub configuration.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub token: Option<String>,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub api_url: String,
    pub raw_url: String,
}

impl GithubConfig {
    pub const DEFAULT_API_URL: &'static str = "https://api.github.com";
    pub const DEFAULT_RAW_URL: &'static str = "https://raw.githubusercontent.com";
}

impl GithubOptions {
    /// Fails when owner, repo, or branch is missing. An absent token is
    /// allowed (public repositories).
    pub fn into_config(self) -> Result<GithubConfig> {
        let (Some(owner), Some(repo), Some(branch)) = (
            non_blank(self.owner),
            non_blank(self.repo),
            non_blank(self.branch),
        ) else {
            return Err(eyre!(
                "Missing owner, repo, or branch (set OWNER, REPO and BRANCH or pass --owner/--repo/--branch)"
            ));
        };

        let token = non_blank(self.token);
        if token.is_none() {
            log::warn!("No GitHub token configured, requests are unauthenticated");
        }

        Ok(GithubConfig {
            token,
            owner,
            repo,
            branch,
            api_url: self.api_url,
            raw_url: self.raw_url,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Provider {
    #[default]
    Gemini,
    Ollama,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-1.5-flash",
            Provider::Ollama => "llama3.1",
        }
    }
}

/// Generation backend selection, from flags or environment.
#[derive(Debug, Clone, clap::Args)]
pub struct BackendOptions {
    /// Model provider
    #[arg(long, env = "TESTGEN_PROVIDER", value_enum, default_value = "gemini")]
    pub provider: Provider,

    /// Model name (defaults to a provider specific model)
    #[arg(long, env = "TESTGEN_MODEL")]
    pub model: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Ollama base URL
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    /// Seconds to wait for a single model response
    #[arg(long, env = "TESTGEN_TIMEOUT", default_value = "120")]
    pub timeout: u64,

    /// How overlapping code requests for one summary are settled
    /// (last-resolved or latest-issued)
    #[arg(long, env = "TESTGEN_RESOLUTION", default_value = "last-resolved")]
    pub resolution: ResolutionPolicy,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            gemini_api_key: None,
            ollama_url: "http://localhost:11434".to_string(),
            timeout: 120,
            resolution: ResolutionPolicy::default(),
        }
    }
}

/// Validated backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key: Option<String>,
    pub ollama_url: String,
    pub timeout: Duration,
    pub resolution: ResolutionPolicy,
}

impl BackendOptions {
    pub fn into_config(self) -> Result<BackendConfig> {
        let api_key = non_blank(self.gemini_api_key);

        if self.provider == Provider::Gemini && api_key.is_none() {
            return Err(eyre!("Missing GEMINI_API_KEY (or pass --gemini-api-key)"));
        }

        if self.timeout == 0 {
            return Err(eyre!("--timeout must be greater than zero"));
        }

        Ok(BackendConfig {
            provider: self.provider,
            model: non_blank(self.model)
                .unwrap_or_else(|| self.provider.default_model().to_string()),
            api_key,
            ollama_url: self.ollama_url,
            timeout: Duration::from_secs(self.timeout),
            resolution: self.resolution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github() -> GithubOptions {
        GithubOptions {
            token: Some("t0ken".to_string()),
            owner: Some("octo".to_string()),
            repo: Some("hello".to_string()),
            branch: Some("main".to_string()),
            api_url: GithubConfig::DEFAULT_API_URL.to_string(),
            raw_url: GithubConfig::DEFAULT_RAW_URL.to_string(),
        }
    }

    #[test]
    fn test_github_config_complete() {
        let config = github().into_config().unwrap();
        assert_eq!(config.owner, "octo");
        assert_eq!(config.token.as_deref(), Some("t0ken"));
    }

    #[test]
    fn test_github_config_requires_coordinates() {
        for options in [
            GithubOptions {
                owner: None,
                ..github()
            },
            GithubOptions {
                repo: Some("  ".to_string()),
                ..github()
            },
            GithubOptions {
                branch: None,
                ..github()
            },
        ] {
            let err = options.into_config().unwrap_err();
            assert!(err.to_string().contains("Missing owner, repo, or branch"));
        }
    }

    #[test]
    fn test_github_token_optional() {
        let config = GithubOptions {
            token: None,
            ..github()
        }
        .into_config()
        .unwrap();
        assert!(config.token.is_none());
    }

    #[test]
    fn test_blank_github_token_is_unauthenticated() {
        let config = GithubOptions {
            token: Some("   ".to_string()),
            ..github()
        }
        .into_config()
        .unwrap();
        assert!(config.token.is_none());
    }

    #[test]
    fn test_gemini_requires_key() {
        let err = BackendOptions::default().into_config().unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_model_defaults_per_provider() {
        let gemini = BackendOptions {
            gemini_api_key: Some("k".to_string()),
            ..BackendOptions::default()
        }
        .into_config()
        .unwrap();
        assert_eq!(gemini.model, "gemini-1.5-flash");

        let ollama = BackendOptions {
            provider: Provider::Ollama,
            ..BackendOptions::default()
        }
        .into_config()
        .unwrap();
        assert_eq!(ollama.model, "llama3.1");
        assert!(ollama.api_key.is_none());

        let custom = BackendOptions {
            provider: Provider::Ollama,
            model: Some("qwen2.5-coder".to_string()),
            ..BackendOptions::default()
        }
        .into_config()
        .unwrap();
        assert_eq!(custom.model, "qwen2.5-coder");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = BackendOptions {
            provider: Provider::Ollama,
            timeout: 0,
            ..BackendOptions::default()
        }
        .into_config()
        .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
