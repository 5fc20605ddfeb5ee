//! # Crucible Models
//!
//! Centralized LLM and swarm configuration types for the Crucible system.
//! The model invocation layer itself is an external capability ([`LlmClient`]);
//! these types only describe which provider/model an agent should be wired to.

use crate::agents::{AgentExecutionContext, AgentExecutionResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Supported LLM providers
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
    Gemini,
    OpenRouter,
}

impl LlmProvider {
    /// Get all available providers
    pub fn all() -> Vec<LlmProvider> {
        vec![
            LlmProvider::Anthropic,
            LlmProvider::OpenAI,
            LlmProvider::Gemini,
            LlmProvider::OpenRouter,
        ]
    }

    /// Display name for logs and reports
    pub fn display_name(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "Anthropic",
            LlmProvider::OpenAI => "OpenAI",
            LlmProvider::Gemini => "Gemini",
            LlmProvider::OpenRouter => "OpenRouter",
        }
    }

    /// Whether this provider supports custom base URL
    pub fn supports_base_url(&self) -> bool {
        matches!(self, LlmProvider::OpenAI)
    }
}

/// Configuration for LLM model selection
///
/// Carried by agent constructors so each variant can be pinned to a
/// provider/model pair. The actual invocation goes through [`LlmClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// LLM provider to use
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model name (e.g., "claude-sonnet-4-20250514", "gpt-4o")
    pub model: String,
    /// Optional base URL override for OpenAI-compatible APIs
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Anthropic,
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: None,
        }
    }
}

impl ModelConfig {
    /// Create a new model config with the default provider (Anthropic)
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Anthropic,
            model: model.into(),
            base_url: None,
        }
    }

    /// Create config for a specific provider
    pub fn with_provider(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            base_url: None,
        }
    }

    /// Set base URL (for OpenAI-compatible endpoints)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

/// Configuration for a swarm of same-stage agents
///
/// `max_pool_size` bounds how many agents of one stage run concurrently;
/// `stage_timeout_secs` cancels the stage's shared token when exceeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Maximum concurrent agents within one stage
    pub max_pool_size: usize,
    /// Stage-level timeout; `None` means no timeout
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            max_pool_size: 3,
            stage_timeout_secs: None,
        }
    }
}

/// Opaque model invocation capability
///
/// Prompt construction and token/cost accounting live behind this seam.
/// Implementations must honor the cancellation token at every await point.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate an execution result from a system prompt and the shared context
    async fn generate(
        &self,
        system_prompt: &str,
        context: &AgentExecutionContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<AgentExecutionResult>;
}
