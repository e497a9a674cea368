//! OpenRouter chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use elemental_core::domain::{DeconstructionResult, Diagnosis, PivotAnalysis};
use elemental_core::ports::{AnalysisError, IdeaAnalyzer};

const MAX_BACKOFF: Duration = Duration::from_secs(60);
const MAX_ATTEMPTS_CEILING: u32 = 10;

#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// Without a key every call returns the fallback result.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub site_url: String,
    pub site_name: String,
    pub max_attempts: u32,
    /// Delay before retry `n` is `base_delay * 2^n`.
    pub base_delay: Duration,
    pub request_timeout: Duration,
    /// Serve the fallback result once retries are exhausted.
    pub fallback_on_exhaustion: bool,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemma-3-27b-it".to_string(),
            site_url: "http://localhost:3000".to_string(),
            site_name: "Elemental".to_string(),
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(60),
            fallback_on_exhaustion: true,
        }
    }
}

impl OpenRouterConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENROUTER_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: std::env::var("OPENROUTER_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("OPENROUTER_MODEL").unwrap_or(defaults.model),
            site_url: std::env::var("YOUR_SITE_URL").unwrap_or(defaults.site_url),
            site_name: std::env::var("YOUR_SITE_NAME").unwrap_or(defaults.site_name),
            max_attempts: std::env::var("OPENROUTER_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &u32| *n > 0)
                .map(|n| n.min(MAX_ATTEMPTS_CEILING))
                .unwrap_or(defaults.max_attempts),
            base_delay: defaults.base_delay,
            request_timeout: std::env::var("OPENROUTER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            fallback_on_exhaustion: std::env::var("ANALYSIS_FALLBACK_ON_FAILURE")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Idea analyzer backed by an OpenRouter-hosted model.
///
/// Each call is retried with exponential backoff. Once attempts run out the
/// deterministic fallback is returned, unless that is disabled.
pub struct OpenRouterAnalyzer {
    http: reqwest::Client,
    config: OpenRouterConfig,
}

impl OpenRouterAnalyzer {
    pub fn new(config: OpenRouterConfig) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        if config.api_key.is_none() {
            tracing::warn!("OPENROUTER_API_KEY not set, analysis will return fallback results");
        }

        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::new(OpenRouterConfig::from_env())
    }

    async fn complete_once<T: DeserializeOwned>(
        &self,
        api_key: &str,
        prompt: &str,
    ) -> Result<T, AnalysisError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response: ChatResponse = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.config.site_url)
            .header("X-Title", &self.config.site_name)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AnalysisError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AnalysisError::InvalidResponse("empty completion".to_string()))?;

        serde_json::from_str(strip_code_fence(&content))
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))
    }

    async fn complete<T: DeserializeOwned>(
        &self,
        api_key: &str,
        operation: &'static str,
        prompt: &str,
    ) -> Result<T, AnalysisError> {
        let mut last_error = String::new();
        for attempt in 0..self.config.max_attempts {
            match self.complete_once(api_key, prompt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "Analysis request failed"
                    );
                    last_error = e.to_string();
                }
            }
            if attempt + 1 < self.config.max_attempts {
                tokio::time::sleep(backoff_delay(self.config.base_delay, attempt)).await;
            }
        }

        tracing::error!(operation, "Max retries reached for analysis provider");
        Err(AnalysisError::Exhausted {
            attempts: self.config.max_attempts,
            last_error,
        })
    }

    /// Run one analysis, falling back per configuration.
    async fn analyze<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        prompt: String,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, AnalysisError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            tracing::warn!(operation, "No analysis API key, using fallback result");
            return Ok(fallback());
        };

        match self.complete(api_key, operation, &prompt).await {
            Ok(value) => Ok(value),
            Err(e) if self.config.fallback_on_exhaustion => {
                tracing::warn!(operation, error = %e, "Serving fallback analysis result");
                Ok(fallback())
            }
            Err(e) => Err(e),
        }
    }
}

/// `base * 2^attempt`, saturating at [`MAX_BACKOFF`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
}

/// Strip a surrounding Markdown code fence from a model reply.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

fn deconstruct_prompt(idea: &str, currency: &str) -> String {
    format!(
        "You are a business strategist. Deconstruct the business idea \"{idea}\" into exactly 7 \
         modular business elements, grounded in the local context of the country using {currency}. \
         Reply with raw JSON only, matching: {{\"original_idea\": string, \"cheapest_entry_point\": string, \
         \"estimated_cost\": string (in {currency}), \"time_to_validate\": string, \
         \"elements\": [{{\"name\": string, \"type\": string, \"description\": string, \
         \"monetization_potential\": \"High|Medium|Low\"}}], \"pivot_options\": [string], \
         \"sustainability_tip\": string, \"gradual_funding_strategy\": [{{\"step\": string, \
         \"amount\": string, \"description\": string}}], \"brand_and_community_expansion_tips\": [string], \
         \"sustainability_roadmap\": [{{\"milestone\": string, \"timeline\": string, \"description\": string}}], \
         \"currency\": \"{currency}\", \"overall_score\": integer 0-100}}"
    )
}

fn pivot_prompt(original_idea: &str, pivot_name: &str, currency: &str) -> String {
    format!(
        "You are a business strategist. The original idea is \"{original_idea}\" and the proposed \
         pivot is \"{pivot_name}\". Analyze it for the local context of the country using {currency}. \
         Reply with raw JSON only, matching: {{\"viability_score\": integer 0-100, \"market_fit\": string, \
         \"market_fit_score\": integer 0-100, \"recommended_actions\": [{{\"action\": string, \
         \"priority\": \"High|Medium|Low\"}}], \"required_resources\": [string], \
         \"estimated_timeline\": string, \"estimated_investment\": string (in {currency}), \
         \"risk_level\": \"Low|Medium|High\", \"risk_factors\": [string], \
         \"milestones\": [{{\"name\": string, \"due_weeks\": integer, \"description\": string}}]}}"
    )
}

fn diagnosis_prompt(idea: &str, challenges: &str, currency: &str) -> String {
    format!(
        "You are a business strategist. The business \"{idea}\" is struggling with: \"{challenges}\". \
         Identify the single weakest link for the local context of the country using {currency}. \
         Reply with raw JSON only, matching: {{\"weak_link\": string, \"weak_link_detail\": string, \
         \"root_cause\": string, \"immediate_fix\": string, \"strategic_adjustment\": string, \
         \"viability_score\": integer 0-100}}"
    )
}

#[async_trait]
impl IdeaAnalyzer for OpenRouterAnalyzer {
    async fn deconstruct(
        &self,
        idea: &str,
        currency: &str,
    ) -> Result<DeconstructionResult, AnalysisError> {
        self.analyze("deconstruct", deconstruct_prompt(idea, currency), || {
            DeconstructionResult::fallback(idea, currency)
        })
        .await
    }

    async fn analyze_pivot(
        &self,
        original_idea: &str,
        pivot_name: &str,
        currency: &str,
    ) -> Result<PivotAnalysis, AnalysisError> {
        self.analyze(
            "pivot",
            pivot_prompt(original_idea, pivot_name, currency),
            || PivotAnalysis::fallback(pivot_name),
        )
        .await
    }

    async fn diagnose(
        &self,
        idea: &str,
        challenges: &str,
        currency: &str,
    ) -> Result<Diagnosis, AnalysisError> {
        self.analyze(
            "diagnose",
            diagnosis_prompt(idea, challenges, currency),
            Diagnosis::fallback,
        )
        .await
    }
}
