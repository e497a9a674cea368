//! Idea-analysis service port.

use async_trait::async_trait;

use crate::domain::{DeconstructionResult, Diagnosis, PivotAnalysis};

/// LLM-backed analysis of business ideas.
///
/// Implementations own their retry policy; callers never retry.
#[async_trait]
pub trait IdeaAnalyzer: Send + Sync {
    async fn deconstruct(
        &self,
        idea: &str,
        currency: &str,
    ) -> Result<DeconstructionResult, AnalysisError>;

    async fn analyze_pivot(
        &self,
        original_idea: &str,
        pivot_name: &str,
        currency: &str,
    ) -> Result<PivotAnalysis, AnalysisError>;

    async fn diagnose(
        &self,
        idea: &str,
        challenges: &str,
        currency: &str,
    ) -> Result<Diagnosis, AnalysisError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Provider request failed: {0}")]
    Request(String),

    #[error("Provider returned an unusable reply: {0}")]
    InvalidResponse(String),

    #[error("Gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}
