//! Idea-analysis implementations.

use async_trait::async_trait;

use elemental_core::domain::{DeconstructionResult, Diagnosis, PivotAnalysis};
use elemental_core::ports::{AnalysisError, IdeaAnalyzer};

#[cfg(feature = "openrouter")]
mod openrouter;
#[cfg(feature = "openrouter")]
pub use openrouter::{OpenRouterAnalyzer, OpenRouterConfig};

/// Analyzer that always returns the deterministic fallback results.
///
/// Used when no provider is configured, and by tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackAnalyzer;

#[async_trait]
impl IdeaAnalyzer for FallbackAnalyzer {
    async fn deconstruct(
        &self,
        idea: &str,
        currency: &str,
    ) -> Result<DeconstructionResult, AnalysisError> {
        Ok(DeconstructionResult::fallback(idea, currency))
    }

    async fn analyze_pivot(
        &self,
        _original_idea: &str,
        pivot_name: &str,
        _currency: &str,
    ) -> Result<PivotAnalysis, AnalysisError> {
        Ok(PivotAnalysis::fallback(pivot_name))
    }

    async fn diagnose(
        &self,
        _idea: &str,
        _challenges: &str,
        _currency: &str,
    ) -> Result<Diagnosis, AnalysisError> {
        Ok(Diagnosis::fallback())
    }
}
