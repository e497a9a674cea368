use serde::Serialize;

/// Aggregate numbers shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub ideas_analyzed: usize,
    pub revenue_streams: usize,
    /// Mean overall score across projects, one decimal.
    pub success_rate: f64,
    pub active_projects: usize,
}

/// Current AI-generation usage against the plan ceiling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub plan: String,
    pub current_usage: u64,
    pub limit: u64,
    pub percentage: f64,
}

/// Cumulative project count at the end of a given UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowthPoint {
    pub date: String,
    pub count: usize,
}

/// Round to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
