//! Domain entities - the core business objects.

mod alert;
mod analysis;
mod dashboard;
mod document;
mod pivot;
mod plan;
mod project;
mod user;

pub use alert::{Alert, AlertKind, NewAlert};
pub use analysis::{
    BusinessElement, DeconstructionResult, Diagnosis, FundingStep, PivotAnalysis,
    PivotMilestone, RecommendedAction, RoadmapMilestone,
};
pub(crate) use dashboard::round1;
pub use dashboard::{DashboardStats, GrowthPoint, UsageStats};
pub use document::{Collection, DocPath, Document, Fields};
pub use pivot::{Pivot, PivotStatus};
pub use plan::{Plan, PlanLimits, UnknownPlan};
pub use project::{Project, ProjectStatus, RevenueStream, strength_from_potential};
pub use user::UserProfile;
