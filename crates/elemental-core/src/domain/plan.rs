use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Billing tier determining the AI generation ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Starter,
    Pro,
    Empire,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Starter => "starter",
            Plan::Pro => "pro",
            Plan::Empire => "empire",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown plan: {0}")]
pub struct UnknownPlan(pub String);

impl FromStr for Plan {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starter" => Ok(Plan::Starter),
            "pro" => Ok(Plan::Pro),
            "empire" => Ok(Plan::Empire),
            _ => Err(UnknownPlan(s.to_string())),
        }
    }
}

/// Per-plan generation ceilings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLimits {
    pub starter: u64,
    pub pro: u64,
    pub empire: u64,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            starter: 10,
            pro: 150,
            empire: 999_999,
        }
    }
}

impl PlanLimits {
    pub fn limit(&self, plan: Plan) -> u64 {
        match plan {
            Plan::Starter => self.starter,
            Plan::Pro => self.pro,
            Plan::Empire => self.empire,
        }
    }

    /// Limit for a raw plan name as stored on the user profile.
    ///
    /// Unset or unrecognized plans get the starter ceiling.
    pub fn limit_for_name(&self, plan: Option<&str>) -> u64 {
        plan.and_then(|p| p.parse::<Plan>().ok())
            .map(|p| self.limit(p))
            .unwrap_or(self.starter)
    }
}
