//! Structured results returned by the idea-analysis service.
//!
//! Every optional section defaults when the model leaves it out, so a reply
//! only fails to parse when its core fields are missing.

use serde::{Deserialize, Serialize};

/// One modular sub-business of a deconstructed idea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessElement {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub monetization_potential: String,
}

impl BusinessElement {
    fn new(name: &str, kind: &str, description: &str, potential: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            description: description.to_string(),
            monetization_potential: potential.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingStep {
    pub step: String,
    pub amount: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapMilestone {
    pub milestone: String,
    pub timeline: String,
    pub description: String,
}

/// Result of breaking a business idea into its elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeconstructionResult {
    pub original_idea: String,
    pub cheapest_entry_point: String,
    #[serde(default)]
    pub estimated_cost: Option<String>,
    #[serde(default)]
    pub time_to_validate: Option<String>,
    pub elements: Vec<BusinessElement>,
    #[serde(default)]
    pub pivot_options: Vec<String>,
    #[serde(default)]
    pub sustainability_tip: String,
    #[serde(default)]
    pub gradual_funding_strategy: Vec<FundingStep>,
    #[serde(default)]
    pub brand_and_community_expansion_tips: Vec<String>,
    #[serde(default)]
    pub sustainability_roadmap: Vec<RoadmapMilestone>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub overall_score: Option<u32>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl DeconstructionResult {
    /// Deterministic result served when the model cannot be reached.
    pub fn fallback(idea: &str, currency: &str) -> Self {
        let step = |step: &str, amount: String, description: &str| FundingStep {
            step: step.to_string(),
            amount,
            description: description.to_string(),
        };
        let milestone = |milestone: &str, timeline: &str, description: &str| RoadmapMilestone {
            milestone: milestone.to_string(),
            timeline: timeline.to_string(),
            description: description.to_string(),
        };

        Self {
            original_idea: idea.to_string(),
            cheapest_entry_point: "Content (Start a blog/vlog about the process)".to_string(),
            estimated_cost: Some(format!("0 - 500 {currency}")),
            time_to_validate: Some("1-2 Weeks".to_string()),
            elements: vec![
                BusinessElement::new("Production", "Core", "Making the product", "High"),
                BusinessElement::new("Packaging", "Branding", "Designing the box", "Medium"),
                BusinessElement::new("Training", "Education", "Teaching others", "High"),
                BusinessElement::new("Resale", "Retail", "Selling kits", "Medium"),
                BusinessElement::new("Content", "Media", "YouTube channel", "High"),
                BusinessElement::new("Franchising", "Scale", "Licensing the model", "Very High"),
                BusinessElement::new("Servicing", "Support", "Repair and maintenance", "Medium"),
            ],
            pivot_options: vec![
                "Pivot to Teaching".to_string(),
                "Pivot to Supply Chain".to_string(),
            ],
            sustainability_tip: "Start small, reinvest profits from the cheapest entry point."
                .to_string(),
            gradual_funding_strategy: vec![
                step(
                    "Bootstrapping",
                    format!("0 - 500 {currency}"),
                    "Use personal savings to buy initial materials.",
                ),
                step(
                    "Pre-sales",
                    format!("500 - 2000 {currency}"),
                    "Sell to friends and family to fund the first batch.",
                ),
                step(
                    "Reinvestment",
                    format!("2000+ {currency}"),
                    "Reinvest profits into packaging and marketing.",
                ),
            ],
            brand_and_community_expansion_tips: vec![
                "Collaborate with local influencers.".to_string(),
                "Host a hands-on workshop.".to_string(),
                "Start a challenge on social media.".to_string(),
            ],
            sustainability_roadmap: vec![
                milestone("Eco-friendly Packaging", "Month 3", "Switch to biodegradable packaging."),
                milestone("Local Sourcing", "Month 6", "Source most inputs locally."),
                milestone("Zero Waste Production", "Year 1", "Reuse or recycle all waste."),
            ],
            currency: Some(currency.to_string()),
            overall_score: Some(85),
            project_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub action: String,
    pub priority: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotMilestone {
    pub name: String,
    pub due_weeks: u32,
    pub description: String,
}

/// Execution plan for a pivot opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotAnalysis {
    pub viability_score: u32,
    pub market_fit: String,
    pub market_fit_score: u32,
    #[serde(default)]
    pub recommended_actions: Vec<RecommendedAction>,
    #[serde(default)]
    pub required_resources: Vec<String>,
    #[serde(default)]
    pub estimated_timeline: String,
    #[serde(default)]
    pub estimated_investment: String,
    #[serde(default)]
    pub risk_level: String,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub milestones: Vec<PivotMilestone>,
}

impl PivotAnalysis {
    pub fn fallback(pivot_name: &str) -> Self {
        let action = |action: String, priority: &str| RecommendedAction {
            action,
            priority: priority.to_string(),
        };

        Self {
            viability_score: 85,
            market_fit: "Medium-High".to_string(),
            market_fit_score: 78,
            recommended_actions: vec![
                action(format!("Validate demand for {pivot_name}"), "High"),
                action("Build MVP".to_string(), "High"),
                action("Launch marketing campaign".to_string(), "Medium"),
            ],
            required_resources: vec![
                "Developer".to_string(),
                "Designer".to_string(),
                "$500 Ad Budget".to_string(),
            ],
            estimated_timeline: "12 weeks".to_string(),
            estimated_investment: "$5k".to_string(),
            risk_level: "Medium".to_string(),
            risk_factors: vec![
                "Competitor response".to_string(),
                "Market adoption".to_string(),
            ],
            milestones: vec![
                PivotMilestone {
                    name: "Validation".to_string(),
                    due_weeks: 2,
                    description: "Confirm market interest".to_string(),
                },
                PivotMilestone {
                    name: "Launch".to_string(),
                    due_weeks: 12,
                    description: "Release to public".to_string(),
                },
            ],
        }
    }
}

/// Weak-link diagnosis of a business under stress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub weak_link: String,
    pub weak_link_detail: String,
    pub root_cause: String,
    pub immediate_fix: String,
    pub strategic_adjustment: String,
    pub viability_score: u32,
}

impl Diagnosis {
    pub fn fallback() -> Self {
        Self {
            weak_link: "Sales & Marketing".to_string(),
            weak_link_detail: "The product is solid, but nobody hears about it.".to_string(),
            root_cause: "Lack of distribution channels".to_string(),
            immediate_fix: "Run a targeted outreach campaign to 100 prospects this week."
                .to_string(),
            strategic_adjustment: "Build in public to generate organic interest.".to_string(),
            viability_score: 65,
        }
    }
}
