//! Admission control - the gate in front of every LLM-backed operation.
//!
//! Order per request: rate limiter, then the plan quota check and usage
//! charge as one atomic store step. A rejection at any step is terminal for
//! the request.

mod controller;
mod quota;

pub use controller::{AdmissionController, AdmissionTicket};
pub use quota::{
    QuotaCharge, QuotaDecision, QuotaFailurePolicy, USAGE_COUNT_FIELD, USAGE_DOC_ID, UsageQuotaGate,
    usage_path,
};
