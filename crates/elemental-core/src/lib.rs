//! # Elemental Core
//!
//! The domain layer of the Elemental backend.
//! Pure business logic: domain records, ports for external collaborators,
//! and the admission-control core that sits in front of every LLM call.

pub mod admission;
pub mod clock;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use admission::{AdmissionController, AdmissionTicket, UsageQuotaGate};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AdmissionError, DomainError, StoreError};
