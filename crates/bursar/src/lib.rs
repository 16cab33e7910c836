//! Delinquency and debt engine for university enrollment billing.
//!
//! The [`billing::DebtEngine`] decides whether a student is delinquent and how much they owe,
//! in total and overdue. Everything it needs is handed in by the caller: the student, the
//! unpaid enrollments, the active term and read accessors for term and credit lookups. The
//! surrounding modules build on it for payment registration, account statements and the
//! treasury collection report.

pub mod billing;
pub mod config;
pub mod error;
pub mod telemetry;
