//! Student billing: the debt engine and the flows that consume it.
//!
//! [`DebtEngine`] is the single place where delinquency, total debt and overdue debt are
//! computed. Payment registration, account statements and the collection report delegate to it
//! rather than re-deriving costs.

pub mod agreements;
pub mod catalog;
pub mod collections;
pub mod debt;
pub mod domain;
pub mod lookup;
pub mod money;
pub mod payments;
pub mod statement;

#[cfg(test)]
mod tests;

pub use agreements::expire_lapsed_agreements;
pub use catalog::{Catalog, CatalogError, CatalogSnapshot};
pub use collections::{CollectionEntry, CollectionReport};
pub use debt::{
    CostBreakdown, CostLine, DebtEngine, DebtPolicy, DebtorSnapshot, DelinquencyReason,
    DelinquencyVerdict, PolicyViolation,
};
pub use domain::{
    Enrollment, EnrollmentId, Payment, PaymentAgreement, PaymentId, PaymentMethod, Program,
    ProgramCode, Role, Section, SectionId, Student, StudentId, Term, TermCode,
};
pub use lookup::{CostLookup, TermLookup};
pub use money::Money;
pub use payments::{
    InMemoryPaymentRegistry, PaymentDesk, PaymentError, PaymentReceipt, PaymentRegistry,
    PaymentRequest, RegistryError,
};
pub use statement::{AccountStatement, AgreementStatus, StatementLine};
