use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::debt::{DebtEngine, DebtorSnapshot, PolicyViolation};
use super::domain::{EnrollmentId, SectionId, StudentId, TermCode};
use super::lookup::{CostLookup, TermLookup};
use super::money::Money;

/// Ledger of a student's unpaid enrollments as rendered on an account statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStatement {
    pub student: StudentId,
    pub student_name: String,
    pub as_of: NaiveDate,
    pub delinquent: bool,
    pub standing: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<AgreementStatus>,
    pub lines: Vec<StatementLine>,
    pub unresolved: Vec<EnrollmentId>,
    pub total_debt: Money,
    pub overdue_debt: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementStatus {
    pub expires_on: Option<NaiveDate>,
    pub document_number: Option<String>,
    pub in_force: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub enrollment: EnrollmentId,
    pub section: SectionId,
    pub term: Option<TermCode>,
    pub credits: u32,
    pub base_cost: Money,
    pub discount: Money,
    pub amount: Money,
    pub overdue: bool,
}

impl AccountStatement {
    pub fn build<T, C>(
        engine: &DebtEngine,
        snapshot: &DebtorSnapshot<'_>,
        terms: &T,
        costs: &C,
    ) -> Result<Self, PolicyViolation>
    where
        T: TermLookup + ?Sized,
        C: CostLookup + ?Sized,
    {
        let student = snapshot.student;
        let verdict = engine.assess(snapshot, terms);
        let breakdown = engine.cost_breakdown(snapshot, costs)?;

        let lines = snapshot
            .outstanding()
            .filter_map(|enrollment| {
                let line = breakdown.line(&enrollment.id)?;
                Some(StatementLine {
                    enrollment: line.enrollment.clone(),
                    section: line.section.clone(),
                    term: terms.term_for(enrollment).map(|term| term.code.clone()),
                    credits: line.credits,
                    base_cost: Money::new(line.base_cost).rounded(),
                    discount: Money::new(line.discount).rounded(),
                    amount: line.amount(),
                    overdue: engine.is_overdue(snapshot, enrollment, terms),
                })
            })
            .collect();

        let agreement = student.agreement.active.then(|| AgreementStatus {
            expires_on: student.agreement.expires_on,
            document_number: student.agreement.document_number.clone(),
            in_force: student.agreement.shields_on(snapshot.today()),
        });

        Ok(Self {
            student: student.id.clone(),
            student_name: student.name.clone(),
            as_of: snapshot.today(),
            delinquent: verdict.is_delinquent(),
            standing: verdict.summary(),
            agreement,
            lines,
            unresolved: breakdown.unresolved.clone(),
            total_debt: breakdown.total(),
            overdue_debt: engine.overdue_debt(snapshot, terms, costs)?,
        })
    }
}
