mod config;
mod cost;
mod policy;
mod rules;

pub use config::{DebtPolicy, DEFAULT_GRACE_PERIOD_DAYS, DEFAULT_PRICE_PER_CREDIT};
pub use cost::{CostBreakdown, CostLine, PolicyViolation};
pub use policy::{DelinquencyReason, DelinquencyVerdict};

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};

use super::domain::{Enrollment, Program, Student, Term};
use super::lookup::{CostLookup, TermLookup};
use super::money::Money;
use cost::CostCalculator;
use policy::decide_verdict;
use rules::{classify, GraceWindow};

/// Everything the engine needs to know about one student, loaded by the caller.
///
/// `unpaid_enrollments` is expected to be pre-filtered; enrollments that still carry a payment
/// are ignored. `as_of` is the evaluation instant and its date is "today".
#[derive(Debug, Clone, Copy)]
pub struct DebtorSnapshot<'a> {
    pub student: &'a Student,
    pub program: Option<&'a Program>,
    pub unpaid_enrollments: &'a [Enrollment],
    pub active_term: Option<&'a Term>,
    pub as_of: NaiveDateTime,
}

impl<'a> DebtorSnapshot<'a> {
    pub fn today(&self) -> NaiveDate {
        self.as_of.date()
    }

    pub(crate) fn outstanding(&self) -> impl Iterator<Item = &'a Enrollment> {
        let enrollments: &'a [Enrollment] = self.unpaid_enrollments;
        enrollments.iter().filter(|enrollment| !enrollment.is_paid())
    }
}

/// Stateless evaluator for delinquency, total debt and overdue debt.
#[derive(Debug, Clone, Default)]
pub struct DebtEngine {
    policy: DebtPolicy,
}

impl DebtEngine {
    pub fn new(policy: DebtPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DebtPolicy {
        &self.policy
    }

    /// Delinquency decision with the rule that triggered it.
    pub fn assess<T>(&self, snapshot: &DebtorSnapshot<'_>, terms: &T) -> DelinquencyVerdict
    where
        T: TermLookup + ?Sized,
    {
        let grace_period_days = self.policy.grace_period_days(snapshot.program);
        decide_verdict(snapshot, grace_period_days, terms)
    }

    pub fn is_delinquent<T>(&self, snapshot: &DebtorSnapshot<'_>, terms: &T) -> bool
    where
        T: TermLookup + ?Sized,
    {
        self.assess(snapshot, terms).is_delinquent()
    }

    /// Whether a single enrollment counts towards overdue debt. Ignores payment agreements.
    pub fn is_overdue<T>(
        &self,
        snapshot: &DebtorSnapshot<'_>,
        enrollment: &Enrollment,
        terms: &T,
    ) -> bool
    where
        T: TermLookup + ?Sized,
    {
        match snapshot.active_term {
            Some(active_term) => {
                let window = GraceWindow::new(
                    active_term,
                    snapshot.as_of,
                    self.policy.grace_period_days(snapshot.program),
                );
                classify(enrollment, &window, terms).is_overdue()
            }
            None => true,
        }
    }

    /// Per-enrollment costs. Non-students and students without a program yield no lines.
    pub fn cost_breakdown<C>(
        &self,
        snapshot: &DebtorSnapshot<'_>,
        costs: &C,
    ) -> Result<CostBreakdown, PolicyViolation>
    where
        C: CostLookup + ?Sized,
    {
        let Some(calculator) = self.calculator(snapshot)? else {
            return Ok(CostBreakdown::default());
        };

        let mut breakdown = CostBreakdown::default();
        let mut running_total = Money::ZERO;
        for enrollment in snapshot.outstanding() {
            match costs.credits_for(enrollment) {
                Some(credits) => {
                    let line = calculator.line(enrollment, credits)?;
                    running_total = running_total
                        .checked_add(Money::new(line.net_cost))
                        .ok_or_else(|| PolicyViolation::AmountOverflow {
                            student: snapshot.student.id.clone(),
                        })?;
                    breakdown.lines.push(line);
                }
                None => {
                    tracing::warn!(
                        student = %snapshot.student.id,
                        enrollment = %enrollment.id,
                        "credit lookup missed; enrollment left out of debt"
                    );
                    breakdown.unresolved.push(enrollment.id.clone());
                }
            }
        }

        Ok(breakdown)
    }

    pub fn total_debt<C>(
        &self,
        snapshot: &DebtorSnapshot<'_>,
        costs: &C,
    ) -> Result<Money, PolicyViolation>
    where
        C: CostLookup + ?Sized,
    {
        Ok(self.cost_breakdown(snapshot, costs)?.total())
    }

    /// Debt past its deadline. Equals the total debt when no active term is known.
    pub fn overdue_debt<T, C>(
        &self,
        snapshot: &DebtorSnapshot<'_>,
        terms: &T,
        costs: &C,
    ) -> Result<Money, PolicyViolation>
    where
        T: TermLookup + ?Sized,
        C: CostLookup + ?Sized,
    {
        let breakdown = self.cost_breakdown(snapshot, costs)?;
        if snapshot.active_term.is_none() {
            tracing::debug!(student = %snapshot.student.id, "no active term; all debt is overdue");
            return Ok(breakdown.total());
        }

        let overdue: HashSet<_> = snapshot
            .outstanding()
            .filter(|enrollment| self.is_overdue(snapshot, enrollment, terms))
            .map(|enrollment| &enrollment.id)
            .collect();

        Ok(breakdown
            .lines
            .iter()
            .filter(|line| overdue.contains(&line.enrollment))
            .map(|line| Money::new(line.net_cost))
            .sum::<Money>()
            .rounded())
    }

    fn calculator(
        &self,
        snapshot: &DebtorSnapshot<'_>,
    ) -> Result<Option<CostCalculator>, PolicyViolation> {
        if !snapshot.student.role.is_student() {
            return Ok(None);
        }
        let Some(program) = snapshot.program else {
            return Ok(None);
        };
        CostCalculator::for_student(&self.policy, snapshot.student, program).map(Some)
    }
}
