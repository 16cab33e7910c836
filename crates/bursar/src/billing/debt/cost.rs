use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::super::domain::{
    Enrollment, EnrollmentId, Program, ProgramCode, SectionId, Student, StudentId,
};
use super::super::money::Money;
use super::config::DebtPolicy;

/// Data-integrity failures that must abort a student's computation instead of producing a
/// plausible but wrong figure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("Invalid policy value: scholarship percentage {percentage} for student {student} is outside 0..=100")]
    ScholarshipPercentage { student: StudentId, percentage: i32 },
    #[error("Invalid policy value: enrollment {enrollment} carries negative credits ({credits})")]
    NegativeCredits {
        enrollment: EnrollmentId,
        credits: i32,
    },
    #[error("Invalid policy value: program {program} has negative price per credit ({price})")]
    NegativePricePerCredit { program: ProgramCode, price: Decimal },
    #[error("Invalid policy value: amounts billed to student {student} exceed the currency range")]
    AmountOverflow { student: StudentId },
}

/// Cost of one unpaid enrollment. `net_cost` keeps full precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    pub enrollment: EnrollmentId,
    pub section: SectionId,
    pub credits: u32,
    pub price_per_credit: Decimal,
    pub base_cost: Decimal,
    pub discount: Decimal,
    pub net_cost: Decimal,
}

impl CostLine {
    /// Cent-rounded amount, used to size a payment or print a ledger row.
    pub fn amount(&self) -> Money {
        Money::new(self.net_cost).rounded()
    }
}

/// Per-enrollment costs for a student along with the enrollments that could not be priced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub lines: Vec<CostLine>,
    pub unresolved: Vec<EnrollmentId>,
}

impl CostBreakdown {
    /// Sum of the unrounded line costs, rounded once. Breakdowns built by the engine are
    /// range-checked, so the sum cannot saturate.
    pub fn total(&self) -> Money {
        self.lines
            .iter()
            .map(|line| Money::new(line.net_cost))
            .sum::<Money>()
            .rounded()
    }

    pub fn line(&self, enrollment: &EnrollmentId) -> Option<&CostLine> {
        self.lines.iter().find(|line| &line.enrollment == enrollment)
    }
}

/// Pricing resolved once per student: program price and scholarship discount rate.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CostCalculator {
    price_per_credit: Decimal,
    discount_rate: Decimal,
}

impl CostCalculator {
    pub(crate) fn for_student(
        policy: &DebtPolicy,
        student: &Student,
        program: &Program,
    ) -> Result<Self, PolicyViolation> {
        let discount_rate = policy.scholarship_rate(student)?;

        let price_per_credit = policy.price_per_credit(program);
        if price_per_credit < Decimal::ZERO {
            return Err(PolicyViolation::NegativePricePerCredit {
                program: program.code.clone(),
                price: price_per_credit,
            });
        }

        Ok(Self {
            price_per_credit,
            discount_rate,
        })
    }

    pub(crate) fn line(
        &self,
        enrollment: &Enrollment,
        credits: i32,
    ) -> Result<CostLine, PolicyViolation> {
        let credits = u32::try_from(credits).map_err(|_| PolicyViolation::NegativeCredits {
            enrollment: enrollment.id.clone(),
            credits,
        })?;

        let overflow = || PolicyViolation::AmountOverflow {
            student: enrollment.student.clone(),
        };
        let base_cost = Decimal::from(credits)
            .checked_mul(self.price_per_credit)
            .ok_or_else(overflow)?;
        let discount = base_cost
            .checked_mul(self.discount_rate)
            .ok_or_else(overflow)?;

        Ok(CostLine {
            enrollment: enrollment.id.clone(),
            section: enrollment.section.clone(),
            credits,
            price_per_credit: self.price_per_credit,
            base_cost,
            discount,
            net_cost: base_cost - discount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::domain::{PaymentAgreement, Role};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn program(price: Decimal) -> Program {
        Program {
            code: ProgramCode("ENG".to_string()),
            name: "Engineering".to_string(),
            price_per_credit: Some(price),
            grace_period_days: None,
            duration_semesters: 10,
        }
    }

    fn student(recipient: bool, percentage: i32) -> Student {
        Student {
            id: StudentId("st-1".to_string()),
            name: "Ana Torres".to_string(),
            role: Role::Student,
            program: Some(ProgramCode("ENG".to_string())),
            scholarship_recipient: recipient,
            scholarship_percentage: percentage,
            agreement: PaymentAgreement::default(),
        }
    }

    fn enrollment() -> Enrollment {
        Enrollment {
            id: EnrollmentId("enr-1".to_string()),
            student: StudentId("st-1".to_string()),
            section: SectionId("sec-1".to_string()),
            enrolled_at: NaiveDate::from_ymd_opt(2025, 2, 1)
                .and_then(|date| date.and_hms_opt(9, 0, 0))
                .expect("valid timestamp"),
            payment: None,
        }
    }

    #[test]
    fn keeps_full_precision_on_discounted_lines() {
        let calculator = CostCalculator::for_student(
            &DebtPolicy::default(),
            &student(true, 33),
            &program(dec!(45.55)),
        )
        .expect("valid policy");
        let line = calculator.line(&enrollment(), 3).expect("line");

        assert_eq!(line.base_cost, dec!(136.65));
        assert_eq!(line.net_cost, dec!(91.5555));
        assert_eq!(line.amount().amount(), dec!(91.56));
    }

    #[test]
    fn ignores_percentage_without_recipient_flag() {
        let calculator = CostCalculator::for_student(
            &DebtPolicy::default(),
            &student(false, 40),
            &program(dec!(50)),
        )
        .expect("valid policy");
        let line = calculator.line(&enrollment(), 4).expect("line");
        assert_eq!(line.discount, Decimal::ZERO);
        assert_eq!(line.net_cost, dec!(200));
    }

    #[test]
    fn rejects_out_of_range_inputs() {
        let policy = DebtPolicy::default();
        assert!(matches!(
            CostCalculator::for_student(&policy, &student(true, -5), &program(dec!(50))),
            Err(PolicyViolation::ScholarshipPercentage { percentage: -5, .. })
        ));
        assert!(matches!(
            CostCalculator::for_student(&policy, &student(false, 0), &program(dec!(-1))),
            Err(PolicyViolation::NegativePricePerCredit { .. })
        ));

        let calculator =
            CostCalculator::for_student(&policy, &student(false, 0), &program(dec!(50)))
                .expect("valid policy");
        let err = calculator.line(&enrollment(), -2).expect_err("negative credits");
        assert!(err.to_string().starts_with("Invalid policy value"));
    }
}
