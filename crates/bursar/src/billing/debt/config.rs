use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::super::domain::{Program, Student};
use super::cost::PolicyViolation;

pub const DEFAULT_GRACE_PERIOD_DAYS: u32 = 15;
pub const DEFAULT_PRICE_PER_CREDIT: Decimal = dec!(50.00);

/// Institution-wide defaults used when a program does not override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtPolicy {
    pub default_grace_period_days: u32,
    pub default_price_per_credit: Decimal,
}

impl Default for DebtPolicy {
    fn default() -> Self {
        Self {
            default_grace_period_days: DEFAULT_GRACE_PERIOD_DAYS,
            default_price_per_credit: DEFAULT_PRICE_PER_CREDIT,
        }
    }
}

impl DebtPolicy {
    pub fn grace_period_days(&self, program: Option<&Program>) -> u32 {
        program
            .and_then(|program| program.grace_period_days)
            .unwrap_or(self.default_grace_period_days)
    }

    pub fn price_per_credit(&self, program: &Program) -> Decimal {
        program
            .price_per_credit
            .unwrap_or(self.default_price_per_credit)
    }

    /// Fraction of the base cost waived for a scholarship recipient. The percentage is
    /// validated even when the recipient flag is off.
    pub fn scholarship_rate(&self, student: &Student) -> Result<Decimal, PolicyViolation> {
        let percentage = student.scholarship_percentage;
        if !(0..=100).contains(&percentage) {
            return Err(PolicyViolation::ScholarshipPercentage {
                student: student.id.clone(),
                percentage,
            });
        }

        if student.scholarship_recipient && percentage > 0 {
            Ok(Decimal::from(percentage) / dec!(100))
        } else {
            Ok(Decimal::ZERO)
        }
    }
}
