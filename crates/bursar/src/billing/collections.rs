use std::io;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use super::debt::{DebtEngine, PolicyViolation};
use super::domain::StudentId;
use super::money::{Money, CURRENCY_SCALE};

/// Treasury view: what is owed across the institution and who owes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionReport {
    pub as_of: NaiveDate,
    pub projected_income: Money,
    pub collected_income: Money,
    /// Collected over projected, in percent.
    #[serde(with = "rust_decimal::serde::str")]
    pub collection_rate: Decimal,
    pub delinquent_students: usize,
    pub entries: Vec<CollectionEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub student: StudentId,
    pub name: String,
    pub delinquent: bool,
    pub total_debt: Money,
    pub overdue_debt: Money,
}

impl CollectionReport {
    /// Fails on the first student whose data violates pricing policy.
    pub fn build(
        engine: &DebtEngine,
        catalog: &Catalog,
        as_of: NaiveDateTime,
    ) -> Result<Self, PolicyViolation> {
        let mut projected_income = Money::ZERO;
        let mut entries = Vec::new();

        for student in catalog.students() {
            let Some(snapshot) = catalog.debtor(&student.id, as_of) else {
                continue;
            };

            let total_debt = engine.total_debt(&snapshot, catalog)?;
            if total_debt.is_zero() {
                continue;
            }
            projected_income = projected_income.checked_add(total_debt).ok_or_else(|| {
                PolicyViolation::AmountOverflow {
                    student: student.id.clone(),
                }
            })?;

            entries.push(CollectionEntry {
                student: student.id.clone(),
                name: student.name.clone(),
                delinquent: engine.is_delinquent(&snapshot, catalog),
                total_debt,
                overdue_debt: engine.overdue_debt(&snapshot, catalog, catalog)?,
            });
        }

        entries.sort_by(|left, right| {
            right
                .total_debt
                .cmp(&left.total_debt)
                .then_with(|| left.student.cmp(&right.student))
        });

        let collected_income = catalog
            .payments()
            .iter()
            .map(|payment| payment.amount)
            .sum::<Money>()
            .rounded();
        let projected_income = projected_income.rounded();
        let delinquent_students = entries.iter().filter(|entry| entry.delinquent).count();

        tracing::debug!(
            students = entries.len(),
            delinquent_students,
            %projected_income,
            %collected_income,
            "collection report built"
        );

        Ok(Self {
            as_of: as_of.date(),
            collection_rate: collection_rate(collected_income, projected_income),
            projected_income,
            collected_income,
            delinquent_students,
            entries,
        })
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        for entry in &self.entries {
            writer.serialize(CollectionRow {
                student_id: entry.student.as_str(),
                name: &entry.name,
                delinquent: entry.delinquent,
                total_debt: entry.total_debt.to_string(),
                overdue_debt: entry.overdue_debt.to_string(),
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct CollectionRow<'a> {
    student_id: &'a str,
    name: &'a str,
    delinquent: bool,
    total_debt: String,
    overdue_debt: String,
}

fn collection_rate(collected: Money, projected: Money) -> Decimal {
    if projected.is_zero() {
        return Decimal::ZERO;
    }
    collected
        .amount()
        .checked_div(projected.amount())
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .unwrap_or(Decimal::MAX)
        .round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
