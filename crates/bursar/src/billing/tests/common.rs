use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::billing::debt::{DebtEngine, DebtPolicy, DebtorSnapshot};
use crate::billing::domain::{
    Enrollment, EnrollmentId, PaymentAgreement, Program, ProgramCode, Role, SectionId, Student,
    StudentId, Term, TermCode,
};
use crate::billing::lookup::{CostLookup, TermLookup};

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn as_of() -> NaiveDateTime {
    date(2025, 3, 20).and_hms_opt(12, 0, 0).expect("valid time")
}

pub(super) fn prior_term() -> Term {
    Term {
        code: TermCode("2024-2".to_string()),
        start_date: date(2024, 8, 1),
        end_date: date(2024, 12, 15),
        active: false,
    }
}

pub(super) fn active_term() -> Term {
    Term {
        code: TermCode("2025-1".to_string()),
        start_date: date(2025, 2, 1),
        end_date: date(2025, 6, 30),
        active: true,
    }
}

pub(super) fn next_term() -> Term {
    Term {
        code: TermCode("2025-2".to_string()),
        start_date: date(2025, 8, 1),
        end_date: date(2025, 12, 15),
        active: false,
    }
}

pub(super) fn program(price_per_credit: Option<Decimal>) -> Program {
    Program {
        code: ProgramCode("SIS".to_string()),
        name: "Information Systems".to_string(),
        price_per_credit,
        grace_period_days: None,
        duration_semesters: 8,
    }
}

pub(super) fn student() -> Student {
    Student {
        id: StudentId("st-100".to_string()),
        name: "Lucia Mendez".to_string(),
        role: Role::Student,
        program: Some(ProgramCode("SIS".to_string())),
        scholarship_recipient: false,
        scholarship_percentage: 0,
        agreement: PaymentAgreement::default(),
    }
}

pub(super) fn enrollment(id: &str, section: &str, enrolled_at: NaiveDateTime) -> Enrollment {
    Enrollment {
        id: EnrollmentId(id.to_string()),
        student: StudentId("st-100".to_string()),
        section: SectionId(section.to_string()),
        enrolled_at,
        payment: None,
    }
}

pub(super) fn days_ago(days: i64) -> NaiveDateTime {
    as_of() - Duration::days(days)
}

/// Section-keyed term and credit maps standing in for a bulk-loaded read model.
#[derive(Default)]
pub(super) struct MemoryLookups {
    terms: HashMap<SectionId, Term>,
    credits: HashMap<SectionId, i32>,
}

impl MemoryLookups {
    pub(super) fn with_section(mut self, section: &str, term: Term, credits: i32) -> Self {
        let id = SectionId(section.to_string());
        self.terms.insert(id.clone(), term);
        self.credits.insert(id, credits);
        self
    }
}

impl TermLookup for MemoryLookups {
    fn term_for(&self, enrollment: &Enrollment) -> Option<&Term> {
        self.terms.get(&enrollment.section)
    }
}

impl CostLookup for MemoryLookups {
    fn credits_for(&self, enrollment: &Enrollment) -> Option<i32> {
        self.credits.get(&enrollment.section).copied()
    }
}

/// One student's inputs, owned so tests can tweak fields before borrowing a snapshot.
pub(super) struct Fixture {
    pub(super) student: Student,
    pub(super) program: Option<Program>,
    pub(super) active_term: Option<Term>,
    pub(super) enrollments: Vec<Enrollment>,
    pub(super) lookups: MemoryLookups,
    pub(super) as_of: NaiveDateTime,
}

impl Fixture {
    /// Student at 50.00 per credit with the standard prior, active and next terms registered.
    pub(super) fn standard() -> Self {
        let lookups = MemoryLookups::default()
            .with_section("prior-4", prior_term(), 4)
            .with_section("active-3", active_term(), 3)
            .with_section("active-2", active_term(), 2)
            .with_section("active-4", active_term(), 4)
            .with_section("next-3", next_term(), 3);

        Self {
            student: student(),
            program: Some(program(Some(dec!(50.00)))),
            active_term: Some(active_term()),
            enrollments: Vec::new(),
            lookups,
            as_of: as_of(),
        }
    }

    pub(super) fn enroll(mut self, id: &str, section: &str, enrolled_at: NaiveDateTime) -> Self {
        self.enrollments.push(enrollment(id, section, enrolled_at));
        self
    }

    pub(super) fn snapshot(&self) -> DebtorSnapshot<'_> {
        DebtorSnapshot {
            student: &self.student,
            program: self.program.as_ref(),
            unpaid_enrollments: &self.enrollments,
            active_term: self.active_term.as_ref(),
            as_of: self.as_of,
        }
    }
}

pub(super) fn engine() -> DebtEngine {
    DebtEngine::new(DebtPolicy::default())
}
