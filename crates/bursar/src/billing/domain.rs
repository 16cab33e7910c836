use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::Money;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Unique code of a degree program (e.g. `SIS`).
    ProgramCode
);
identifier!(
    /// Code of an academic term (e.g. `2025-1`).
    TermCode
);
identifier!(SectionId);
identifier!(StudentId);
identifier!(EnrollmentId);
identifier!(PaymentId);

/// Degree track a student belongs to. Carries the pricing and grace policy overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub code: ProgramCode,
    pub name: String,
    #[serde(default)]
    pub price_per_credit: Option<Decimal>,
    #[serde(default)]
    pub grace_period_days: Option<u32>,
    #[serde(default = "default_duration_semesters")]
    pub duration_semesters: u8,
}

fn default_duration_semesters() -> u8 {
    6
}

/// Academic period. Terms are ordered by their start date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub code: TermCode,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub active: bool,
}

impl Term {
    /// True when this term closed before `other` started.
    pub fn ended_before(&self, other: &Term) -> bool {
        self.end_date < other.start_date
    }
}

/// Course offering within one term. Credits come from the subject and are kept signed so
/// corrupted catalog rows surface as policy violations instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub subject_code: String,
    pub term: TermCode,
    pub credits: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Professor,
    Coordinator,
    Director,
    Treasurer,
    Administrative,
}

impl Role {
    pub fn is_student(self) -> bool {
        matches!(self, Role::Student)
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Professor => "Professor",
            Role::Coordinator => "Coordinator",
            Role::Director => "Director",
            Role::Treasurer => "Treasurer",
            Role::Administrative => "Administrative",
        }
    }
}

/// Manually granted waiver that suppresses the delinquency flag until it expires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAgreement {
    pub active: bool,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
    #[serde(default)]
    pub document_number: Option<String>,
}

impl PaymentAgreement {
    pub fn granted_until(expires_on: NaiveDate) -> Self {
        Self {
            active: true,
            expires_on: Some(expires_on),
            document_number: None,
        }
    }

    /// The agreement shields the student through its expiry date, inclusive.
    pub fn shields_on(&self, today: NaiveDate) -> bool {
        self.active && self.expires_on.is_some_and(|expires_on| expires_on >= today)
    }

    pub fn has_lapsed(&self, today: NaiveDate) -> bool {
        self.active && self.expires_on.is_some_and(|expires_on| expires_on < today)
    }
}

/// A user of the institution. Only `Role::Student` users can owe anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub program: Option<ProgramCode>,
    #[serde(default)]
    pub scholarship_recipient: bool,
    #[serde(default)]
    pub scholarship_percentage: i32,
    #[serde(default)]
    pub agreement: PaymentAgreement,
}

/// Registration of a student into a section. A linked payment means it is settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student: StudentId,
    pub section: SectionId,
    pub enrolled_at: NaiveDateTime,
    #[serde(default)]
    pub payment: Option<PaymentId>,
}

impl Enrollment {
    pub fn is_paid(&self) -> bool {
        self.payment.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Card,
}

impl PaymentMethod {
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Card => "card",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cash" | "efectivo" => Ok(Self::Cash),
            "transfer" | "transferencia" => Ok(Self::Transfer),
            "card" | "tarjeta" => Ok(Self::Card),
            other => Err(format!("unknown payment method '{other}'")),
        }
    }
}

/// Proof that one enrollment's cost was settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub enrollment: EnrollmentId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub receipt: String,
    pub paid_at: NaiveDateTime,
    #[serde(default)]
    pub processed_by: Option<String>,
}
