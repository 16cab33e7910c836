use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::super::domain::{EnrollmentId, TermCode};
use super::super::lookup::TermLookup;
use super::rules::{classify, GraceWindow, Standing};
use super::DebtorSnapshot;

/// Delinquency decision together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelinquencyVerdict {
    /// A payment agreement in force waives the flag; the debt itself is untouched.
    Shielded { agreement_expires_on: NaiveDate },
    NotApplicable,
    InGoodStanding,
    Delinquent(DelinquencyReason),
}

impl DelinquencyVerdict {
    pub fn is_delinquent(&self) -> bool {
        matches!(self, DelinquencyVerdict::Delinquent(_))
    }

    pub fn summary(&self) -> String {
        match self {
            DelinquencyVerdict::Shielded {
                agreement_expires_on,
            } => format!("protected by payment agreement until {agreement_expires_on}"),
            DelinquencyVerdict::NotApplicable => "not subject to billing".to_string(),
            DelinquencyVerdict::InGoodStanding => "in good standing".to_string(),
            DelinquencyVerdict::Delinquent(reason) => reason.summary(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelinquencyReason {
    NoActiveTerm {
        unpaid_enrollments: usize,
    },
    PriorTermDebt {
        enrollment: EnrollmentId,
        term: TermCode,
    },
    GracePeriodElapsed {
        enrollment: EnrollmentId,
        grace_deadline: NaiveDateTime,
    },
}

impl DelinquencyReason {
    pub fn summary(&self) -> String {
        match self {
            DelinquencyReason::NoActiveTerm { unpaid_enrollments } => format!(
                "delinquent: {unpaid_enrollments} unpaid enrollment(s) and no active term"
            ),
            DelinquencyReason::PriorTermDebt { enrollment, term } => {
                format!("delinquent: enrollment {enrollment} from closed term {term} is unpaid")
            }
            DelinquencyReason::GracePeriodElapsed {
                enrollment,
                grace_deadline,
            } => format!(
                "delinquent: enrollment {enrollment} unpaid past grace deadline {}",
                grace_deadline.format("%Y-%m-%d %H:%M:%S")
            ),
        }
    }
}

pub(crate) fn decide_verdict<T>(
    snapshot: &DebtorSnapshot<'_>,
    grace_period_days: u32,
    terms: &T,
) -> DelinquencyVerdict
where
    T: TermLookup + ?Sized,
{
    let student = snapshot.student;

    if student.agreement.shields_on(snapshot.today()) {
        if let Some(agreement_expires_on) = student.agreement.expires_on {
            tracing::debug!(student = %student.id, %agreement_expires_on, "payment agreement in force");
            return DelinquencyVerdict::Shielded {
                agreement_expires_on,
            };
        }
    }

    if !student.role.is_student() {
        return DelinquencyVerdict::NotApplicable;
    }

    let outstanding: Vec<_> = snapshot.outstanding().collect();
    if outstanding.is_empty() {
        return DelinquencyVerdict::InGoodStanding;
    }

    let Some(active_term) = snapshot.active_term else {
        tracing::debug!(student = %student.id, "no active term; any unpaid enrollment is delinquent");
        return DelinquencyVerdict::Delinquent(DelinquencyReason::NoActiveTerm {
            unpaid_enrollments: outstanding.len(),
        });
    };

    let window = GraceWindow::new(active_term, snapshot.as_of, grace_period_days);
    let standings: Vec<_> = outstanding
        .iter()
        .map(|enrollment| (*enrollment, classify(enrollment, &window, terms)))
        .collect();

    for (enrollment, standing) in &standings {
        if let Standing::PriorTerm(term) = standing {
            return DelinquencyVerdict::Delinquent(DelinquencyReason::PriorTermDebt {
                enrollment: enrollment.id.clone(),
                term: term.code.clone(),
            });
        }
    }

    for (enrollment, standing) in &standings {
        if *standing == Standing::PastGrace {
            return DelinquencyVerdict::Delinquent(DelinquencyReason::GracePeriodElapsed {
                enrollment: enrollment.id.clone(),
                grace_deadline: window.deadline,
            });
        }
    }

    DelinquencyVerdict::InGoodStanding
}
