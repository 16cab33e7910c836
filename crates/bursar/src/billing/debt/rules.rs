use chrono::{Duration, NaiveDateTime};

use super::super::domain::{Enrollment, Term};
use super::super::lookup::TermLookup;

/// Where an unpaid enrollment sits relative to the active term and its grace window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Standing<'t> {
    /// Belongs to a term that closed before the active one started.
    PriorTerm(&'t Term),
    /// Current-term enrollment registered before the grace deadline.
    PastGrace,
    /// Current-term enrollment still inside its grace window.
    WithinGrace,
    /// Term is known but is neither prior nor active (future or overlapping term).
    OtherTerm,
    Unresolved,
}

impl Standing<'_> {
    pub(crate) fn is_overdue(&self) -> bool {
        matches!(self, Standing::PriorTerm(_) | Standing::PastGrace)
    }
}

/// Active term plus the instant before which current-term enrollments are overdue.
///
/// A grace period reaching past the calendar's lower bound clamps the deadline to
/// `NaiveDateTime::MIN`, so nothing in the active term is past grace.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GraceWindow<'a> {
    pub active_term: &'a Term,
    pub deadline: NaiveDateTime,
}

impl<'a> GraceWindow<'a> {
    pub(crate) fn new(active_term: &'a Term, as_of: NaiveDateTime, grace_period_days: u32) -> Self {
        Self {
            active_term,
            deadline: as_of
                .checked_sub_signed(Duration::days(i64::from(grace_period_days)))
                .unwrap_or(NaiveDateTime::MIN),
        }
    }
}

pub(crate) fn classify<'t, T>(
    enrollment: &Enrollment,
    window: &GraceWindow<'_>,
    terms: &'t T,
) -> Standing<'t>
where
    T: TermLookup + ?Sized,
{
    let Some(term) = terms.term_for(enrollment) else {
        tracing::warn!(
            enrollment = %enrollment.id,
            section = %enrollment.section,
            "term lookup missed; enrollment skipped"
        );
        return Standing::Unresolved;
    };

    if term.ended_before(window.active_term) {
        return Standing::PriorTerm(term);
    }

    if term.code != window.active_term.code {
        return Standing::OtherTerm;
    }

    if enrollment.enrolled_at < window.deadline {
        Standing::PastGrace
    } else {
        Standing::WithinGrace
    }
}
