use super::domain::{Enrollment, Term};

/// Resolves the term an enrollment's section belongs to.
///
/// Implementations are expected to be pre-loaded in bulk; the debt engine calls them once per
/// enrollment and treats `None` as an unresolved reference to skip.
pub trait TermLookup {
    fn term_for(&self, enrollment: &Enrollment) -> Option<&Term>;
}

/// Resolves the credit count of the course behind an enrollment.
pub trait CostLookup {
    fn credits_for(&self, enrollment: &Enrollment) -> Option<i32>;
}

impl<T: TermLookup + ?Sized> TermLookup for &T {
    fn term_for(&self, enrollment: &Enrollment) -> Option<&Term> {
        (**self).term_for(enrollment)
    }
}

impl<T: CostLookup + ?Sized> CostLookup for &T {
    fn credits_for(&self, enrollment: &Enrollment) -> Option<i32> {
        (**self).credits_for(enrollment)
    }
}
