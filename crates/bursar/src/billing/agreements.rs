use chrono::NaiveDate;

use super::domain::{Student, StudentId};

/// Deactivates payment agreements whose expiry date is before `today`.
///
/// Evaluation never does this on its own; run it as a scheduled maintenance step. Expiry date
/// and document number are kept for the record. Returns the affected students.
pub fn expire_lapsed_agreements(students: &mut [Student], today: NaiveDate) -> Vec<StudentId> {
    let mut expired = Vec::new();
    for student in students.iter_mut() {
        if student.agreement.has_lapsed(today) {
            student.agreement.active = false;
            tracing::info!(
                student = %student.id,
                expired_on = ?student.agreement.expires_on,
                "payment agreement expired"
            );
            expired.push(student.id.clone());
        }
    }
    expired
}
