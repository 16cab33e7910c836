use chrono::Duration;
use rust_decimal_macros::dec;

use super::common::*;
use crate::billing::debt::{DelinquencyReason, DelinquencyVerdict};
use crate::billing::domain::{PaymentAgreement, PaymentId, Role};

#[test]
fn no_unpaid_enrollments_means_good_standing_and_no_debt() {
    let fixture = Fixture::standard();
    let engine = engine();
    let snapshot = fixture.snapshot();

    assert_eq!(
        engine.assess(&snapshot, &fixture.lookups),
        DelinquencyVerdict::InGoodStanding
    );
    let total = engine
        .total_debt(&snapshot, &fixture.lookups)
        .expect("valid policy");
    assert_eq!(total.to_string(), "0.00");
}

#[test]
fn agreement_in_force_shields_without_erasing_debt() {
    let mut fixture = Fixture::standard().enroll("e1", "prior-4", days_ago(120));
    let today = fixture.as_of.date();
    fixture.student.agreement = PaymentAgreement::granted_until(today);
    let engine = engine();
    let snapshot = fixture.snapshot();

    assert_eq!(
        engine.assess(&snapshot, &fixture.lookups),
        DelinquencyVerdict::Shielded {
            agreement_expires_on: today
        }
    );
    assert!(!engine.is_delinquent(&snapshot, &fixture.lookups));

    let total = engine
        .total_debt(&snapshot, &fixture.lookups)
        .expect("valid policy");
    let overdue = engine
        .overdue_debt(&snapshot, &fixture.lookups, &fixture.lookups)
        .expect("valid policy");
    assert_eq!(total.amount(), dec!(200.00));
    assert_eq!(overdue.amount(), dec!(200.00));
}

#[test]
fn expired_agreement_changes_nothing() {
    let mut fixture = Fixture::standard().enroll("e1", "active-3", days_ago(40));
    let engine = engine();
    let without_agreement = engine.assess(&fixture.snapshot(), &fixture.lookups);

    let yesterday = fixture.as_of.date() - Duration::days(1);
    fixture.student.agreement = PaymentAgreement::granted_until(yesterday);
    let with_expired = engine.assess(&fixture.snapshot(), &fixture.lookups);

    assert!(without_agreement.is_delinquent());
    assert_eq!(with_expired, without_agreement);
}

#[test]
fn active_agreement_without_expiry_does_not_shield() {
    let mut fixture = Fixture::standard().enroll("e1", "prior-4", days_ago(2));
    fixture.student.agreement = PaymentAgreement {
        active: true,
        expires_on: None,
        document_number: Some("CONV-2025-014".to_string()),
    };

    assert!(engine().is_delinquent(&fixture.snapshot(), &fixture.lookups));
}

#[test]
fn prior_term_debt_is_delinquent_even_inside_grace() {
    let fixture = Fixture::standard()
        .enroll("e-current", "active-3", days_ago(1))
        .enroll("e-prior", "prior-4", days_ago(1));

    match engine().assess(&fixture.snapshot(), &fixture.lookups) {
        DelinquencyVerdict::Delinquent(DelinquencyReason::PriorTermDebt { enrollment, term }) => {
            assert_eq!(enrollment.as_str(), "e-prior");
            assert_eq!(term.as_str(), "2024-2");
        }
        other => panic!("expected prior-term delinquency, got {other:?}"),
    }
}

#[test]
fn grace_boundary_is_strict() {
    let engine = engine();
    let grace = Duration::days(15);

    let past = Fixture::standard().enroll(
        "e1",
        "active-3",
        as_of() - grace - Duration::seconds(1),
    );
    assert!(engine.is_delinquent(&past.snapshot(), &past.lookups));

    let exact = Fixture::standard().enroll("e1", "active-3", as_of() - grace);
    assert!(!engine.is_delinquent(&exact.snapshot(), &exact.lookups));

    let inside = Fixture::standard().enroll(
        "e1",
        "active-3",
        as_of() - grace + Duration::milliseconds(1),
    );
    assert!(!engine.is_delinquent(&inside.snapshot(), &inside.lookups));
}

#[test]
fn program_grace_period_overrides_default() {
    let mut fixture = Fixture::standard().enroll("e1", "active-3", days_ago(20));
    assert!(engine().is_delinquent(&fixture.snapshot(), &fixture.lookups));

    if let Some(program) = fixture.program.as_mut() {
        program.grace_period_days = Some(30);
    }
    assert!(!engine().is_delinquent(&fixture.snapshot(), &fixture.lookups));
}

#[test]
fn missing_active_term_falls_back_to_any_unpaid() {
    let mut fixture = Fixture::standard().enroll("e1", "active-3", days_ago(1));
    fixture.active_term = None;
    let engine = engine();
    let snapshot = fixture.snapshot();

    assert_eq!(
        engine.assess(&snapshot, &fixture.lookups),
        DelinquencyVerdict::Delinquent(DelinquencyReason::NoActiveTerm {
            unpaid_enrollments: 1
        })
    );
    let total = engine
        .total_debt(&snapshot, &fixture.lookups)
        .expect("valid policy");
    let overdue = engine
        .overdue_debt(&snapshot, &fixture.lookups, &fixture.lookups)
        .expect("valid policy");
    assert_eq!(overdue, total);
    assert_eq!(total.amount(), dec!(150.00));
}

#[test]
fn non_students_are_never_delinquent() {
    let mut fixture = Fixture::standard().enroll("e1", "prior-4", days_ago(200));
    fixture.student.role = Role::Professor;
    let engine = engine();
    let snapshot = fixture.snapshot();

    assert_eq!(
        engine.assess(&snapshot, &fixture.lookups),
        DelinquencyVerdict::NotApplicable
    );
    assert!(engine
        .total_debt(&snapshot, &fixture.lookups)
        .expect("valid policy")
        .is_zero());
}

#[test]
fn unresolved_term_is_skipped() {
    let fixture = Fixture::standard()
        .enroll("e-ghost", "archived-section", days_ago(400))
        .enroll("e1", "active-3", days_ago(3));

    assert_eq!(
        engine().assess(&fixture.snapshot(), &fixture.lookups),
        DelinquencyVerdict::InGoodStanding
    );
}

#[test]
fn paid_enrollments_are_ignored_defensively() {
    let mut fixture = Fixture::standard().enroll("e1", "prior-4", days_ago(90));
    fixture.enrollments[0].payment = Some(PaymentId("pay-e1".to_string()));
    let engine = engine();
    let snapshot = fixture.snapshot();

    assert!(!engine.is_delinquent(&snapshot, &fixture.lookups));
    assert!(engine
        .total_debt(&snapshot, &fixture.lookups)
        .expect("valid policy")
        .is_zero());
}

#[test]
fn future_term_enrollment_is_neither_delinquent_nor_overdue() {
    let fixture = Fixture::standard().enroll("e1", "next-3", days_ago(60));
    let engine = engine();
    let snapshot = fixture.snapshot();

    assert!(!engine.is_delinquent(&snapshot, &fixture.lookups));
    assert!(engine
        .overdue_debt(&snapshot, &fixture.lookups, &fixture.lookups)
        .expect("valid policy")
        .is_zero());
}

#[test]
fn verdict_summary_names_the_rule() {
    let fixture = Fixture::standard().enroll("e1", "active-3", days_ago(16));
    let verdict = engine().assess(&fixture.snapshot(), &fixture.lookups);

    assert!(verdict.summary().contains("grace deadline 2025-03-05 12:00:00"));
}

#[test]
fn oversized_grace_period_leaves_current_term_in_good_standing() {
    let mut fixture = Fixture::standard().enroll("e1", "active-3", days_ago(400));
    if let Some(program) = fixture.program.as_mut() {
        program.grace_period_days = Some(200_000_000);
    }
    let engine = engine();
    let snapshot = fixture.snapshot();

    assert_eq!(
        engine.assess(&snapshot, &fixture.lookups),
        DelinquencyVerdict::InGoodStanding
    );
    assert!(!engine.is_overdue(&snapshot, &fixture.enrollments[0], &fixture.lookups));
    assert!(engine
        .overdue_debt(&snapshot, &fixture.lookups, &fixture.lookups)
        .expect("valid policy")
        .is_zero());
}

#[test]
fn oversized_grace_period_still_flags_prior_term_debt() {
    let mut fixture = Fixture::standard().enroll("e1", "prior-4", days_ago(150));
    if let Some(program) = fixture.program.as_mut() {
        program.grace_period_days = Some(u32::MAX);
    }

    assert!(engine().is_delinquent(&fixture.snapshot(), &fixture.lookups));
}
