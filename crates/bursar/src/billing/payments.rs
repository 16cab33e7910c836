use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::debt::{DebtEngine, DebtorSnapshot, PolicyViolation};
use super::domain::{EnrollmentId, Payment, PaymentId, PaymentMethod, StudentId};
use super::lookup::CostLookup;
use super::money::Money;

/// Storage seam for payments. `record` must reject a second payment for the same enrollment
/// atomically: check, create and link happen under one boundary.
pub trait PaymentRegistry: Send + Sync {
    fn record(&self, payment: Payment) -> Result<Payment, RegistryError>;
    /// Records a batch all-or-nothing. Any conflict leaves the registry untouched.
    fn record_all(&self, payments: Vec<Payment>) -> Result<Vec<Payment>, RegistryError>;
    fn payment_for(&self, enrollment: &EnrollmentId) -> Result<Option<Payment>, RegistryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("enrollment {0} already has a payment")]
    AlreadyPaid(EnrollmentId),
    #[error("payment registry unavailable: {0}")]
    Unavailable(String),
}

/// Mutex-guarded registry keyed by enrollment.
#[derive(Debug, Default)]
pub struct InMemoryPaymentRegistry {
    payments: Mutex<HashMap<EnrollmentId, Payment>>,
}

impl InMemoryPaymentRegistry {
    pub fn with_payments<I>(payments: I) -> Self
    where
        I: IntoIterator<Item = Payment>,
    {
        let payments = payments
            .into_iter()
            .map(|payment| (payment.enrollment.clone(), payment))
            .collect();
        Self {
            payments: Mutex::new(payments),
        }
    }

    pub fn payments(&self) -> Vec<Payment> {
        let guard = match self.payments.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut payments: Vec<_> = guard.values().cloned().collect();
        payments.sort_by(|left, right| left.id.cmp(&right.id));
        payments
    }
}

impl PaymentRegistry for InMemoryPaymentRegistry {
    fn record(&self, payment: Payment) -> Result<Payment, RegistryError> {
        let mut guard = self
            .payments
            .lock()
            .map_err(|_| RegistryError::Unavailable("registry mutex poisoned".to_string()))?;

        match guard.entry(payment.enrollment.clone()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyPaid(payment.enrollment)),
            Entry::Vacant(slot) => {
                slot.insert(payment.clone());
                Ok(payment)
            }
        }
    }

    fn record_all(&self, payments: Vec<Payment>) -> Result<Vec<Payment>, RegistryError> {
        let mut guard = self
            .payments
            .lock()
            .map_err(|_| RegistryError::Unavailable("registry mutex poisoned".to_string()))?;

        let mut batch = HashSet::with_capacity(payments.len());
        for payment in &payments {
            if guard.contains_key(&payment.enrollment) || !batch.insert(&payment.enrollment) {
                return Err(RegistryError::AlreadyPaid(payment.enrollment.clone()));
            }
        }

        for payment in &payments {
            guard.insert(payment.enrollment.clone(), payment.clone());
        }
        Ok(payments)
    }

    fn payment_for(&self, enrollment: &EnrollmentId) -> Result<Option<Payment>, RegistryError> {
        let guard = self
            .payments
            .lock()
            .map_err(|_| RegistryError::Unavailable("registry mutex poisoned".to_string()))?;
        Ok(guard.get(enrollment).cloned())
    }
}

/// Details supplied by the treasurer registering a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub receipt: Option<String>,
    pub processed_by: Option<String>,
    pub paid_at: NaiveDateTime,
}

/// Outcome of settling a student's unpaid enrollments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub student: StudentId,
    pub payments: Vec<Payment>,
    pub skipped: Vec<EnrollmentId>,
    pub total: Money,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("{0} is not a student and cannot be billed")]
    NotAStudent(StudentId),
    #[error("student {0} has no program to price enrollments")]
    MissingProgram(StudentId),
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Settles every unpaid enrollment of a student with one payment each, sized by the engine.
pub struct PaymentDesk<R> {
    engine: Arc<DebtEngine>,
    registry: Arc<R>,
}

impl<R> PaymentDesk<R>
where
    R: PaymentRegistry,
{
    pub fn new(engine: Arc<DebtEngine>, registry: Arc<R>) -> Self {
        Self { engine, registry }
    }

    pub fn register<C>(
        &self,
        snapshot: &DebtorSnapshot<'_>,
        costs: &C,
        request: &PaymentRequest,
    ) -> Result<PaymentReceipt, PaymentError>
    where
        C: CostLookup + ?Sized,
    {
        let student = snapshot.student;
        if !student.role.is_student() {
            return Err(PaymentError::NotAStudent(student.id.clone()));
        }
        if snapshot.program.is_none() {
            return Err(PaymentError::MissingProgram(student.id.clone()));
        }

        let breakdown = self.engine.cost_breakdown(snapshot, costs)?;
        let receipt = request.receipt.clone().unwrap_or_else(|| {
            format!("PAY-{}", request.paid_at.format("%Y%m%d%H%M%S"))
        });

        let batch = breakdown
            .lines
            .iter()
            .map(|line| Payment {
                id: PaymentId(format!("pay-{}", line.enrollment)),
                enrollment: line.enrollment.clone(),
                amount: line.amount(),
                method: request.method,
                receipt: receipt.clone(),
                paid_at: request.paid_at,
                processed_by: request.processed_by.clone(),
            })
            .collect();
        let payments = self.registry.record_all(batch)?;

        for payment in &payments {
            tracing::info!(
                student = %student.id,
                enrollment = %payment.enrollment,
                amount = %payment.amount,
                method = payment.method.label(),
                "payment registered"
            );
        }

        let total = payments.iter().map(|payment| payment.amount).sum::<Money>().rounded();

        Ok(PaymentReceipt {
            student: student.id.clone(),
            payments,
            skipped: breakdown.unresolved,
            total,
        })
    }
}
