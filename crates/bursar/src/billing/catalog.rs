use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::debt::DebtorSnapshot;
use super::domain::{
    Enrollment, EnrollmentId, Payment, Program, ProgramCode, Section, SectionId, Student,
    StudentId, Term, TermCode,
};
use super::lookup::{CostLookup, TermLookup};

/// Serialized read model: everything the engine and its callers need, in one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub terms: Vec<Term>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unable to access snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

impl CatalogSnapshot {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), CatalogError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CatalogError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Records payments and links each one to its enrollment.
    pub fn apply_payments(&mut self, payments: &[Payment]) {
        let by_enrollment: HashMap<_, _> = payments
            .iter()
            .map(|payment| (&payment.enrollment, &payment.id))
            .collect();

        for enrollment in &mut self.enrollments {
            if let Some(payment_id) = by_enrollment.get(&enrollment.id) {
                enrollment.payment = Some((*payment_id).clone());
            }
        }
        self.payments.extend(payments.iter().cloned());
    }
}

/// Indexed, immutable view over a [`CatalogSnapshot`].
///
/// Built once per request so term and credit lookups are plain map reads.
#[derive(Debug, Clone)]
pub struct Catalog {
    snapshot: CatalogSnapshot,
    programs: HashMap<ProgramCode, usize>,
    terms: HashMap<TermCode, usize>,
    sections: HashMap<SectionId, usize>,
    students: HashMap<StudentId, usize>,
    unpaid: HashMap<StudentId, Vec<Enrollment>>,
    active_term: Option<usize>,
}

impl Catalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        let programs = index_by(&snapshot.programs, |program| program.code.clone());
        let terms = index_by(&snapshot.terms, |term| term.code.clone());
        let sections = index_by(&snapshot.sections, |section| section.id.clone());
        let students = index_by(&snapshot.students, |student| student.id.clone());

        let unpaid = unpaid_by_student(&snapshot);
        let active_term = pick_active_term(&snapshot.terms);

        Self {
            programs,
            terms,
            sections,
            students,
            unpaid,
            active_term,
            snapshot,
        }
    }

    pub fn snapshot(&self) -> &CatalogSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> CatalogSnapshot {
        self.snapshot
    }

    pub fn active_term(&self) -> Option<&Term> {
        self.active_term.map(|index| &self.snapshot.terms[index])
    }

    pub fn program(&self, code: &ProgramCode) -> Option<&Program> {
        self.programs
            .get(code)
            .map(|index| &self.snapshot.programs[*index])
    }

    pub fn term(&self, code: &TermCode) -> Option<&Term> {
        self.terms.get(code).map(|index| &self.snapshot.terms[*index])
    }

    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.sections
            .get(id)
            .map(|index| &self.snapshot.sections[*index])
    }

    pub fn student(&self, id: &StudentId) -> Option<&Student> {
        self.students
            .get(id)
            .map(|index| &self.snapshot.students[*index])
    }

    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.snapshot.students.iter()
    }

    pub fn payments(&self) -> &[Payment] {
        &self.snapshot.payments
    }

    pub fn unpaid_enrollments(&self, student: &StudentId) -> &[Enrollment] {
        self.unpaid.get(student).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Assembles the engine input for one student, or `None` for an unknown id.
    pub fn debtor(&self, student: &StudentId, as_of: NaiveDateTime) -> Option<DebtorSnapshot<'_>> {
        let record = self.student(student)?;
        let program = record.program.as_ref().and_then(|code| {
            let program = self.program(code);
            if program.is_none() {
                tracing::warn!(student = %record.id, program = %code, "program not in catalog");
            }
            program
        });

        Some(DebtorSnapshot {
            student: record,
            program,
            unpaid_enrollments: self.unpaid_enrollments(student),
            active_term: self.active_term(),
            as_of,
        })
    }
}

impl TermLookup for Catalog {
    fn term_for(&self, enrollment: &Enrollment) -> Option<&Term> {
        self.section(&enrollment.section)
            .and_then(|section| self.term(&section.term))
    }
}

impl CostLookup for Catalog {
    fn credits_for(&self, enrollment: &Enrollment) -> Option<i32> {
        self.section(&enrollment.section)
            .map(|section| section.credits)
    }
}

fn index_by<T, K, F>(items: &[T], key: F) -> HashMap<K, usize>
where
    K: std::hash::Hash + Eq + std::fmt::Display,
    F: Fn(&T) -> K,
{
    let mut index = HashMap::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let id = key(item);
        if index.contains_key(&id) {
            tracing::warn!(%id, "duplicate catalog entry; keeping the first one");
            continue;
        }
        index.insert(id, position);
    }
    index
}

fn unpaid_by_student(snapshot: &CatalogSnapshot) -> HashMap<StudentId, Vec<Enrollment>> {
    let settled: HashSet<&EnrollmentId> = snapshot
        .payments
        .iter()
        .map(|payment| &payment.enrollment)
        .collect();

    let mut unpaid: HashMap<StudentId, Vec<Enrollment>> = HashMap::new();
    for enrollment in &snapshot.enrollments {
        if enrollment.is_paid() || settled.contains(&enrollment.id) {
            continue;
        }
        unpaid
            .entry(enrollment.student.clone())
            .or_default()
            .push(enrollment.clone());
    }
    unpaid
}

fn pick_active_term(terms: &[Term]) -> Option<usize> {
    let active: Vec<_> = terms
        .iter()
        .enumerate()
        .filter(|(_, term)| term.active)
        .collect();

    if active.len() > 1 {
        tracing::warn!(
            count = active.len(),
            "more than one active term; using the latest start date"
        );
    }

    active
        .into_iter()
        .max_by_key(|(_, term)| term.start_date)
        .map(|(index, _)| index)
}
