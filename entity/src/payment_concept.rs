use crate::{AppliesTo, ConceptStatus, Id};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A snapshot of a payment concept: a billable definition (tuition, workshop
/// fee, ...) with an amount, a validity window, and a targeting rule that
/// decides which students owe it.
///
/// Snapshots are plain values handed across the repository seam. A mutation
/// flow captures one snapshot before the write and one after, and diffs them.
///
/// Invariants:
/// - `is_global == applies_to.is_global()`
/// - relation sets for non-active targeting modes are empty (the repository
///   detaches them on any targeting-mode change)
/// - `exception_ids` is empty when `applies_to == Students`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConcept {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    /// Currency-exact amount. Never a float.
    pub amount: Decimal,
    pub status: ConceptStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub applies_to: AppliesTo,
    pub is_global: bool,
    pub career_ids: BTreeSet<Id>,
    pub semesters: BTreeSet<i16>,
    pub student_ids: BTreeSet<Id>,
    pub applicant_tag_ids: BTreeSet<Id>,
    /// Students excluded from the computed audience regardless of the
    /// targeting rule. Meaningless (forced empty) in Students mode.
    pub exception_ids: BTreeSet<Id>,
}

/// Targeting invariant violations reported by [`PaymentConcept::validate_targeting`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetingViolation {
    /// The active targeting mode has an empty relation set.
    MissingTargetingData(AppliesTo),
    /// `is_global` disagrees with `applies_to`.
    GlobalFlagMismatch,
}

impl PaymentConcept {
    /// The relation set the active targeting mode draws from, as a count.
    /// `All` needs no relation data.
    fn active_relation_len(&self) -> Option<usize> {
        match self.applies_to {
            AppliesTo::All => None,
            AppliesTo::Career => Some(self.career_ids.len()),
            AppliesTo::Semester => Some(self.semesters.len()),
            AppliesTo::CareerSemester => {
                Some(self.career_ids.len().min(self.semesters.len()))
            }
            AppliesTo::Students => Some(self.student_ids.len()),
            AppliesTo::Tag => Some(self.applicant_tag_ids.len()),
        }
    }

    /// Checks the targeting invariants without mutating the snapshot.
    pub fn validate_targeting(&self) -> Result<(), TargetingViolation> {
        if self.is_global != self.applies_to.is_global() {
            return Err(TargetingViolation::GlobalFlagMismatch);
        }
        if let Some(0) = self.active_relation_len() {
            return Err(TargetingViolation::MissingTargetingData(self.applies_to));
        }
        Ok(())
    }

    /// Detaches relation sets that do not belong to the active targeting
    /// mode, clears exceptions in Students mode, and re-derives `is_global`.
    /// Returns `true` when a non-empty exception set was cleared, so callers
    /// can surface that side effect in the change diff.
    pub fn normalize_targeting(&mut self) -> bool {
        if !matches!(self.applies_to, AppliesTo::Career | AppliesTo::CareerSemester) {
            self.career_ids.clear();
        }
        if !matches!(self.applies_to, AppliesTo::Semester | AppliesTo::CareerSemester) {
            self.semesters.clear();
        }
        if self.applies_to != AppliesTo::Students {
            self.student_ids.clear();
        }
        if self.applies_to != AppliesTo::Tag {
            self.applicant_tag_ids.clear();
        }
        self.is_global = self.applies_to.is_global();

        let cleared_exceptions =
            !self.applies_to.allows_exceptions() && !self.exception_ids.is_empty();
        if cleared_exceptions {
            self.exception_ids.clear();
        }
        cleared_exceptions
    }
}

/// Optional new values for the scalar fields of a concept. `None` leaves the
/// field untouched; `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default)]
pub struct ConceptFieldPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub amount: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ConceptFieldPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.amount.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }

    /// Applies the patch to a snapshot in place.
    pub fn apply_to(&self, concept: &mut PaymentConcept) {
        if let Some(name) = &self.name {
            concept.name = name.clone();
        }
        if let Some(description) = &self.description {
            concept.description = description.clone();
        }
        if let Some(amount) = self.amount {
            concept.amount = amount;
        }
        if let Some(start_date) = self.start_date {
            concept.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            concept.end_date = end_date;
        }
    }
}

/// A full replacement of a concept's targeting rule: the new mode plus the
/// relation and exception sets that go with it. Sets not belonging to the
/// new mode are ignored (detached) when applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetingUpdate {
    pub applies_to: AppliesTo,
    #[serde(default)]
    pub career_ids: BTreeSet<Id>,
    #[serde(default)]
    pub semesters: BTreeSet<i16>,
    #[serde(default)]
    pub student_ids: BTreeSet<Id>,
    #[serde(default)]
    pub applicant_tag_ids: BTreeSet<Id>,
    #[serde(default)]
    pub exception_ids: BTreeSet<Id>,
}

impl TargetingUpdate {
    /// Applies the update to a snapshot in place and normalizes it.
    /// Returns `true` when a non-empty exception set was cleared because the
    /// new mode disallows exceptions.
    pub fn apply_to(&self, concept: &mut PaymentConcept) -> bool {
        concept.applies_to = self.applies_to;
        concept.career_ids = self.career_ids.clone();
        concept.semesters = self.semesters.clone();
        concept.student_ids = self.student_ids.clone();
        concept.applicant_tag_ids = self.applicant_tag_ids.clone();
        concept.exception_ids = self.exception_ids.clone();
        concept.normalize_targeting()
    }
}

/// Input for the concept-creation flow. The id is assigned by the repository
/// when the concept is persisted.
#[derive(Debug, Clone)]
pub struct NewPaymentConcept {
    pub name: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub targeting: TargetingUpdate,
}

impl NewPaymentConcept {
    /// Builds the initial snapshot for the given id. The snapshot is
    /// normalized; creation starts in Active status.
    pub fn into_concept(self, id: Id) -> PaymentConcept {
        let mut concept = PaymentConcept {
            id,
            name: self.name,
            description: self.description,
            amount: self.amount,
            status: ConceptStatus::Active,
            start_date: self.start_date,
            end_date: self.end_date,
            applies_to: self.targeting.applies_to,
            is_global: self.targeting.applies_to.is_global(),
            career_ids: self.targeting.career_ids,
            semesters: self.targeting.semesters,
            student_ids: self.targeting.student_ids,
            applicant_tag_ids: self.targeting.applicant_tag_ids,
            exception_ids: self.targeting.exception_ids,
        };
        concept.normalize_targeting();
        concept
    }
}
