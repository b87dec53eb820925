//! Change diff engine: computes the structured change-set between two
//! concept snapshots captured around a mutation.
//!
//! The diff is a pure function of `(old, new)`, so the same pair of
//! snapshots always yields the same change-set. It feeds both the
//! cache-invalidation reason and the per-recipient notification content
//! downstream.

use chrono::NaiveDate;
use entity::{AppliesTo, Id, PaymentConcept};
use events::Priority;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Scalar fields tracked by the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptField {
    Name,
    Description,
    Amount,
    StartDate,
    EndDate,
}

impl ConceptField {
    fn is_date(&self) -> bool {
        matches!(self, ConceptField::StartDate | ConceptField::EndDate)
    }
}

impl std::fmt::Display for ConceptField {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConceptField::Name => write!(fmt, "name"),
            ConceptField::Description => write!(fmt, "description"),
            ConceptField::Amount => write!(fmt, "amount"),
            ConceptField::StartDate => write!(fmt, "start_date"),
            ConceptField::EndDate => write!(fmt, "end_date"),
        }
    }
}

/// A scalar value as it appears in a field-update record. Monetary values
/// compare as exact decimals, dates by calendar instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    OptText(Option<String>),
    Amount(Decimal),
    Date(NaiveDate),
}

/// Relation axes tracked by the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Careers,
    Semesters,
    Students,
    ApplicantTags,
}

/// Added/removed ids for one relation axis. Semesters are plain numbers,
/// every other axis holds entity ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RelationSet {
    Users(BTreeSet<Id>),
    Semesters(BTreeSet<i16>),
}

/// One entry of a change-set. A closed union so the notifier's
/// message-building match is exhaustive at compile time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeRecord {
    FieldUpdate {
        field: ConceptField,
        old: FieldValue,
        new: FieldValue,
    },
    AppliesToChanged {
        old: AppliesTo,
        new: AppliesTo,
    },
    RelationUpdate {
        kind: RelationKind,
        added: RelationSet,
        removed: RelationSet,
    },
    ExceptionsUpdate {
        added: BTreeSet<Id>,
        removed: BTreeSet<Id>,
        /// True when the removals are a side effect of switching the
        /// targeting mode to an explicit student list, where exceptions
        /// are meaningless.
        cleared_by_mode_change: bool,
    },
}

/// Dominant classification of a change-set, in precedence order. Picks the
/// notification title downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DominantChange {
    AppliesToChanged,
    ExceptionsUpdate,
    RelationUpdate,
    FieldUpdate,
}

/// An ordered list of change records produced by one mutation's diff.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChangeSet {
    records: Vec<ChangeRecord>,
}

impl ChangeSet {
    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Dominant change type with precedence
    /// AppliesToChanged > ExceptionsUpdate > RelationUpdate > FieldUpdate.
    pub fn dominant(&self) -> Option<DominantChange> {
        for wanted in [
            DominantChange::AppliesToChanged,
            DominantChange::ExceptionsUpdate,
            DominantChange::RelationUpdate,
            DominantChange::FieldUpdate,
        ] {
            let found = self.records.iter().any(|record| {
                matches!(
                    (record, wanted),
                    (ChangeRecord::AppliesToChanged { .. }, DominantChange::AppliesToChanged)
                        | (ChangeRecord::ExceptionsUpdate { .. }, DominantChange::ExceptionsUpdate)
                        | (ChangeRecord::RelationUpdate { .. }, DominantChange::RelationUpdate)
                        | (ChangeRecord::FieldUpdate { .. }, DominantChange::FieldUpdate)
                )
            });
            if found {
                return Some(wanted);
            }
        }
        None
    }

    /// The exceptions added/removed by this mutation, when any.
    pub fn exceptions_delta(&self) -> Option<(&BTreeSet<Id>, &BTreeSet<Id>)> {
        self.records.iter().find_map(|record| match record {
            ChangeRecord::ExceptionsUpdate { added, removed, .. } => Some((added, removed)),
            _ => None,
        })
    }

    /// Whether the mutation changed who the concept applies to (targeting
    /// mode, relation sets, or exceptions) rather than just its fields.
    /// Decides between notifying the audience union and the new audience.
    pub fn reshapes_audience(&self) -> bool {
        self.records.iter().any(|record| {
            !matches!(record, ChangeRecord::FieldUpdate { .. })
        })
    }
}

/// Computes the structured diff between two snapshots of the same concept.
pub fn diff(old: &PaymentConcept, new: &PaymentConcept) -> ChangeSet {
    let mut records = Vec::new();

    push_field(
        &mut records,
        ConceptField::Name,
        FieldValue::Text(old.name.clone()),
        FieldValue::Text(new.name.clone()),
    );
    push_field(
        &mut records,
        ConceptField::Description,
        FieldValue::OptText(old.description.clone()),
        FieldValue::OptText(new.description.clone()),
    );
    push_field(
        &mut records,
        ConceptField::Amount,
        FieldValue::Amount(old.amount),
        FieldValue::Amount(new.amount),
    );
    push_field(
        &mut records,
        ConceptField::StartDate,
        FieldValue::Date(old.start_date),
        FieldValue::Date(new.start_date),
    );
    push_field(
        &mut records,
        ConceptField::EndDate,
        FieldValue::Date(old.end_date),
        FieldValue::Date(new.end_date),
    );

    if old.applies_to != new.applies_to {
        records.push(ChangeRecord::AppliesToChanged {
            old: old.applies_to,
            new: new.applies_to,
        });
    }

    push_user_relation(
        &mut records,
        RelationKind::Careers,
        &old.career_ids,
        &new.career_ids,
    );
    push_semester_relation(&mut records, &old.semesters, &new.semesters);
    // Only meaningful in Students mode; empty by construction otherwise.
    push_user_relation(
        &mut records,
        RelationKind::Students,
        &old.student_ids,
        &new.student_ids,
    );
    push_user_relation(
        &mut records,
        RelationKind::ApplicantTags,
        &old.applicant_tag_ids,
        &new.applicant_tag_ids,
    );

    let exceptions_added: BTreeSet<Id> = new
        .exception_ids
        .difference(&old.exception_ids)
        .copied()
        .collect();
    let exceptions_removed: BTreeSet<Id> = old
        .exception_ids
        .difference(&new.exception_ids)
        .copied()
        .collect();
    if !exceptions_added.is_empty() || !exceptions_removed.is_empty() {
        let cleared_by_mode_change = !exceptions_removed.is_empty()
            && old.applies_to != new.applies_to
            && !new.applies_to.allows_exceptions();
        records.push(ChangeRecord::ExceptionsUpdate {
            added: exceptions_added,
            removed: exceptions_removed,
            cleared_by_mode_change,
        });
    }

    ChangeSet { records }
}

/// Notification priority for a change-set: amount increases and date-field
/// changes are high, everything else medium.
pub fn priority_for(change_set: &ChangeSet) -> Priority {
    for record in change_set.records() {
        if let ChangeRecord::FieldUpdate { field, old, new } = record {
            if field.is_date() {
                return Priority::High;
            }
            if let (FieldValue::Amount(old_amount), FieldValue::Amount(new_amount)) = (old, new) {
                if new_amount > old_amount {
                    return Priority::High;
                }
            }
        }
    }
    Priority::Medium
}

fn push_field(
    records: &mut Vec<ChangeRecord>,
    field: ConceptField,
    old: FieldValue,
    new: FieldValue,
) {
    if old != new {
        records.push(ChangeRecord::FieldUpdate { field, old, new });
    }
}

fn push_user_relation(
    records: &mut Vec<ChangeRecord>,
    kind: RelationKind,
    old: &BTreeSet<Id>,
    new: &BTreeSet<Id>,
) {
    let added: BTreeSet<Id> = new.difference(old).copied().collect();
    let removed: BTreeSet<Id> = old.difference(new).copied().collect();
    if !added.is_empty() || !removed.is_empty() {
        records.push(ChangeRecord::RelationUpdate {
            kind,
            added: RelationSet::Users(added),
            removed: RelationSet::Users(removed),
        });
    }
}

fn push_semester_relation(
    records: &mut Vec<ChangeRecord>,
    old: &BTreeSet<i16>,
    new: &BTreeSet<i16>,
) {
    let added: BTreeSet<i16> = new.difference(old).copied().collect();
    let removed: BTreeSet<i16> = old.difference(new).copied().collect();
    if !added.is_empty() || !removed.is_empty() {
        records.push(ChangeRecord::RelationUpdate {
            kind: RelationKind::Semesters,
            added: RelationSet::Semesters(added),
            removed: RelationSet::Semesters(removed),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity::ConceptStatus;
    use uuid::Uuid;

    fn base_concept() -> PaymentConcept {
        PaymentConcept {
            id: Uuid::from_u128(1),
            name: "Colegiatura".to_string(),
            description: Some("Pago mensual".to_string()),
            amount: Decimal::new(10000, 2),
            status: ConceptStatus::Active,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            applies_to: AppliesTo::All,
            is_global: true,
            career_ids: BTreeSet::new(),
            semesters: BTreeSet::new(),
            student_ids: BTreeSet::new(),
            applicant_tag_ids: BTreeSet::new(),
            exception_ids: BTreeSet::new(),
        }
    }

    #[test]
    fn test_diff_of_identical_snapshots_is_empty() {
        let concept = base_concept();
        let change_set = diff(&concept, &concept);
        assert!(change_set.is_empty());
        assert_eq!(change_set.dominant(), None);
    }

    #[test]
    fn test_amount_change_yields_high_priority_field_update() {
        let old = base_concept();
        let mut new = base_concept();
        new.amount = Decimal::new(15000, 2);

        let change_set = diff(&old, &new);
        assert_eq!(
            change_set.records(),
            &[ChangeRecord::FieldUpdate {
                field: ConceptField::Amount,
                old: FieldValue::Amount(Decimal::new(10000, 2)),
                new: FieldValue::Amount(Decimal::new(15000, 2)),
            }]
        );
        assert_eq!(change_set.dominant(), Some(DominantChange::FieldUpdate));
        assert_eq!(priority_for(&change_set), Priority::High);
    }

    #[test]
    fn test_amount_decrease_is_medium_priority() {
        let old = base_concept();
        let mut new = base_concept();
        new.amount = Decimal::new(5000, 2);

        assert_eq!(priority_for(&diff(&old, &new)), Priority::Medium);
    }

    #[test]
    fn test_date_change_is_high_priority() {
        let old = base_concept();
        let mut new = base_concept();
        new.end_date = NaiveDate::from_ymd_opt(2025, 7, 31).unwrap();

        assert_eq!(priority_for(&diff(&old, &new)), Priority::High);
    }

    #[test]
    fn test_amount_equality_is_exact_decimal() {
        // 100.00 and 100.000 are the same monetary value.
        let mut old = base_concept();
        old.amount = Decimal::new(10000, 2);
        let mut new = base_concept();
        new.amount = Decimal::new(100000, 3);

        assert!(diff(&old, &new).is_empty());
    }

    #[test]
    fn test_applies_to_change_uses_wire_labels() {
        let mut old = base_concept();
        old.applies_to = AppliesTo::Career;
        old.is_global = false;
        old.career_ids = BTreeSet::from([Uuid::from_u128(10)]);
        let mut new = base_concept();
        new.applies_to = AppliesTo::Semester;
        new.is_global = false;
        new.semesters = BTreeSet::from([3]);

        let change_set = diff(&old, &new);
        assert_eq!(change_set.dominant(), Some(DominantChange::AppliesToChanged));

        let record = change_set
            .records()
            .iter()
            .find(|r| matches!(r, ChangeRecord::AppliesToChanged { .. }))
            .unwrap();
        if let ChangeRecord::AppliesToChanged { old, new } = record {
            assert_eq!(old.to_string(), "carrera");
            assert_eq!(new.to_string(), "semestre");
        }
    }

    #[test]
    fn test_relation_diff_is_symmetric() {
        let mut a = base_concept();
        a.applies_to = AppliesTo::Career;
        a.is_global = false;
        a.career_ids = BTreeSet::from([Uuid::from_u128(1), Uuid::from_u128(2)]);
        let mut b = base_concept();
        b.applies_to = AppliesTo::Career;
        b.is_global = false;
        b.career_ids = BTreeSet::from([Uuid::from_u128(2), Uuid::from_u128(3)]);

        let forward = diff(&a, &b);
        let backward = diff(&b, &a);

        let delta = |cs: &ChangeSet| -> (RelationSet, RelationSet) {
            cs.records()
                .iter()
                .find_map(|r| match r {
                    ChangeRecord::RelationUpdate {
                        kind: RelationKind::Careers,
                        added,
                        removed,
                    } => Some((added.clone(), removed.clone())),
                    _ => None,
                })
                .unwrap()
        };

        let (added_fwd, removed_fwd) = delta(&forward);
        let (added_bwd, removed_bwd) = delta(&backward);
        assert_eq!(added_fwd, removed_bwd);
        assert_eq!(removed_fwd, added_bwd);
    }

    #[test]
    fn test_exceptions_cleared_by_switch_to_students_mode() {
        let excluded = Uuid::from_u128(99);
        let mut old = base_concept();
        old.applies_to = AppliesTo::Career;
        old.is_global = false;
        old.career_ids = BTreeSet::from([Uuid::from_u128(10)]);
        old.exception_ids = BTreeSet::from([excluded]);

        let mut new = base_concept();
        new.applies_to = AppliesTo::Students;
        new.is_global = false;
        new.student_ids = BTreeSet::from([Uuid::from_u128(20)]);

        let change_set = diff(&old, &new);
        let record = change_set
            .records()
            .iter()
            .find(|r| matches!(r, ChangeRecord::ExceptionsUpdate { .. }))
            .unwrap();
        if let ChangeRecord::ExceptionsUpdate {
            removed,
            cleared_by_mode_change,
            ..
        } = record
        {
            assert_eq!(removed, &BTreeSet::from([excluded]));
            assert!(cleared_by_mode_change);
        }
        // The mode change still dominates the exceptions side effect.
        assert_eq!(change_set.dominant(), Some(DominantChange::AppliesToChanged));
    }

    #[test]
    fn test_exceptions_update_dominates_relation_and_field_changes() {
        let mut old = base_concept();
        old.applies_to = AppliesTo::Career;
        old.is_global = false;
        old.career_ids = BTreeSet::from([Uuid::from_u128(10)]);
        let mut new = old.clone();
        new.amount = Decimal::new(20000, 2);
        new.career_ids.insert(Uuid::from_u128(11));
        new.exception_ids.insert(Uuid::from_u128(99));

        let change_set = diff(&old, &new);
        assert_eq!(change_set.dominant(), Some(DominantChange::ExceptionsUpdate));
        assert!(change_set.reshapes_audience());
    }

    #[test]
    fn test_pure_field_update_does_not_reshape_audience() {
        let old = base_concept();
        let mut new = base_concept();
        new.name = "Colegiatura 2025".to_string();

        let change_set = diff(&old, &new);
        assert!(!change_set.reshapes_audience());
        assert_eq!(change_set.dominant(), Some(DominantChange::FieldUpdate));
    }

    #[test]
    fn test_description_clearing_is_a_field_update() {
        let old = base_concept();
        let mut new = base_concept();
        new.description = None;

        let change_set = diff(&old, &new);
        assert_eq!(change_set.len(), 1);
        assert_eq!(
            change_set.records()[0],
            ChangeRecord::FieldUpdate {
                field: ConceptField::Description,
                old: FieldValue::OptText(Some("Pago mensual".to_string())),
                new: FieldValue::OptText(None),
            }
        );
    }
}
