//! Audience resolver: computes the concrete set of student ids a payment
//! concept currently applies to.
//!
//! Pure read over the recipient repository. An empty result is not an error
//! at this layer; the use cases decide when emptiness blocks a mutation.

use crate::diff::ChangeSet;
use crate::error::Error;
use entity::{AppliesTo, Id, PaymentConcept};
use entity_api::RecipientRepository;
use std::collections::BTreeSet;

/// Resolves the concept's audience from its targeting mode and relation
/// sets, minus its exception set. In Students mode the explicit student list
/// is the audience and exceptions do not apply.
pub async fn resolve(
    recipients: &dyn RecipientRepository,
    concept: &PaymentConcept,
) -> Result<BTreeSet<Id>, Error> {
    let base = match concept.applies_to {
        AppliesTo::Students => return Ok(concept.student_ids.clone()),
        AppliesTo::All => recipients.all_active_students().await?,
        AppliesTo::Career => recipients.students_by_career(&concept.career_ids).await?,
        AppliesTo::Semester => recipients.students_by_semester(&concept.semesters).await?,
        AppliesTo::CareerSemester => {
            let by_career = recipients.students_by_career(&concept.career_ids).await?;
            let by_semester = recipients.students_by_semester(&concept.semesters).await?;
            by_career.intersection(&by_semester).copied().collect()
        }
        AppliesTo::Tag => {
            recipients
                .students_by_tag(&concept.applicant_tag_ids)
                .await?
        }
    };

    Ok(base.difference(&concept.exception_ids).copied().collect())
}

/// Whether the concept currently applies to anyone at all.
pub async fn has_any_recipient(
    recipients: &dyn RecipientRepository,
    concept: &PaymentConcept,
) -> Result<bool, Error> {
    Ok(!resolve(recipients, concept).await?.is_empty())
}

/// Which audience must learn about a mutation: the old/new union when the
/// mutation reshaped the audience (targeting, relations, exceptions), the
/// current audience for pure field updates.
pub fn audience_for(
    change_set: &ChangeSet,
    old_audience: &BTreeSet<Id>,
    new_audience: &BTreeSet<Id>,
) -> BTreeSet<Id> {
    if change_set.reshapes_audience() {
        old_audience.union(new_audience).copied().collect()
    } else {
        new_audience.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use chrono::NaiveDate;
    use entity::ConceptStatus;
    use entity_api::mock::{MockStudentDirectory, StudentRecord};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn student(n: u128) -> Id {
        Uuid::from_u128(n)
    }

    fn concept(applies_to: AppliesTo) -> PaymentConcept {
        PaymentConcept {
            id: Uuid::from_u128(1),
            name: "Taller de titulación".to_string(),
            description: None,
            amount: Decimal::new(80000, 2),
            status: ConceptStatus::Active,
            start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 11, 30).unwrap(),
            applies_to,
            is_global: applies_to.is_global(),
            career_ids: BTreeSet::new(),
            semesters: BTreeSet::new(),
            student_ids: BTreeSet::new(),
            applicant_tag_ids: BTreeSet::new(),
            exception_ids: BTreeSet::new(),
        }
    }

    fn directory() -> MockStudentDirectory {
        let career_a = Uuid::from_u128(100);
        let career_b = Uuid::from_u128(101);
        let tag = Uuid::from_u128(200);
        MockStudentDirectory::new(vec![
            StudentRecord::new(student(1))
                .with_career(career_a)
                .with_semester(1),
            StudentRecord::new(student(2))
                .with_career(career_a)
                .with_semester(3),
            StudentRecord::new(student(3))
                .with_career(career_b)
                .with_semester(3)
                .with_tag(tag),
            StudentRecord::new(student(4))
                .with_career(career_b)
                .with_semester(5),
        ])
    }

    #[tokio::test]
    async fn test_all_mode_resolves_every_active_student() {
        let audience = resolve(&directory(), &concept(AppliesTo::All)).await.unwrap();
        assert_eq!(
            audience,
            BTreeSet::from([student(1), student(2), student(3), student(4)])
        );
    }

    #[tokio::test]
    async fn test_career_semester_mode_is_an_intersection() {
        let mut c = concept(AppliesTo::CareerSemester);
        c.career_ids = BTreeSet::from([Uuid::from_u128(100)]);
        c.semesters = BTreeSet::from([3]);

        // Career A has students 1 and 2; semester 3 has students 2 and 3.
        let audience = resolve(&directory(), &c).await.unwrap();
        assert_eq!(audience, BTreeSet::from([student(2)]));
    }

    #[tokio::test]
    async fn test_students_mode_ignores_exceptions() {
        let mut c = concept(AppliesTo::Students);
        c.student_ids = BTreeSet::from([student(1), student(2)]);
        // Invariant-violating exception set on purpose: the resolver must
        // still return the explicit list verbatim.
        c.exception_ids = BTreeSet::from([student(1)]);

        let audience = resolve(&directory(), &c).await.unwrap();
        assert_eq!(audience, c.student_ids);
    }

    #[tokio::test]
    async fn test_exceptions_never_survive_resolution() {
        let directory = directory();
        let career_a = Uuid::from_u128(100);
        let tag = Uuid::from_u128(200);

        let mut cases = Vec::new();

        let mut all = concept(AppliesTo::All);
        all.exception_ids = BTreeSet::from([student(2)]);
        cases.push(all);

        let mut by_career = concept(AppliesTo::Career);
        by_career.career_ids = BTreeSet::from([career_a]);
        by_career.exception_ids = BTreeSet::from([student(1)]);
        cases.push(by_career);

        let mut by_semester = concept(AppliesTo::Semester);
        by_semester.semesters = BTreeSet::from([3]);
        by_semester.exception_ids = BTreeSet::from([student(3)]);
        cases.push(by_semester);

        let mut by_both = concept(AppliesTo::CareerSemester);
        by_both.career_ids = BTreeSet::from([career_a]);
        by_both.semesters = BTreeSet::from([3]);
        by_both.exception_ids = BTreeSet::from([student(2)]);
        cases.push(by_both);

        let mut by_tag = concept(AppliesTo::Tag);
        by_tag.applicant_tag_ids = BTreeSet::from([tag]);
        by_tag.exception_ids = BTreeSet::from([student(3)]);
        cases.push(by_tag);

        for c in cases {
            let audience = resolve(&directory, &c).await.unwrap();
            assert!(
                audience.is_disjoint(&c.exception_ids),
                "exception leaked into {} audience",
                c.applies_to
            );
        }
    }

    #[tokio::test]
    async fn test_empty_audience_is_not_an_error() {
        let mut c = concept(AppliesTo::Career);
        c.career_ids = BTreeSet::from([Uuid::from_u128(999)]);

        let audience = resolve(&directory(), &c).await.unwrap();
        assert!(audience.is_empty());
        assert!(!has_any_recipient(&directory(), &c).await.unwrap());
    }

    #[test]
    fn test_audience_for_unions_when_targeting_changed() {
        let mut old = concept(AppliesTo::Career);
        old.career_ids = BTreeSet::from([Uuid::from_u128(100)]);
        let mut new = concept(AppliesTo::Semester);
        new.semesters = BTreeSet::from([3]);

        let change_set = diff(&old, &new);
        let old_audience = BTreeSet::from([student(1), student(2)]);
        let new_audience = BTreeSet::from([student(2), student(3)]);

        assert_eq!(
            audience_for(&change_set, &old_audience, &new_audience),
            BTreeSet::from([student(1), student(2), student(3)])
        );
    }

    #[test]
    fn test_audience_for_uses_new_audience_for_field_updates() {
        let old = concept(AppliesTo::All);
        let mut new = concept(AppliesTo::All);
        new.amount = Decimal::new(90000, 2);

        let change_set = diff(&old, &new);
        let old_audience = BTreeSet::from([student(1)]);
        let new_audience = BTreeSet::from([student(2)]);

        assert_eq!(
            audience_for(&change_set, &old_audience, &new_audience),
            new_audience
        );
    }
}
