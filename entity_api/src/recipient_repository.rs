use crate::error::Error;
use async_trait::async_trait;
use entity::Id;
use std::collections::BTreeSet;

/// Read-side contract for audience base sets. Implementations apply role
/// scoping (students only) and exclude deleted accounts; the audience
/// resolver composes these sets and subtracts exceptions on top.
///
/// All queries are pure reads and must run against the same transactional
/// snapshot as the mutation they bracket.
#[async_trait]
pub trait RecipientRepository: Send + Sync {
    /// Every eligible, non-deleted student.
    async fn all_active_students(&self) -> Result<BTreeSet<Id>, Error>;

    /// Students whose current career is in the given set.
    async fn students_by_career(
        &self,
        career_ids: &BTreeSet<Id>,
    ) -> Result<BTreeSet<Id>, Error>;

    /// Students whose current semester is in the given set.
    async fn students_by_semester(
        &self,
        semesters: &BTreeSet<i16>,
    ) -> Result<BTreeSet<Id>, Error>;

    /// Students carrying any of the given applicant tags.
    async fn students_by_tag(&self, tag_ids: &BTreeSet<Id>) -> Result<BTreeSet<Id>, Error>;
}
