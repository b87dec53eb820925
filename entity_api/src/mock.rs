//! In-memory repository implementations used by tests and local wiring.
//! Enabled through the `mock` cargo feature (always on for this crate's
//! own tests).

use crate::error::Error;
use crate::{ConceptRepository, RecipientRepository};
use async_trait::async_trait;
use entity::{ConceptFieldPatch, ConceptStatus, Id, PaymentConcept, TargetingUpdate};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

/// One student row as the recipient queries see it.
#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: Id,
    pub career_id: Option<Id>,
    pub semester: Option<i16>,
    pub tag_ids: BTreeSet<Id>,
    pub deleted: bool,
}

impl StudentRecord {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            career_id: None,
            semester: None,
            tag_ids: BTreeSet::new(),
            deleted: false,
        }
    }

    pub fn with_career(mut self, career_id: Id) -> Self {
        self.career_id = Some(career_id);
        self
    }

    pub fn with_semester(mut self, semester: i16) -> Self {
        self.semester = Some(semester);
        self
    }

    pub fn with_tag(mut self, tag_id: Id) -> Self {
        self.tag_ids.insert(tag_id);
        self
    }
}

/// In-memory student directory answering the base-set queries.
#[derive(Debug, Default)]
pub struct MockStudentDirectory {
    students: Vec<StudentRecord>,
}

impl MockStudentDirectory {
    pub fn new(students: Vec<StudentRecord>) -> Self {
        Self { students }
    }

    fn eligible(&self) -> impl Iterator<Item = &StudentRecord> {
        self.students.iter().filter(|s| !s.deleted)
    }
}

#[async_trait]
impl RecipientRepository for MockStudentDirectory {
    async fn all_active_students(&self) -> Result<BTreeSet<Id>, Error> {
        Ok(self.eligible().map(|s| s.id).collect())
    }

    async fn students_by_career(
        &self,
        career_ids: &BTreeSet<Id>,
    ) -> Result<BTreeSet<Id>, Error> {
        Ok(self
            .eligible()
            .filter(|s| s.career_id.map(|c| career_ids.contains(&c)).unwrap_or(false))
            .map(|s| s.id)
            .collect())
    }

    async fn students_by_semester(
        &self,
        semesters: &BTreeSet<i16>,
    ) -> Result<BTreeSet<Id>, Error> {
        Ok(self
            .eligible()
            .filter(|s| s.semester.map(|n| semesters.contains(&n)).unwrap_or(false))
            .map(|s| s.id)
            .collect())
    }

    async fn students_by_tag(&self, tag_ids: &BTreeSet<Id>) -> Result<BTreeSet<Id>, Error> {
        Ok(self
            .eligible()
            .filter(|s| !s.tag_ids.is_disjoint(tag_ids))
            .map(|s| s.id)
            .collect())
    }
}

/// In-memory concept store. Mutations mirror what the real store does:
/// targeting updates detach stale relation sets and sync exceptions.
#[derive(Debug, Default)]
pub struct InMemoryConceptRepository {
    concepts: Mutex<HashMap<Id, PaymentConcept>>,
}

impl InMemoryConceptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concept(self, concept: PaymentConcept) -> Self {
        self.concepts
            .lock()
            .unwrap()
            .insert(concept.id, concept);
        self
    }

    fn mutate<F>(&self, id: Id, f: F) -> Result<PaymentConcept, Error>
    where
        F: FnOnce(&mut PaymentConcept),
    {
        let mut concepts = self.concepts.lock().unwrap();
        let concept = concepts.get_mut(&id).ok_or_else(Error::not_found)?;
        f(concept);
        Ok(concept.clone())
    }
}

#[async_trait]
impl ConceptRepository for InMemoryConceptRepository {
    async fn find_by_id(&self, id: Id) -> Result<PaymentConcept, Error> {
        self.concepts
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(Error::not_found)
    }

    async fn create(&self, concept: PaymentConcept) -> Result<PaymentConcept, Error> {
        let mut concepts = self.concepts.lock().unwrap();
        concepts.insert(concept.id, concept.clone());
        Ok(concept)
    }

    async fn update_fields(
        &self,
        id: Id,
        patch: ConceptFieldPatch,
    ) -> Result<PaymentConcept, Error> {
        self.mutate(id, |concept| patch.apply_to(concept))
    }

    async fn update_status(
        &self,
        id: Id,
        status: ConceptStatus,
    ) -> Result<PaymentConcept, Error> {
        self.mutate(id, |concept| concept.status = status)
    }

    async fn update_targeting(
        &self,
        id: Id,
        update: TargetingUpdate,
    ) -> Result<PaymentConcept, Error> {
        self.mutate(id, |concept| {
            update.apply_to(concept);
        })
    }

    async fn set_exceptions(
        &self,
        id: Id,
        exception_ids: BTreeSet<Id>,
    ) -> Result<PaymentConcept, Error> {
        self.mutate(id, |concept| concept.exception_ids = exception_ids)
    }
}
