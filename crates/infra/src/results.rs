//! In-memory result store.

use std::collections::HashMap;
use std::sync::RwLock;

use registra_academics::CourseId;
use registra_core::{AggregateRoot, ExpectedVersion, StoreError, UserId};
use registra_results::{ResultId, ResultStore, StudentResult};

#[derive(Debug, Default)]
struct Inner {
    by_id: HashMap<ResultId, StudentResult>,
    by_pair: HashMap<(UserId, CourseId), ResultId>,
}

/// In-memory [`ResultStore`].
///
/// The write lock is the serialization point: version checks and replacement
/// happen under one guard, so two racing commits cannot both pass.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    inner: RwLock<Inner>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for InMemoryResultStore {
    fn get(&self, result_id: ResultId) -> Result<StudentResult, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::unavailable("result lock poisoned"))?;
        inner.by_id.get(&result_id).cloned().ok_or(StoreError::NotFound)
    }

    fn find_by_student_course(
        &self,
        student_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<StudentResult>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::unavailable("result lock poisoned"))?;
        Ok(inner
            .by_pair
            .get(&(student_id, course_id))
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    fn insert(&self, result: StudentResult) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::unavailable("result lock poisoned"))?;
        let result_id = result.id_typed();
        let pair = (result.student_id(), result.course_id());

        if inner.by_id.contains_key(&result_id) {
            return Err(StoreError::conflict(format!("result {result_id} already exists")));
        }
        if inner.by_pair.contains_key(&pair) {
            return Err(StoreError::conflict(
                "a result for this (student, course) already exists",
            ));
        }

        inner.by_pair.insert(pair, result_id);
        inner.by_id.insert(result_id, result);
        Ok(())
    }

    fn commit(&self, result: StudentResult, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::unavailable("result lock poisoned"))?;
        let result_id = result.id_typed();
        let existing = inner.by_id.get(&result_id).ok_or(StoreError::NotFound)?;
        expected.check(existing.version())?;
        inner.by_id.insert(result_id, result);
        Ok(())
    }
}
