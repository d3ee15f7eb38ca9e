//! Client-local annotation store seeded by the one-shot migration.

use crate::error::{CoordinatorError, Result};
use crate::types::Annotation;
use parking_lot::RwLock;

/// Writable local store of annotations.
pub trait LocalMirror: Send + Sync {
    /// Insert a record. Fails with `DuplicateRecord` if the id exists.
    fn insert(&self, annotation: Annotation) -> Result<()>;

    /// Remove every record matching `predicate`, returning how many went.
    fn remove_where(&self, predicate: &dyn Fn(&Annotation) -> bool) -> usize;

    /// Copy of the current contents.
    fn snapshot(&self) -> Vec<Annotation>;
}

/// Mirror held in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    records: RwLock<Vec<Annotation>>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.read().iter().any(|a| a.id == id)
    }
}

impl LocalMirror for MemoryMirror {
    fn insert(&self, annotation: Annotation) -> Result<()> {
        let mut records = self.records.write();
        if records.iter().any(|a| a.id == annotation.id) {
            return Err(CoordinatorError::DuplicateRecord(annotation.id));
        }
        records.push(annotation);
        Ok(())
    }

    fn remove_where(&self, predicate: &dyn Fn(&Annotation) -> bool) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|a| !predicate(a));
        before - records.len()
    }

    fn snapshot(&self) -> Vec<Annotation> {
        self.records.read().clone()
    }
}
