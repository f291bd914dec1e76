//! Typed indexer for writing records to a document store.
//!
//! The indexer wraps IndexWriter with shared access via Arc<Mutex>.
//! `save`, `save_batch` and `delete` commit before returning; `stage` leaves
//! the write pending until the next commit.

use std::sync::{Arc, Mutex, MutexGuard};

use tantivy::IndexWriter;
use tracing::{debug, info, warn};

use lexmap_types::{IdGenerator, RecordId, UlidGenerator};

use crate::codec::FieldValue;
use crate::document::{identity_term, record_identity, record_to_doc};
use crate::error::SearchError;
use crate::index::DocumentStore;
use crate::schema::{resolve, Record, RecordSchema};

/// Writes records of type `T`.
pub struct Indexer<T> {
    store: DocumentStore,
    schema: Arc<RecordSchema<T>>,
    writer: Arc<Mutex<IndexWriter>>,
    ids: Arc<dyn IdGenerator>,
}

impl<T: Record> Indexer<T> {
    /// Create an indexer with ULID identities.
    pub fn new(store: &DocumentStore) -> Result<Self, SearchError> {
        Self::with_id_generator(store, Arc::new(UlidGenerator))
    }

    pub fn with_id_generator(
        store: &DocumentStore,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, SearchError> {
        let schema = resolve::<T>()?;
        let writer = store.writer()?;
        Ok(Self {
            store: store.clone(),
            schema,
            writer: Arc::new(Mutex::new(writer)),
            ids,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, IndexWriter>, SearchError> {
        self.writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))
    }

    /// Save a record, replacing any stored record with the same identity.
    ///
    /// An empty identity is generated and written back into `record`.
    pub fn save(&self, record: &mut T) -> Result<RecordId, SearchError> {
        let mut writer = self.lock()?;
        let id = self.write_record(&writer, record)?;
        writer.commit()?;
        debug!(record = self.schema.name(), id = %id, "Saved record");
        Ok(id)
    }

    /// Write a record without committing.
    ///
    /// A failed write adds nothing; writes staged earlier stay pending.
    pub fn stage(&self, record: &mut T) -> Result<RecordId, SearchError> {
        let writer = self.lock()?;
        self.write_record(&writer, record)
    }

    /// Save many records under a single commit.
    ///
    /// If any record fails, every uncommitted write is rolled back, including
    /// writes staged before the batch.
    pub fn save_batch(&self, records: &mut [T]) -> Result<usize, SearchError> {
        let mut writer = self.lock()?;

        let mut count = 0;
        for record in records.iter_mut() {
            if let Err(e) = self.write_record(&writer, record) {
                warn!(
                    record = self.schema.name(),
                    written = count,
                    error = %e,
                    "Batch failed, rolling back"
                );
                writer.rollback()?;
                return Err(e);
            }
            count += 1;
        }
        writer.commit()?;

        info!(record = self.schema.name(), count, "Saved record batch");
        Ok(count)
    }

    /// Delete the stored record with `record`'s identity.
    ///
    /// Returns false if the record has no identity to delete by.
    pub fn delete(&self, record: &T) -> Result<bool, SearchError> {
        match record_identity(&self.schema, record)? {
            Some(id) => self.delete_by_id(&id),
            None => Ok(false),
        }
    }

    pub fn delete_by_id(&self, id: &RecordId) -> Result<bool, SearchError> {
        if id.is_empty() {
            return Ok(false);
        }
        let term = identity_term(&self.schema, self.store.schema(), id)?;
        let mut writer = self.lock()?;
        writer.delete_term(term);
        writer.commit()?;
        debug!(record = self.schema.name(), id = %id, "Deleted record");
        Ok(true)
    }

    /// Delete every document in the store.
    ///
    /// Best effort: a store failure is logged and reported as `false`.
    pub fn clear(&self) -> bool {
        let result = self.lock().and_then(|mut writer| {
            writer.delete_all_documents()?;
            writer.commit()?;
            Ok(())
        });
        match result {
            Ok(()) => {
                info!(record = self.schema.name(), "Cleared index");
                true
            }
            Err(e) => {
                warn!(record = self.schema.name(), error = %e, "Failed to clear index");
                false
            }
        }
    }

    /// Commit pending writes, making them visible to refreshed searchers.
    pub fn commit(&self) -> Result<u64, SearchError> {
        let mut writer = self.lock()?;
        let opstamp = writer.commit()?;
        info!(opstamp, "Committed index changes");
        Ok(opstamp)
    }

    /// Discard writes since the last commit.
    pub fn rollback(&self) -> Result<u64, SearchError> {
        let mut writer = self.lock()?;
        let opstamp = writer.rollback()?;
        info!(opstamp, "Rolled back index changes");
        Ok(opstamp)
    }

    /// Merge all searchable segments into one.
    pub fn optimize(&self) -> Result<(), SearchError> {
        let segments = self.store.index().searchable_segment_ids()?;
        if segments.len() < 2 {
            debug!(segments = segments.len(), "Nothing to merge");
            return Ok(());
        }
        let mut writer = self.lock()?;
        writer.merge(&segments).wait()?;
        info!(merged = segments.len(), "Optimized index");
        Ok(())
    }

    /// Assign an identity if needed, then delete-and-add the document.
    fn write_record(&self, writer: &IndexWriter, record: &mut T) -> Result<RecordId, SearchError> {
        let (id, implicit) = match self.schema.identity_index() {
            Some(index) => {
                let id = match record_identity(&self.schema, record)? {
                    Some(id) => id,
                    None => {
                        let id = self.ids.generate();
                        self.schema
                            .write(index, record, FieldValue::Id(id.clone()))?;
                        id
                    }
                };
                (id, None)
            }
            None => {
                let id = self.ids.generate();
                (id.clone(), Some(id))
            }
        };

        let doc = record_to_doc(
            &self.schema,
            self.store.schema(),
            self.store.codec(),
            record,
            implicit.as_ref(),
        )?;

        writer.delete_term(identity_term(&self.schema, self.store.schema(), &id)?);
        writer.add_document(doc)?;
        Ok(id)
    }
}
