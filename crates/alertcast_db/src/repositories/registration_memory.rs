//! In-process registration store, used when no database is configured and in tests.

use crate::error::DbError;
use crate::repository::{matches_filter, project, unique_key, Document, RegistrationStore};
use alertcast_common::BoxFuture;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
pub struct InMemoryRegistrationStore {
    entities: Mutex<HashMap<String, Vec<Document>>>,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents stored under `entity`.
    pub fn count(&self, entity: &str) -> usize {
        self.entities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
            .map_or(0, Vec::len)
    }
}

impl RegistrationStore for InMemoryRegistrationStore {
    fn get_fields_by_fields<'a>(
        &'a self,
        filter: &'a Document,
        entity: &'a str,
        fields: &'a [&'a str],
    ) -> BoxFuture<'a, Vec<Document>, DbError> {
        Box::pin(async move {
            let entities = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(entities
                .get(entity)
                .map(|documents| {
                    documents
                        .iter()
                        .filter(|document| matches_filter(document, filter))
                        .map(|document| project(document, fields))
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn insert_single_document<'a>(
        &'a self,
        document: Document,
        entity: &'a str,
    ) -> BoxFuture<'a, (), DbError> {
        Box::pin(async move {
            debug!(entity, "Inserting registry document");
            let mut entities = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
            let documents = entities.entry(entity.to_string()).or_default();
            if let Some(key) = unique_key(&document) {
                if documents.iter().any(|stored| unique_key(stored) == Some(key)) {
                    return Err(DbError::DuplicateKey(key.to_string()));
                }
            }
            documents.push(document);
            Ok(())
        })
    }

    fn delete_single_document<'a>(
        &'a self,
        key: &'a Document,
        entity: &'a str,
    ) -> BoxFuture<'a, bool, DbError> {
        Box::pin(async move {
            let mut entities = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(documents) = entities.get_mut(entity) else {
                return Ok(false);
            };
            match documents.iter().position(|document| matches_filter(document, key)) {
                Some(index) => {
                    documents.remove(index);
                    debug!(entity, "Deleted registry document");
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }
}
