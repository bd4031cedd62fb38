//! Registration store contract
//!
//! Registrations are kept as schemaless documents grouped by entity name, so
//! the store stays agnostic of what the channel adapters persist. Filters
//! match documents whose fields equal every filter value.

use alertcast_common::BoxFuture;
use serde_json::{Map, Value};

use crate::error::DbError;

/// A stored document: field name to JSON value.
pub type Document = Map<String, Value>;

/// Field whose string value is unique within an entity.
pub const UNIQUE_FIELD: &str = "token";

/// Document store holding external registration state (e.g. push tokens).
///
/// Implementations must be safe for concurrent use.
pub trait RegistrationStore: Send + Sync {
    /// Returns the documents of `entity` matching every field of `filter`,
    /// in insertion order.
    ///
    /// Only the named `fields` are returned; an empty slice returns whole
    /// documents. Fields missing from a document are omitted.
    fn get_fields_by_fields<'a>(
        &'a self,
        filter: &'a Document,
        entity: &'a str,
        fields: &'a [&'a str],
    ) -> BoxFuture<'a, Vec<Document>, DbError>;

    /// Stores a new document under `entity`.
    ///
    /// A document repeating the [`UNIQUE_FIELD`] value of a stored one is
    /// rejected with [`DbError::DuplicateKey`].
    fn insert_single_document<'a>(
        &'a self,
        document: Document,
        entity: &'a str,
    ) -> BoxFuture<'a, (), DbError>;

    /// Deletes the oldest document of `entity` matching `key`.
    ///
    /// Returns `false` when nothing matched.
    fn delete_single_document<'a>(
        &'a self,
        key: &'a Document,
        entity: &'a str,
    ) -> BoxFuture<'a, bool, DbError>;
}

/// A trait for repository factories
///
/// Generic over the repository type and the configuration it is built from.
pub trait RepositoryFactory<R, C> {
    fn create_repository(&self, config: C) -> R;
}

/// Whether `document` carries every field of `filter` with an equal value.
///
/// An empty filter matches everything.
pub fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(field, expected)| document.get(field) == Some(expected))
}

/// The [`UNIQUE_FIELD`] value of `document`, if it is a string.
pub fn unique_key(document: &Document) -> Option<&str> {
    document.get(UNIQUE_FIELD).and_then(Value::as_str)
}

/// Copies the named `fields` out of `document`; empty `fields` copies all.
pub fn project(document: &Document, fields: &[&str]) -> Document {
    if fields.is_empty() {
        return document.clone();
    }
    fields
        .iter()
        .filter_map(|field| {
            document
                .get(*field)
                .map(|value| (field.to_string(), value.clone()))
        })
        .collect()
}
