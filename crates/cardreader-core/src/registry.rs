//! Registry of known tags.
//!
//! The registry maps the canonical hex form of a tag identifier to its
//! [`TagRecord`]. It is filled once at startup and then handed to the
//! listener behind an `Arc`, which makes it read-only for the whole
//! listening phase.
//!
//! # Duplicate registrations
//!
//! Registering an identifier that is already present replaces the previous
//! record (last write wins). [`TagRegistry::register`] returns the displaced
//! record so callers that want to reject duplicates can do so.
//!
//! # Examples
//!
//! ```
//! use cardreader_core::{ScanOutcome, TagIdentifier, TagRegistry};
//!
//! let mut registry = TagRegistry::new();
//! let id: TagIdentifier = "A3 47 64 B7".parse().unwrap();
//! registry.register("Key Tag", id.clone()).unwrap();
//!
//! match registry.lookup(&id) {
//!     ScanOutcome::Known(record) => assert_eq!(record.label, "Key Tag"),
//!     ScanOutcome::Unknown(_) => unreachable!(),
//! }
//! ```

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{Error, Result, ScanOutcome, TagIdentifier, TagRecord};

/// Mapping from canonical identifier text to tag record.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    records: HashMap<String, TagRecord>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag under `label`.
    ///
    /// Returns the record previously bound to the same identifier, if any.
    ///
    /// # Errors
    /// Returns `Error::InvalidIdentifier` if the identifier is empty. Empty
    /// identifiers are what a zero-length scan produces and must never match.
    pub fn register(
        &mut self,
        label: impl Into<String>,
        identifier: TagIdentifier,
    ) -> Result<Option<TagRecord>> {
        if identifier.is_empty() {
            return Err(Error::invalid_identifier("identifier must not be empty"));
        }

        let record = TagRecord::new(label, identifier);
        let key = record.identifier.canonical();
        debug!(uid = %key, label = %record.label, "Registering tag");

        let previous = self.records.insert(key, record);
        if let Some(prev) = &previous
            && let Some(current) = self.records.get(&prev.identifier.canonical())
            && current.label != prev.label
        {
            warn!(
                uid = %current.identifier,
                old_label = %prev.label,
                new_label = %current.label,
                "Tag registration replaced an existing label"
            );
        }

        Ok(previous)
    }

    /// Register every record in `records`, stopping at the first invalid one.
    pub fn extend(&mut self, records: impl IntoIterator<Item = TagRecord>) -> Result<()> {
        for record in records {
            self.register(record.label, record.identifier)?;
        }
        Ok(())
    }

    /// Look up a scanned identifier.
    ///
    /// The scanned identifier is compared against every registered one with
    /// the constant-time equality of [`TagIdentifier`], without stopping at
    /// the first match, so the time taken does not depend on how many
    /// leading bytes of a registered UID were guessed.
    pub fn lookup(&self, identifier: &TagIdentifier) -> ScanOutcome {
        let found = self.records.values().fold(None, |found, record| {
            if record.identifier == *identifier {
                Some(record)
            } else {
                found
            }
        });

        match found {
            Some(record) => ScanOutcome::Known(record.clone()),
            None => ScanOutcome::Unknown(identifier.clone()),
        }
    }

    /// Get the record registered for an identifier.
    pub fn get(&self, identifier: &TagIdentifier) -> Option<&TagRecord> {
        self.records.get(&identifier.canonical())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over registered records in no particular order.
    pub fn records(&self) -> impl Iterator<Item = &TagRecord> {
        self.records.values()
    }
}
