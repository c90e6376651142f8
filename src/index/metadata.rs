use std::collections::{BTreeSet, HashMap};
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, FieldId};
use crate::results::location::TokenLocation;

/// Per document/field token statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldStatistics {
    pub token_count: u32,
    pub last_token_index: u32,
}

/// Aggregate counts per field across the whole index
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldTotals {
    pub total_token_count: u64,
    pub document_count: u64,
}

/// Read-only document/field statistics for an index snapshot. Anchored
/// matching and scoring read these during evaluation.
#[derive(Debug, Clone, Default)]
pub struct IndexMetadata {
    documents: BTreeSet<DocId>,
    field_totals: HashMap<FieldId, FieldTotals>,
    document_fields: HashMap<(DocId, FieldId), FieldStatistics>,
}

impl IndexMetadata {
    pub fn new() -> Self {
        IndexMetadata::default()
    }

    pub fn document_count(&self) -> u64 {
        self.documents.len() as u64
    }

    pub fn field_statistics(&self, document_id: DocId, field_id: FieldId) -> Option<FieldStatistics> {
        self.document_fields.get(&(document_id, field_id)).copied()
    }

    /// Statistics lookup that treats absence as an internal-consistency
    /// failure; a match in a field the metadata has never seen means the
    /// index and its statistics have diverged.
    pub fn require_field_statistics(
        &self,
        document_id: DocId,
        field_id: FieldId,
    ) -> Result<FieldStatistics> {
        self.field_statistics(document_id, field_id).ok_or_else(|| {
            Error::invalid_state(format!(
                "no token statistics for document {} field {}",
                document_id.value(),
                field_id.value()
            ))
        })
    }

    pub fn average_field_length(&self, field_id: FieldId) -> f64 {
        match self.field_totals.get(&field_id) {
            Some(totals) if totals.document_count > 0 => {
                totals.total_token_count as f64 / totals.document_count as f64
            }
            _ => 0.0,
        }
    }

    pub fn documents_with_field(&self, field_id: FieldId) -> u64 {
        self.field_totals
            .get(&field_id)
            .map(|totals| totals.document_count)
            .unwrap_or(0)
    }

    /// Records one indexed token occurrence
    pub fn record_token(&mut self, document_id: DocId, field_id: FieldId, location: TokenLocation) {
        use std::collections::hash_map::Entry;

        self.documents.insert(document_id);
        let totals = self.field_totals.entry(field_id).or_default();
        totals.total_token_count += 1;

        match self.document_fields.entry((document_id, field_id)) {
            Entry::Occupied(mut occupied) => {
                let stats = occupied.get_mut();
                stats.token_count += 1;
                stats.last_token_index = stats.last_token_index.max(location.token_index);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(FieldStatistics {
                    token_count: 1,
                    last_token_index: location.token_index,
                });
                totals.document_count += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_token_tracks_counts_and_last_index() {
        let mut metadata = IndexMetadata::new();
        metadata.record_token(DocId(1), FieldId(0), TokenLocation::new(0, 0, 3));
        metadata.record_token(DocId(1), FieldId(0), TokenLocation::new(2, 8, 3));
        metadata.record_token(DocId(1), FieldId(0), TokenLocation::new(1, 4, 3));
        metadata.record_token(DocId(2), FieldId(0), TokenLocation::new(0, 0, 5));

        assert_eq!(metadata.document_count(), 2);
        let stats = metadata.field_statistics(DocId(1), FieldId(0)).unwrap();
        assert_eq!(stats.token_count, 3);
        assert_eq!(stats.last_token_index, 2);
        assert_eq!(metadata.documents_with_field(FieldId(0)), 2);
        assert!((metadata.average_field_length(FieldId(0)) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_require_field_statistics_fails_when_missing() {
        let metadata = IndexMetadata::new();
        let err = metadata
            .require_field_statistics(DocId(9), FieldId(1))
            .unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::InvalidState);
    }
}
