use std::sync::Arc;
use roaring::RoaringTreemap;
use crate::core::types::{DocId, FieldId};
use crate::results::intermediate::IntermediateQueryResult;

/// Filter state threaded through query evaluation. AND-like operators
/// tighten the document filter on the way down to prune work; a field filter
/// restricts matches to one field.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    document_filter: Option<Arc<RoaringTreemap>>,
    field_filter: Option<FieldId>,
}

impl QueryContext {
    pub fn new() -> Self {
        QueryContext::default()
    }

    /// Root context restricted to the given documents
    pub fn for_documents(documents: impl IntoIterator<Item = DocId>) -> Self {
        let filter: RoaringTreemap = documents.into_iter().map(|d| d.value()).collect();
        QueryContext {
            document_filter: Some(Arc::new(filter)),
            field_filter: None,
        }
    }

    pub fn document_filter(&self) -> Option<&RoaringTreemap> {
        self.document_filter.as_deref()
    }

    pub fn field_filter(&self) -> Option<FieldId> {
        self.field_filter
    }

    pub fn matches_document(&self, document_id: DocId) -> bool {
        self.document_filter
            .as_ref()
            .is_none_or(|filter| filter.contains(document_id.value()))
    }

    pub fn matches_field(&self, field_id: FieldId) -> bool {
        self.field_filter.is_none_or(|filter| filter == field_id)
    }

    /// Context for a child scoped to one field
    pub fn scoped_to_field(&self, field_id: FieldId) -> Self {
        QueryContext {
            document_filter: self.document_filter.clone(),
            field_filter: Some(field_id),
        }
    }

    /// Context whose document filter is the intersection of the current
    /// filter and the documents present in `result`
    pub fn narrowed_to_documents(&self, result: &IntermediateQueryResult) -> Self {
        let documents: RoaringTreemap = result.document_ids().map(|d| d.value()).collect();
        let documents = match &self.document_filter {
            Some(existing) => &documents & existing.as_ref(),
            None => documents,
        };
        QueryContext {
            document_filter: Some(Arc::new(documents)),
            field_filter: self.field_filter,
        }
    }
}
