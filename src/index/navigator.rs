use std::collections::BTreeMap;
use crate::core::types::{DocId, FieldId};
use crate::index::metadata::IndexMetadata;
use crate::query::context::QueryContext;
use crate::results::intermediate::IntermediateQueryResult;
use crate::results::location::MatchLocation;
use crate::results::scored::{FieldMatch, ScoredToken};

/// Handle to a saved navigator position. Handles index a navigator-owned
/// arena and are reused after release, so a handle is only valid between its
/// `create_bookmark` and the matching `release_bookmark`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bookmark(pub u32);

/// Traversal cursor over the indexed token trie, bound to an immutable
/// snapshot. A failed character match leaves the navigator failed until a
/// bookmark is applied.
pub trait IndexNavigator {
    /// Advances by one character; false means no such branch exists
    fn process_char(&mut self, ch: char) -> bool;

    /// Bulk equivalent of repeated `process_char`
    fn process_text(&mut self, text: &str) -> bool {
        text.chars().all(|ch| self.process_char(ch))
    }

    fn create_bookmark(&mut self) -> Bookmark;

    fn apply_bookmark(&mut self, bookmark: Bookmark);

    fn release_bookmark(&mut self, bookmark: Bookmark);

    /// Distinct characters reachable from the current position
    fn next_characters(&self) -> Vec<char>;

    /// Stable key identifying the current position, usable for visited-set
    /// deduplication. Bookmark handles are pooled and cannot serve as keys.
    fn position_key(&self) -> u64;

    /// True when a complete indexed token ends at the current position
    fn has_exact_matches(&self) -> bool;

    fn collect_exact_matches(
        &self,
        context: &QueryContext,
        weighting: f64,
        collector: &mut DocumentMatchCollector,
    );

    fn collect_exact_and_descendant_matches(
        &self,
        context: &QueryContext,
        weighting: f64,
        collector: &mut DocumentMatchCollector,
    );

    fn exact_matches(&self, context: &QueryContext, weighting: f64) -> IntermediateQueryResult {
        let mut collector = DocumentMatchCollector::new();
        self.collect_exact_matches(context, weighting, &mut collector);
        collector.into_result()
    }

    fn exact_and_descendant_matches(
        &self,
        context: &QueryContext,
        weighting: f64,
    ) -> IntermediateQueryResult {
        let mut collector = DocumentMatchCollector::new();
        self.collect_exact_and_descendant_matches(context, weighting, &mut collector);
        collector.into_result()
    }

    /// Read-only document/field statistics for the bound snapshot
    fn metadata(&self) -> &IndexMetadata;
}

/// Creates fresh navigators over one immutable index snapshot. Each query
/// part evaluation requests its own navigator.
pub trait NavigatorSource {
    fn create_navigator(&self) -> Box<dyn IndexNavigator + '_>;
}

/// Accumulates matches from many navigator positions into one result,
/// summing scores and merging locations per document/field pair.
#[derive(Debug, Default)]
pub struct DocumentMatchCollector {
    entries: BTreeMap<DocId, BTreeMap<FieldId, CollectedField>>,
}

#[derive(Debug, Default)]
struct CollectedField {
    score: f64,
    locations: Vec<MatchLocation>,
}

impl DocumentMatchCollector {
    pub fn new() -> Self {
        DocumentMatchCollector::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add(
        &mut self,
        document_id: DocId,
        field_id: FieldId,
        score: f64,
        locations: impl IntoIterator<Item = MatchLocation>,
    ) {
        let field = self
            .entries
            .entry(document_id)
            .or_default()
            .entry(field_id)
            .or_default();
        field.score += score;
        field.locations.extend(locations);
    }

    pub fn into_result(self) -> IntermediateQueryResult {
        let matches = self
            .entries
            .into_iter()
            .map(|(document_id, fields)| {
                let field_matches = fields
                    .into_iter()
                    .map(|(field_id, field)| {
                        FieldMatch::new(field_id, field.score, field.locations)
                    })
                    .collect();
                ScoredToken::new(document_id, field_matches)
            })
            .collect();
        IntermediateQueryResult::new(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::location::TokenLocation;

    #[test]
    fn test_collector_merges_repeated_additions() {
        let mut collector = DocumentMatchCollector::new();
        collector.add(
            DocId(3),
            FieldId(0),
            0.5,
            [MatchLocation::Single(TokenLocation::new(4, 0, 1))],
        );
        collector.add(
            DocId(1),
            FieldId(0),
            1.0,
            [MatchLocation::Single(TokenLocation::new(2, 0, 1))],
        );
        collector.add(
            DocId(3),
            FieldId(0),
            0.25,
            [MatchLocation::Single(TokenLocation::new(1, 0, 1))],
        );

        let result = collector.into_result();
        let ids: Vec<DocId> = result.document_ids().collect();
        assert_eq!(ids, vec![DocId(1), DocId(3)]);

        let doc3 = &result.matches()[1];
        assert!((doc3.score() - 0.75).abs() < 1e-9);
        let indexes: Vec<u32> = doc3.field_matches[0]
            .locations
            .iter()
            .map(MatchLocation::min_token_index)
            .collect();
        assert_eq!(indexes, vec![1, 4]);
    }
}
