use serde::{Serialize, Deserialize};
use crate::core::types::DocId;
use crate::results::merge;
use crate::results::scored::ScoredToken;

/// The value produced by evaluating any query part: matched documents in
/// ascending document-id order, each with its per-field match locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntermediateQueryResult {
    matches: Vec<ScoredToken>,
}

impl IntermediateQueryResult {
    /// `matches` must already be sorted ascending by document id with no
    /// duplicate documents.
    pub fn new(matches: Vec<ScoredToken>) -> Self {
        debug_assert!(
            matches.windows(2).all(|w| w[0].document_id < w[1].document_id),
            "matches must be strictly ordered by document id"
        );
        IntermediateQueryResult { matches }
    }

    /// Shared empty result
    pub fn empty() -> &'static IntermediateQueryResult {
        static EMPTY: IntermediateQueryResult = IntermediateQueryResult { matches: Vec::new() };
        &EMPTY
    }

    pub fn matches(&self) -> &[ScoredToken] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn document_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.matches.iter().map(|m| m.document_id)
    }

    /// Documents in either operand; shared fields merge locations and sum scores
    pub fn union(&self, other: &IntermediateQueryResult) -> IntermediateQueryResult {
        merge::union(self, other)
    }

    /// Documents in both operands; fields present on only one side are dropped
    pub fn intersect(&self, other: &IntermediateQueryResult) -> IntermediateQueryResult {
        merge::intersect(self, other)
    }

    /// Left documents whose id is absent from the right operand, untouched
    pub fn except(&self, other: &IntermediateQueryResult) -> IntermediateQueryResult {
        merge::except(self, other)
    }

    /// Document/field pairs where some left location starts before some right location
    pub fn preceding_intersect(&self, other: &IntermediateQueryResult) -> IntermediateQueryResult {
        merge::preceding_intersect(self, other)
    }

    /// Pairs left and right locations within the token-distance tolerances,
    /// producing composite locations
    pub fn composite_positional_intersect(
        &self,
        other: &IntermediateQueryResult,
        left_tolerance: u32,
        right_tolerance: u32,
    ) -> IntermediateQueryResult {
        merge::composite_positional_intersect(self, other, left_tolerance, right_tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FieldId;
    use crate::results::location::{MatchLocation, TokenLocation};
    use crate::results::scored::FieldMatch;

    #[test]
    fn test_empty_singleton_is_shared() {
        let a = IntermediateQueryResult::empty();
        let b = IntermediateQueryResult::empty();
        assert!(std::ptr::eq(a, b));
        assert!(a.is_empty());
    }

    #[test]
    fn test_document_ids_in_order() {
        let result = IntermediateQueryResult::new(vec![
            ScoredToken::new(
                DocId(1),
                vec![FieldMatch::new(
                    FieldId(0),
                    1.0,
                    vec![MatchLocation::Single(TokenLocation::new(0, 0, 1))],
                )],
            ),
            ScoredToken::new(
                DocId(4),
                vec![FieldMatch::new(
                    FieldId(0),
                    1.0,
                    vec![MatchLocation::Single(TokenLocation::new(2, 8, 1))],
                )],
            ),
        ]);
        let ids: Vec<DocId> = result.document_ids().collect();
        assert_eq!(ids, vec![DocId(1), DocId(4)]);
    }
}
