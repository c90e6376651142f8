use crate::core::error::{Error, Result};
use crate::index::metadata::IndexMetadata;
use crate::index::navigator::NavigatorSource;
use crate::query::context::QueryContext;
use crate::query::weighting::CachedWeighting;
use crate::results::intermediate::IntermediateQueryResult;
use crate::results::scored::{FieldMatch, ScoredToken};

/// How a word part matches against the trie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordMatchKind {
    /// The whole token must equal the word
    Exact,
    /// Any token beginning with the word matches
    StartsWith,
    /// Exact match whose token position must touch the field start and/or end
    Anchored { require_start: bool, require_end: bool },
}

/// A single-word query part: drives one navigator through the word's
/// characters and requests exact or exact-plus-descendant matches.
#[derive(Debug, Clone)]
pub struct WordQueryPart {
    word: String,
    match_kind: WordMatchKind,
    score_boost: f64,
    weighting: CachedWeighting,
}

impl WordQueryPart {
    pub fn exact(word: impl Into<String>) -> Self {
        WordQueryPart::new(word, WordMatchKind::Exact)
    }

    pub fn starts_with(word: impl Into<String>) -> Self {
        WordQueryPart::new(word, WordMatchKind::StartsWith)
    }

    pub fn anchored(word: impl Into<String>, require_start: bool, require_end: bool) -> Self {
        WordQueryPart::new(word, WordMatchKind::Anchored { require_start, require_end })
    }

    fn new(word: impl Into<String>, match_kind: WordMatchKind) -> Self {
        WordQueryPart {
            word: word.into(),
            match_kind,
            score_boost: 1.0,
            weighting: CachedWeighting::new(),
        }
    }

    pub fn with_score_boost(mut self, score_boost: f64) -> Self {
        self.score_boost = score_boost;
        self
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn match_kind(&self) -> WordMatchKind {
        self.match_kind
    }

    pub fn evaluate(
        &self,
        source: &dyn NavigatorSource,
        context: &QueryContext,
    ) -> Result<IntermediateQueryResult> {
        if self.word.is_empty() {
            return Err(Error::invalid_argument("word query part requires a non-empty word"));
        }

        let weighting = self.weighting(source) * self.score_boost;
        let mut navigator = source.create_navigator();
        if !navigator.process_text(&self.word) {
            return Ok(IntermediateQueryResult::empty().clone());
        }

        match self.match_kind {
            WordMatchKind::Exact => Ok(navigator.exact_matches(context, weighting)),
            WordMatchKind::StartsWith => {
                Ok(navigator.exact_and_descendant_matches(context, weighting))
            }
            WordMatchKind::Anchored { require_start, require_end } => {
                let matches = navigator.exact_matches(context, weighting);
                filter_anchored(&matches, navigator.metadata(), require_start, require_end)
            }
        }
    }

    /// Selectivity estimate: fraction of indexed documents this word reaches.
    /// Computed on first use and cached on the part instance.
    pub fn weighting(&self, source: &dyn NavigatorSource) -> f64 {
        self.weighting.get_or_compute(|| {
            let mut navigator = source.create_navigator();
            let total = navigator.metadata().document_count().max(1);
            if !navigator.process_text(&self.word) {
                return 0.0;
            }
            let matched = match self.match_kind {
                WordMatchKind::StartsWith => {
                    navigator.exact_and_descendant_matches(&QueryContext::new(), 1.0)
                }
                _ => navigator.exact_matches(&QueryContext::new(), 1.0),
            };
            matched.len() as f64 / total as f64
        })
    }
}

/// Keeps only locations whose token-index span touches the requested field
/// boundaries; matches left without locations are dropped.
fn filter_anchored(
    matches: &IntermediateQueryResult,
    metadata: &IndexMetadata,
    require_start: bool,
    require_end: bool,
) -> Result<IntermediateQueryResult> {
    let mut out = Vec::new();

    for token in matches.matches() {
        let mut field_matches = Vec::new();
        for field_match in &token.field_matches {
            let stats =
                metadata.require_field_statistics(token.document_id, field_match.field_id)?;
            let kept: Vec<_> = field_match
                .locations
                .iter()
                .filter(|location| {
                    (!require_start || location.min_token_index() == 0)
                        && (!require_end || location.max_token_index() == stats.last_token_index)
                })
                .cloned()
                .collect();
            if !kept.is_empty() {
                field_matches.push(FieldMatch::new(field_match.field_id, field_match.score, kept));
            }
        }
        if !field_matches.is_empty() {
            out.push(ScoredToken::new(token.document_id, field_matches));
        }
    }

    Ok(IntermediateQueryResult::new(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DocId, FieldId};
    use crate::index::in_memory::InMemoryIndex;

    fn sample_index() -> InMemoryIndex {
        let mut index = InMemoryIndex::new();
        index.add_text(DocId(1), FieldId(0), "the cat sat");
        index.add_text(DocId(2), FieldId(0), "sat the cat down");
        index
    }

    #[test]
    fn test_exact_word_matches_only_complete_tokens() {
        let index = sample_index();
        let context = QueryContext::new();

        let result = WordQueryPart::exact("cat").evaluate(&index, &context).unwrap();
        assert_eq!(result.len(), 2);

        let result = WordQueryPart::exact("ca").evaluate(&index, &context).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_starts_with_matches_descendants() {
        let index = sample_index();
        let result = WordQueryPart::starts_with("ca")
            .evaluate(&index, &QueryContext::new())
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_missing_word_yields_empty() {
        let index = sample_index();
        let result = WordQueryPart::exact("dog")
            .evaluate(&index, &QueryContext::new())
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_anchored_start() {
        let index = sample_index();
        let context = QueryContext::new();

        // "the" starts document 1 only
        let result = WordQueryPart::anchored("the", true, false)
            .evaluate(&index, &context)
            .unwrap();
        let ids: Vec<DocId> = result.document_ids().collect();
        assert_eq!(ids, vec![DocId(1)]);

        // "sat" starts document 2 only
        let result = WordQueryPart::anchored("sat", true, false)
            .evaluate(&index, &context)
            .unwrap();
        let ids: Vec<DocId> = result.document_ids().collect();
        assert_eq!(ids, vec![DocId(2)]);
    }

    #[test]
    fn test_anchored_end() {
        let index = sample_index();
        let result = WordQueryPart::anchored("sat", false, true)
            .evaluate(&index, &QueryContext::new())
            .unwrap();
        let ids: Vec<DocId> = result.document_ids().collect();
        assert_eq!(ids, vec![DocId(1)]);
    }

    #[test]
    fn test_empty_word_rejected() {
        let index = sample_index();
        let err = WordQueryPart::exact("")
            .evaluate(&index, &QueryContext::new())
            .unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_weighting_reflects_selectivity() {
        let index = sample_index();
        let everywhere = WordQueryPart::exact("cat");
        let nowhere = WordQueryPart::exact("dog");
        assert_eq!(everywhere.weighting(&index), 1.0);
        assert_eq!(nowhere.weighting(&index), 0.0);
    }
}
