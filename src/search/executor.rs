use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;
use crate::core::error::Result;
use crate::core::types::DocId;
use crate::index::navigator::NavigatorSource;
use crate::query::context::QueryContext;
use crate::query::part::QueryPart;

/// Search results container
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub hits: Vec<ScoredDocument>,
    pub total_hits: usize,
    pub max_score: f64,
    pub took_ms: u64,
}

/// Document with relevance score
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document_id: DocId,
    pub score: f64,
}

// Implement ordering for heap
impl PartialEq for ScoredDocument {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}

impl Eq for ScoredDocument {}

impl PartialOrd for ScoredDocument {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        // Reverse order for max-heap
        other.score.partial_cmp(&self.score)
    }
}

impl Ord for ScoredDocument {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

/// Top-K collector for efficient result collection
pub struct TopKCollector {
    pub heap: BinaryHeap<ScoredDocument>,
    pub k: usize,
    pub min_score: f64,
    pub total_collected: usize,
}

impl TopKCollector {
    pub fn new(k: usize) -> Self {
        TopKCollector {
            heap: BinaryHeap::with_capacity(k + 1),
            k,
            min_score: 0.0,
            total_collected: 0,
        }
    }

    pub fn collect(&mut self, scored_document: ScoredDocument) {
        self.total_collected += 1;

        if scored_document.score > self.min_score || self.heap.len() < self.k {
            self.heap.push(scored_document);

            if self.heap.len() > self.k {
                self.heap.pop();
                if let Some(min_document) = self.heap.peek() {
                    self.min_score = min_document.score;
                }
            }
        }
    }

    pub fn get_results(self) -> Vec<ScoredDocument> {
        let mut results: Vec<_> = self.heap.into_iter().collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results
    }

    pub fn max_score(&self) -> f64 {
        self.heap.peek().map(|document| document.score).unwrap_or(0.0)
    }
}

/// Evaluates query trees against one index snapshot and ranks the matches
pub struct QueryExecutor<'a> {
    source: &'a dyn NavigatorSource,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(source: &'a dyn NavigatorSource) -> Self {
        QueryExecutor { source }
    }

    pub fn execute(
        &self,
        part: &QueryPart,
        context: &QueryContext,
        limit: usize,
    ) -> Result<SearchResults> {
        let start = Instant::now();
        let result = part.evaluate(self.source, context)?;

        let mut collector = TopKCollector::new(limit);
        for token in result.matches() {
            collector.collect(ScoredDocument {
                document_id: token.document_id,
                score: token.score(),
            });
        }

        let total_hits = collector.total_collected;
        let max_score = collector.max_score();
        let hits = collector.get_results();

        Ok(SearchResults {
            hits,
            total_hits,
            max_score,
            took_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FieldId;
    use crate::index::in_memory::InMemoryIndex;
    use crate::search::word::WordQueryPart;

    #[test]
    fn test_collector_keeps_top_k_by_score() {
        let mut collector = TopKCollector::new(2);
        for (id, score) in [(1, 0.5), (2, 2.0), (3, 1.0), (4, 0.1)] {
            collector.collect(ScoredDocument { document_id: DocId(id), score });
        }

        assert_eq!(collector.total_collected, 4);
        let results = collector.get_results();
        let ids: Vec<u64> = results.iter().map(|r| r.document_id.value()).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_execute_ranks_by_summed_field_scores() {
        let mut index = InMemoryIndex::new();
        index.add_text(DocId(1), FieldId(0), "rust rust rust");
        index.add_text(DocId(2), FieldId(0), "rust once with many other words here");

        let executor = QueryExecutor::new(&index);
        let results = executor
            .execute(
                &QueryPart::Word(WordQueryPart::exact("rust")),
                &QueryContext::new(),
                10,
            )
            .unwrap();

        assert_eq!(results.total_hits, 2);
        assert_eq!(results.hits[0].document_id, DocId(1));
        assert!((results.max_score - results.hits[0].score).abs() < 1e-9);
    }

    #[test]
    fn test_execute_applies_limit() {
        let mut index = InMemoryIndex::new();
        for id in 1..=5 {
            index.add_text(DocId(id), FieldId(0), "shared term");
        }

        let executor = QueryExecutor::new(&index);
        let results = executor
            .execute(
                &QueryPart::Word(WordQueryPart::exact("shared")),
                &QueryContext::new(),
                3,
            )
            .unwrap();

        assert_eq!(results.total_hits, 5);
        assert_eq!(results.hits.len(), 3);
    }
}
