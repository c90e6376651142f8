use std::collections::HashMap;
use crate::core::types::{DocId, FieldId};
use crate::index::metadata::IndexMetadata;
use crate::index::navigator::{
    Bookmark, DocumentMatchCollector, IndexNavigator, NavigatorSource,
};
use crate::query::context::QueryContext;
use crate::results::location::{MatchLocation, TokenLocation};
use crate::scoring::scorer::{Bm25Scorer, Scorer, TermScoreInputs};

/// Sentinel position for a navigator that failed a character match
const FAILED: u32 = u32::MAX;

/// Reference in-memory index: an uncompressed character trie with per-node
/// postings. Built once, then queried through immutable navigators; there is
/// no node splitting, persistence, or removal.
pub struct InMemoryIndex {
    nodes: Vec<TrieNode>,
    metadata: IndexMetadata,
    scorer: Box<dyn Scorer>,
}

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<char, u32>,
    postings: Vec<NodePosting>,
}

/// Locations of one complete token for one document/field pair
#[derive(Debug)]
struct NodePosting {
    document_id: DocId,
    field_id: FieldId,
    locations: Vec<TokenLocation>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        InMemoryIndex {
            nodes: vec![TrieNode::default()],
            metadata: IndexMetadata::new(),
            scorer: Box::new(Bm25Scorer::default()),
        }
    }

    pub fn with_scorer(scorer: Box<dyn Scorer>) -> Self {
        InMemoryIndex { scorer, ..InMemoryIndex::new() }
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// Indexes one token occurrence at the given location
    pub fn add_token(
        &mut self,
        document_id: DocId,
        field_id: FieldId,
        token: &str,
        location: TokenLocation,
    ) {
        let mut node = 0u32;
        for ch in token.chars() {
            let next = match self.nodes[node as usize].children.get(&ch) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len() as u32;
                    self.nodes.push(TrieNode::default());
                    self.nodes[node as usize].children.insert(ch, child);
                    child
                }
            };
            node = next;
        }

        let postings = &mut self.nodes[node as usize].postings;
        match postings
            .iter_mut()
            .find(|p| p.document_id == document_id && p.field_id == field_id)
        {
            Some(posting) => posting.locations.push(location),
            None => postings.push(NodePosting {
                document_id,
                field_id,
                locations: vec![location],
            }),
        }

        self.metadata.record_token(document_id, field_id, location);
    }

    /// Convenience for tests and small corpora: whitespace tokenization with
    /// character offsets, lowercased. Not an analysis pipeline.
    pub fn add_text(&mut self, document_id: DocId, field_id: FieldId, text: &str) {
        let mut token_index = 0u32;
        let mut offset = 0u32;
        for raw in text.split_whitespace() {
            let start = text[offset as usize..].find(raw).unwrap_or(0) as u32 + offset;
            let token = raw.to_lowercase();
            let location = TokenLocation::new(token_index, start, raw.chars().count() as u32);
            self.add_token(document_id, field_id, &token, location);
            token_index += 1;
            offset = start + raw.len() as u32;
        }
    }

    fn node(&self, id: u32) -> &TrieNode {
        &self.nodes[id as usize]
    }

    fn score_posting(&self, posting: &NodePosting, matching_documents: u64, weighting: f64) -> f64 {
        let stats = self
            .metadata
            .field_statistics(posting.document_id, posting.field_id);
        let inputs = TermScoreInputs {
            term_frequency: posting.locations.len() as u32,
            matching_documents,
            total_documents: self.metadata.document_count(),
            field_length: stats.map(|s| s.token_count).unwrap_or(0),
            average_field_length: self.metadata.average_field_length(posting.field_id),
        };
        self.scorer.score(&inputs) * weighting
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        InMemoryIndex::new()
    }
}

impl NavigatorSource for InMemoryIndex {
    fn create_navigator(&self) -> Box<dyn IndexNavigator + '_> {
        Box::new(TrieNavigator {
            index: self,
            position: 0,
            bookmarks: Vec::new(),
            free: Vec::new(),
        })
    }
}

/// Navigator over the in-memory trie. Bookmarks live in a free-list arena so
/// released handles are reused without reallocation.
pub struct TrieNavigator<'a> {
    index: &'a InMemoryIndex,
    position: u32,
    bookmarks: Vec<u32>,
    free: Vec<u32>,
}

impl TrieNavigator<'_> {
    fn collect_node_matches(
        &self,
        node: u32,
        context: &QueryContext,
        weighting: f64,
        collector: &mut DocumentMatchCollector,
    ) {
        let postings = &self.index.node(node).postings;
        let matching_documents = postings
            .iter()
            .map(|p| p.document_id)
            .collect::<std::collections::HashSet<_>>()
            .len() as u64;

        for posting in postings {
            if !context.matches_document(posting.document_id)
                || !context.matches_field(posting.field_id)
            {
                continue;
            }
            collector.add(
                posting.document_id,
                posting.field_id,
                self.index.score_posting(posting, matching_documents, weighting),
                posting.locations.iter().copied().map(MatchLocation::Single),
            );
        }
    }
}

impl IndexNavigator for TrieNavigator<'_> {
    fn process_char(&mut self, ch: char) -> bool {
        if self.position == FAILED {
            return false;
        }
        match self.index.node(self.position).children.get(&ch) {
            Some(&child) => {
                self.position = child;
                true
            }
            None => {
                self.position = FAILED;
                false
            }
        }
    }

    fn create_bookmark(&mut self) -> Bookmark {
        match self.free.pop() {
            Some(slot) => {
                self.bookmarks[slot as usize] = self.position;
                Bookmark(slot)
            }
            None => {
                self.bookmarks.push(self.position);
                Bookmark(self.bookmarks.len() as u32 - 1)
            }
        }
    }

    fn apply_bookmark(&mut self, bookmark: Bookmark) {
        self.position = self.bookmarks[bookmark.0 as usize];
    }

    fn release_bookmark(&mut self, bookmark: Bookmark) {
        debug_assert!(!self.free.contains(&bookmark.0), "bookmark released twice");
        self.free.push(bookmark.0);
    }

    fn next_characters(&self) -> Vec<char> {
        if self.position == FAILED {
            return Vec::new();
        }
        let mut characters: Vec<char> =
            self.index.node(self.position).children.keys().copied().collect();
        characters.sort_unstable();
        characters
    }

    fn position_key(&self) -> u64 {
        self.position as u64
    }

    fn has_exact_matches(&self) -> bool {
        self.position != FAILED && !self.index.node(self.position).postings.is_empty()
    }

    fn collect_exact_matches(
        &self,
        context: &QueryContext,
        weighting: f64,
        collector: &mut DocumentMatchCollector,
    ) {
        if self.position != FAILED {
            self.collect_node_matches(self.position, context, weighting, collector);
        }
    }

    fn collect_exact_and_descendant_matches(
        &self,
        context: &QueryContext,
        weighting: f64,
        collector: &mut DocumentMatchCollector,
    ) {
        if self.position == FAILED {
            return;
        }
        let mut stack = vec![self.position];
        while let Some(node) = stack.pop() {
            self.collect_node_matches(node, context, weighting, collector);
            stack.extend(self.index.node(node).children.values().copied());
        }
    }

    fn metadata(&self) -> &IndexMetadata {
        &self.index.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> InMemoryIndex {
        let mut index = InMemoryIndex::new();
        index.add_text(DocId(1), FieldId(0), "test tent ten");
        index.add_text(DocId(2), FieldId(0), "test apple");
        index
    }

    #[test]
    fn test_navigator_walks_and_fails_permanently() {
        let index = sample_index();
        let mut navigator = index.create_navigator();

        assert!(navigator.process_text("te"));
        assert!(!navigator.process_char('x'));
        // failed until rewound
        assert!(!navigator.process_char('s'));
        assert!(navigator.next_characters().is_empty());
        assert!(!navigator.has_exact_matches());
    }

    #[test]
    fn test_bookmark_rewind_and_reuse() {
        let index = sample_index();
        let mut navigator = index.create_navigator();

        navigator.process_text("te");
        let at_te = navigator.create_bookmark();
        assert!(navigator.process_text("st"));
        assert!(navigator.has_exact_matches());

        navigator.apply_bookmark(at_te);
        assert_eq!(navigator.next_characters(), vec!['n', 's']);
        navigator.release_bookmark(at_te);

        // released slot is reused by the next bookmark
        let reused = navigator.create_bookmark();
        assert_eq!(reused, at_te);
    }

    #[test]
    fn test_exact_vs_descendant_matches() {
        let index = sample_index();
        let context = QueryContext::default();
        let mut navigator = index.create_navigator();

        navigator.process_text("ten");
        let exact = navigator.exact_matches(&context, 1.0);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact.matches()[0].document_id, DocId(1));

        // "ten" plus its descendant "tent"
        let with_descendants = navigator.exact_and_descendant_matches(&context, 1.0);
        let locations = with_descendants.matches()[0].field_matches[0].token_locations();
        assert_eq!(locations.len(), 2);
    }

    #[test]
    fn test_context_filters_apply_during_collection() {
        let index = sample_index();
        let mut navigator = index.create_navigator();
        navigator.process_text("test");

        let only_doc2 = QueryContext::for_documents([DocId(2)]);
        let result = navigator.exact_matches(&only_doc2, 1.0);
        let ids: Vec<DocId> = result.document_ids().collect();
        assert_eq!(ids, vec![DocId(2)]);

        let other_field = QueryContext::default().scoped_to_field(FieldId(7));
        assert!(navigator.exact_matches(&other_field, 1.0).is_empty());
    }

    #[test]
    fn test_add_text_records_offsets() {
        let mut index = InMemoryIndex::new();
        index.add_text(DocId(1), FieldId(0), "the cat sat");
        let mut navigator = index.create_navigator();
        navigator.process_text("cat");
        let result = navigator.exact_matches(&QueryContext::default(), 1.0);
        let locations = result.matches()[0].field_matches[0].token_locations();
        assert_eq!(locations, vec![TokenLocation::new(1, 4, 3)]);
    }
}
