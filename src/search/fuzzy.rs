use std::collections::HashSet;
use parking_lot::Mutex;
use crate::core::error::{Error, Result};
use crate::index::navigator::{Bookmark, DocumentMatchCollector, IndexNavigator, NavigatorSource};
use crate::query::context::QueryContext;
use crate::query::weighting::CachedWeighting;
use crate::results::intermediate::IntermediateQueryResult;

/// Fuzzy word matching: explores edit-distance variants of the target word
/// against the trie in lock-step generations.
///
/// Supported edits are substitution, insertion, deletion, and transposition
/// (an adjacent substitution pair that exactly reverses the previous one
/// counts as one Levenshtein edit, not two). A candidate is rejected once its
/// total edit count exceeds `max_edit_distance`, or once it accumulates more
/// than `max_sequential_edits` edits without an intervening exact character
/// match.
#[derive(Debug, Clone)]
pub struct FuzzyMatchQueryPart {
    word: String,
    chars: Vec<char>,
    max_edit_distance: u16,
    max_sequential_edits: u16,
    score_boost: f64,
    weighting: CachedWeighting,
}

#[derive(Debug, Clone, Copy)]
struct FuzzyMatchState {
    bookmark: Bookmark,
    /// Characters of the target word consumed so far
    word_index: u16,
    total_edits: u16,
    levenshtein: u16,
    sequential_edits: u16,
    last_substitution: Option<Substitution>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Substitution {
    expected: char,
    actual: char,
}

/// Double-buffered generation store plus the per-round visited set. Taken
/// from and returned to a shared pool per evaluate call.
#[derive(Debug, Default)]
struct FuzzyStateStore {
    current: Vec<FuzzyMatchState>,
    next: Vec<FuzzyMatchState>,
    visited: HashSet<(u16, u64)>,
}

static STATE_STORE_POOL: Mutex<Vec<FuzzyStateStore>> = Mutex::new(Vec::new());

fn take_store() -> FuzzyStateStore {
    STATE_STORE_POOL.lock().pop().unwrap_or_default()
}

fn return_store(mut store: FuzzyStateStore) {
    store.current.clear();
    store.next.clear();
    store.visited.clear();
    STATE_STORE_POOL.lock().push(store);
}

impl FuzzyMatchQueryPart {
    pub fn new(
        word: impl Into<String>,
        max_edit_distance: u16,
        max_sequential_edits: u16,
    ) -> Self {
        let word = word.into();
        let chars = word.chars().collect();
        FuzzyMatchQueryPart {
            word,
            chars,
            max_edit_distance,
            max_sequential_edits,
            score_boost: 1.0,
            weighting: CachedWeighting::new(),
        }
    }

    /// Tolerances derived from the word length
    pub fn with_default_tolerance(word: impl Into<String>) -> Self {
        let word = word.into();
        let len = word.chars().count() as u16;
        FuzzyMatchQueryPart::new(word, (len / 2).max(1), (len / 4).max(1))
    }

    pub fn with_score_boost(mut self, score_boost: f64) -> Self {
        self.score_boost = score_boost;
        self
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn evaluate(
        &self,
        source: &dyn NavigatorSource,
        context: &QueryContext,
    ) -> Result<IntermediateQueryResult> {
        if self.chars.is_empty() {
            return Err(Error::invalid_argument("fuzzy query part requires a non-empty word"));
        }

        let mut navigator = source.create_navigator();
        let navigator = navigator.as_mut();
        let mut store = take_store();
        let mut collector = DocumentMatchCollector::new();
        let word_len = self.chars.len() as u16;

        store.current.push(FuzzyMatchState {
            bookmark: navigator.create_bookmark(),
            word_index: 0,
            total_edits: 0,
            levenshtein: 0,
            sequential_edits: 0,
            last_substitution: None,
        });

        // Round n holds every state reachable in n generations; the buffers
        // swap each round, and states are only deduplicated against others in
        // the same round.
        let mut characters_consumed: u32 = 0;
        while !store.current.is_empty() {
            store.visited.clear();
            let mut current = std::mem::take(&mut store.current);
            for state in current.drain(..) {
                self.process_state(
                    navigator,
                    context,
                    &mut store,
                    &mut collector,
                    state,
                    characters_consumed,
                    word_len,
                );
            }
            std::mem::swap(&mut store.next, &mut current);
            store.current = current;
            characters_consumed += 1;
        }

        return_store(store);
        Ok(collector.into_result())
    }

    fn process_state(
        &self,
        navigator: &mut dyn IndexNavigator,
        context: &QueryContext,
        store: &mut FuzzyStateStore,
        collector: &mut DocumentMatchCollector,
        state: FuzzyMatchState,
        characters_consumed: u32,
        word_len: u16,
    ) {
        navigator.apply_bookmark(state.bookmark);

        if state.word_index == word_len {
            // A match assembled entirely from edits is no match at all
            if characters_consumed > state.total_edits as u32 && navigator.has_exact_matches() {
                let len = word_len as f64;
                let consumed = characters_consumed as f64;
                let weight = (len + consumed - state.levenshtein as f64) / (len + consumed);
                navigator.collect_exact_matches(context, weight * self.score_boost, collector);
            }

            // Deletion continuation: the indexed word may run longer than the
            // target, one extra character per edit
            for ch in navigator.next_characters() {
                navigator.apply_bookmark(state.bookmark);
                if navigator.process_char(ch) {
                    let bookmark = navigator.create_bookmark();
                    let key = navigator.position_key();
                    self.admit(
                        store,
                        navigator,
                        FuzzyMatchState {
                            bookmark,
                            word_index: state.word_index,
                            total_edits: state.total_edits + 1,
                            levenshtein: state.levenshtein + 1,
                            sequential_edits: state.sequential_edits + 1,
                            last_substitution: None,
                        },
                        key,
                    );
                }
            }
        } else {
            let target = self.chars[state.word_index as usize];
            let children = navigator.next_characters();

            if children.contains(&target) {
                navigator.apply_bookmark(state.bookmark);
                navigator.process_char(target);
                let bookmark = navigator.create_bookmark();
                let key = navigator.position_key();
                self.admit(
                    store,
                    navigator,
                    FuzzyMatchState {
                        bookmark,
                        word_index: state.word_index + 1,
                        total_edits: state.total_edits,
                        levenshtein: state.levenshtein,
                        sequential_edits: 0,
                        last_substitution: None,
                    },
                    key,
                );
            } else {
                // Insertion: the target word has a character the indexed word lacks
                navigator.apply_bookmark(state.bookmark);
                let bookmark = navigator.create_bookmark();
                let key = navigator.position_key();
                self.admit(
                    store,
                    navigator,
                    FuzzyMatchState {
                        bookmark,
                        word_index: state.word_index + 1,
                        total_edits: state.total_edits + 1,
                        levenshtein: state.levenshtein + 1,
                        sequential_edits: state.sequential_edits + 1,
                        last_substitution: None,
                    },
                    key,
                );

                // Deletion: the indexed word has a character the target lacks
                for ch in children.iter().copied() {
                    navigator.apply_bookmark(state.bookmark);
                    if navigator.process_char(ch) {
                        let bookmark = navigator.create_bookmark();
                        let key = navigator.position_key();
                        self.admit(
                            store,
                            navigator,
                            FuzzyMatchState {
                                bookmark,
                                word_index: state.word_index,
                                total_edits: state.total_edits + 1,
                                levenshtein: state.levenshtein + 1,
                                sequential_edits: state.sequential_edits + 1,
                                last_substitution: None,
                            },
                            key,
                        );
                    }
                }
            }

            // Substitutions along every branch other than the target's
            for ch in children.iter().copied().filter(|&c| c != target) {
                navigator.apply_bookmark(state.bookmark);
                if !navigator.process_char(ch) {
                    continue;
                }
                let transposed = state
                    .last_substitution
                    .is_some_and(|s| s.expected == ch && s.actual == target);
                let bookmark = navigator.create_bookmark();
                let key = navigator.position_key();
                self.admit(
                    store,
                    navigator,
                    FuzzyMatchState {
                        bookmark,
                        word_index: state.word_index + 1,
                        total_edits: state.total_edits + 1,
                        levenshtein: if transposed {
                            state.levenshtein
                        } else {
                            state.levenshtein + 1
                        },
                        sequential_edits: state.sequential_edits + 1,
                        last_substitution: if transposed {
                            None
                        } else {
                            Some(Substitution { expected: target, actual: ch })
                        },
                    },
                    key,
                );
            }
        }

        navigator.release_bookmark(state.bookmark);
    }

    /// Admits a generated state into the next round, or releases its bookmark
    /// immediately when it exceeds an edit budget or its (word index, trie
    /// position) pair was already reached this round.
    fn admit(
        &self,
        store: &mut FuzzyStateStore,
        navigator: &mut dyn IndexNavigator,
        state: FuzzyMatchState,
        position_key: u64,
    ) {
        if state.total_edits > self.max_edit_distance
            || state.sequential_edits > self.max_sequential_edits
            || !store.visited.insert((state.word_index, position_key))
        {
            navigator.release_bookmark(state.bookmark);
            return;
        }
        store.next.push(state);
    }

    /// Selectivity of the unedited target word, cached on the part instance
    pub fn weighting(&self, source: &dyn NavigatorSource) -> f64 {
        self.weighting.get_or_compute(|| {
            let mut navigator = source.create_navigator();
            let total = navigator.metadata().document_count().max(1);
            if navigator.process_text(&self.word) && navigator.has_exact_matches() {
                navigator.exact_matches(&QueryContext::new(), 1.0).len() as f64 / total as f64
            } else {
                0.5
            }
        })
    }
}
