use crate::core::error::{Error, Result};
use crate::index::navigator::{Bookmark, DocumentMatchCollector, IndexNavigator, NavigatorSource};
use crate::query::context::QueryContext;
use crate::query::weighting::CachedWeighting;
use crate::results::intermediate::IntermediateQueryResult;

/// One fragment of a wildcard pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardFragment {
    /// A literal run of characters
    Text(String),
    /// Exactly one character (`%`)
    SingleCharacter,
    /// Zero or more characters (`*`)
    MultiCharacter,
}

/// Wildcard word matching: walks the pattern's fragments left to right over
/// a frontier of trie positions consistent with all fragments so far.
#[derive(Debug, Clone)]
pub struct WildcardQueryPart {
    fragments: Vec<WildcardFragment>,
    score_boost: f64,
    weighting: CachedWeighting,
}

impl WildcardQueryPart {
    /// Builds a part from raw fragments, normalizing and validating them.
    /// Runs of `MultiCharacter` collapse to one and adjacent `Text` fragments
    /// merge; a `MultiCharacter` may only be followed by `Text` or the end of
    /// the pattern.
    pub fn new(fragments: impl IntoIterator<Item = WildcardFragment>) -> Result<Self> {
        let fragments = normalize(fragments.into_iter().collect())?;
        Ok(WildcardQueryPart {
            fragments,
            score_boost: 1.0,
            weighting: CachedWeighting::new(),
        })
    }

    /// Builds a part from pattern text where `*` matches any run of
    /// characters and `%` matches exactly one
    pub fn parse(pattern: &str) -> Result<Self> {
        let mut fragments = Vec::new();
        let mut text = String::new();
        for ch in pattern.chars() {
            match ch {
                '*' | '%' => {
                    if !text.is_empty() {
                        fragments.push(WildcardFragment::Text(std::mem::take(&mut text)));
                    }
                    fragments.push(if ch == '*' {
                        WildcardFragment::MultiCharacter
                    } else {
                        WildcardFragment::SingleCharacter
                    });
                }
                _ => text.push(ch),
            }
        }
        if !text.is_empty() {
            fragments.push(WildcardFragment::Text(text));
        }
        WildcardQueryPart::new(fragments)
    }

    pub fn fragments(&self) -> &[WildcardFragment] {
        &self.fragments
    }

    pub fn with_score_boost(mut self, score_boost: f64) -> Self {
        self.score_boost = score_boost;
        self
    }

    pub fn evaluate(
        &self,
        source: &dyn NavigatorSource,
        context: &QueryContext,
    ) -> Result<IntermediateQueryResult> {
        let weighting = self.weighting(source) * self.score_boost;
        let mut navigator = source.create_navigator();
        let navigator = navigator.as_mut();
        let mut collector = DocumentMatchCollector::new();

        let mut frontier = vec![navigator.create_bookmark()];
        let mut next: Vec<Bookmark> = Vec::new();

        for (i, fragment) in self.fragments.iter().enumerate() {
            let is_last = i + 1 == self.fragments.len();

            match fragment {
                WildcardFragment::Text(text) => {
                    for bookmark in frontier.drain(..) {
                        navigator.apply_bookmark(bookmark);
                        let matched = navigator.process_text(text);
                        navigator.release_bookmark(bookmark);
                        if matched {
                            if is_last {
                                navigator.collect_exact_matches(context, weighting, &mut collector);
                            } else {
                                next.push(navigator.create_bookmark());
                            }
                        }
                    }
                }

                WildcardFragment::MultiCharacter if is_last => {
                    // prefix semantics: everything below the frontier matches
                    for bookmark in frontier.drain(..) {
                        navigator.apply_bookmark(bookmark);
                        navigator.collect_exact_and_descendant_matches(
                            context, weighting, &mut collector,
                        );
                        navigator.release_bookmark(bookmark);
                    }
                }

                WildcardFragment::MultiCharacter => {
                    let first_char = match &self.fragments[i + 1] {
                        WildcardFragment::Text(text) => text.chars().next().ok_or_else(|| {
                            Error::internal("empty text fragment survived normalization")
                        })?,
                        _ => {
                            return Err(Error::internal(
                                "multi-character fragment not followed by text",
                            ));
                        }
                    };
                    for bookmark in frontier.drain(..) {
                        explore_descendants(navigator, bookmark, first_char, &mut next);
                        navigator.release_bookmark(bookmark);
                    }
                }

                WildcardFragment::SingleCharacter if is_last => {
                    // exact matches exactly one level deeper
                    for bookmark in frontier.drain(..) {
                        navigator.apply_bookmark(bookmark);
                        for ch in navigator.next_characters() {
                            navigator.apply_bookmark(bookmark);
                            if navigator.process_char(ch) {
                                navigator.collect_exact_matches(context, weighting, &mut collector);
                            }
                        }
                        navigator.release_bookmark(bookmark);
                    }
                }

                WildcardFragment::SingleCharacter => {
                    // fan out over every immediate child
                    for bookmark in frontier.drain(..) {
                        navigator.apply_bookmark(bookmark);
                        for ch in navigator.next_characters() {
                            navigator.apply_bookmark(bookmark);
                            if navigator.process_char(ch) {
                                next.push(navigator.create_bookmark());
                            }
                        }
                        navigator.release_bookmark(bookmark);
                    }
                }
            }

            std::mem::swap(&mut frontier, &mut next);
            if frontier.is_empty() {
                break;
            }
        }

        for bookmark in frontier.drain(..) {
            navigator.release_bookmark(bookmark);
        }
        Ok(collector.into_result())
    }

    /// Selectivity of the leading literal when the pattern has one, cached on
    /// the part instance
    pub fn weighting(&self, source: &dyn NavigatorSource) -> f64 {
        self.weighting.get_or_compute(|| match self.fragments.first() {
            Some(WildcardFragment::Text(text)) => {
                let mut navigator = source.create_navigator();
                let total = navigator.metadata().document_count().max(1);
                if !navigator.process_text(text) {
                    return 0.0;
                }
                let matched =
                    navigator.exact_and_descendant_matches(&QueryContext::new(), 1.0);
                matched.len() as f64 / total as f64
            }
            _ => 0.5,
        })
    }
}

/// Explores every position in the subtree under `from` (including `from`
/// itself for the zero-length case) and emits a frontier bookmark wherever
/// the next character equals `first_char`.
fn explore_descendants(
    navigator: &mut dyn IndexNavigator,
    from: Bookmark,
    first_char: char,
    next: &mut Vec<Bookmark>,
) {
    navigator.apply_bookmark(from);
    let mut stack = vec![navigator.create_bookmark()];

    while let Some(bookmark) = stack.pop() {
        navigator.apply_bookmark(bookmark);
        let children = navigator.next_characters();

        if children.contains(&first_char) {
            navigator.apply_bookmark(bookmark);
            next.push(navigator.create_bookmark());
        }

        for ch in children {
            navigator.apply_bookmark(bookmark);
            if navigator.process_char(ch) {
                stack.push(navigator.create_bookmark());
            }
        }
        navigator.release_bookmark(bookmark);
    }
}

fn normalize(fragments: Vec<WildcardFragment>) -> Result<Vec<WildcardFragment>> {
    if fragments.is_empty() {
        return Err(Error::invalid_argument("wildcard pattern requires at least one fragment"));
    }

    let mut normalized: Vec<WildcardFragment> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        match fragment {
            WildcardFragment::Text(text) if text.is_empty() => {
                return Err(Error::parse("wildcard pattern contains an empty text fragment"));
            }
            // adjacent literals merge
            WildcardFragment::Text(text) => {
                if let Some(WildcardFragment::Text(previous)) = normalized.last_mut() {
                    previous.push_str(&text);
                } else {
                    normalized.push(WildcardFragment::Text(text));
                }
            }
            // runs of * collapse to one
            WildcardFragment::MultiCharacter
                if normalized.last() == Some(&WildcardFragment::MultiCharacter) => {}
            other => normalized.push(other),
        }
    }

    for (i, fragment) in normalized.iter().enumerate() {
        if *fragment == WildcardFragment::MultiCharacter
            && !matches!(
                normalized.get(i + 1),
                None | Some(WildcardFragment::Text(_))
            )
        {
            return Err(Error::parse(
                "a multi-character wildcard may only be followed by literal text or the end of the pattern",
            ));
        }
    }

    Ok(normalized)
}
