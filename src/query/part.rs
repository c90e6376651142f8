use crate::core::error::{Error, Result};
use crate::core::types::FieldId;
use crate::index::navigator::NavigatorSource;
use crate::query::context::QueryContext;
use crate::results::intermediate::IntermediateQueryResult;
use crate::search::fuzzy::FuzzyMatchQueryPart;
use crate::search::wildcard::WildcardQueryPart;
use crate::search::word::WordQueryPart;

/// Default token-distance tolerance for the near operators
pub const DEFAULT_NEAR_TOLERANCE: u32 = 5;

/// A node of the parsed query tree. Evaluation is a fixed left-to-right walk;
/// there is no planner and no reordering.
#[derive(Debug, Clone)]
pub enum QueryPart {
    Word(WordQueryPart),
    Wildcard(WildcardQueryPart),
    Fuzzy(FuzzyMatchQueryPart),
    /// Both sides must match; merged with the intersect operator
    And(Box<QueryPart>, Box<QueryPart>),
    /// Either side may match; merged with the union operator
    Or(Box<QueryPart>, Box<QueryPart>),
    /// Left side matches except where the right side does
    AndNot(Box<QueryPart>, Box<QueryPart>),
    /// Both sides within `tolerance` tokens of each other, either order
    Near {
        left: Box<QueryPart>,
        right: Box<QueryPart>,
        tolerance: u32,
    },
    /// Left side at most `tolerance` tokens before the right side
    PrecedingNear {
        left: Box<QueryPart>,
        right: Box<QueryPart>,
        tolerance: u32,
    },
    /// Left side anywhere before the right side
    Preceding(Box<QueryPart>, Box<QueryPart>),
    /// A run of words matched as consecutive tokens
    AdjacentWords(Vec<QueryPart>),
    /// Restricts a child to one field and halves its weighting
    FieldFilter {
        field_id: FieldId,
        part: Box<QueryPart>,
    },
    /// Transparent grouping, kept so a tree can round-trip its source shape
    Bracketed(Box<QueryPart>),
    /// Always evaluates to the shared empty result
    Empty,
}

impl QueryPart {
    pub fn and(left: QueryPart, right: QueryPart) -> QueryPart {
        QueryPart::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: QueryPart, right: QueryPart) -> QueryPart {
        QueryPart::Or(Box::new(left), Box::new(right))
    }

    pub fn and_not(left: QueryPart, right: QueryPart) -> QueryPart {
        QueryPart::AndNot(Box::new(left), Box::new(right))
    }

    pub fn near(left: QueryPart, right: QueryPart, tolerance: u32) -> QueryPart {
        QueryPart::Near { left: Box::new(left), right: Box::new(right), tolerance }
    }

    pub fn preceding_near(left: QueryPart, right: QueryPart, tolerance: u32) -> QueryPart {
        QueryPart::PrecedingNear { left: Box::new(left), right: Box::new(right), tolerance }
    }

    pub fn preceding(left: QueryPart, right: QueryPart) -> QueryPart {
        QueryPart::Preceding(Box::new(left), Box::new(right))
    }

    pub fn adjacent_words(words: impl IntoIterator<Item = QueryPart>) -> QueryPart {
        QueryPart::AdjacentWords(words.into_iter().collect())
    }

    pub fn field_filter(field_id: FieldId, part: QueryPart) -> QueryPart {
        QueryPart::FieldFilter { field_id, part: Box::new(part) }
    }

    pub fn bracketed(part: QueryPart) -> QueryPart {
        QueryPart::Bracketed(Box::new(part))
    }

    /// Evaluates this part against an index snapshot, producing matches
    /// ordered ascending by document id
    pub fn evaluate(
        &self,
        source: &dyn NavigatorSource,
        context: &QueryContext,
    ) -> Result<IntermediateQueryResult> {
        match self {
            QueryPart::Word(word) => word.evaluate(source, context),
            QueryPart::Wildcard(wildcard) => wildcard.evaluate(source, context),
            QueryPart::Fuzzy(fuzzy) => fuzzy.evaluate(source, context),

            QueryPart::And(left, right) => {
                let left = left.evaluate(source, context)?;
                if left.is_empty() {
                    return Ok(left);
                }
                let right = right.evaluate(source, &context.narrowed_to_documents(&left))?;
                Ok(left.intersect(&right))
            }

            QueryPart::Or(left, right) => {
                let left = left.evaluate(source, context)?;
                let right = right.evaluate(source, context)?;
                Ok(left.union(&right))
            }

            QueryPart::AndNot(left, right) => {
                let left = left.evaluate(source, context)?;
                if left.is_empty() {
                    return Ok(left);
                }
                // the right side only matters where the left side matched
                let right = right.evaluate(source, &context.narrowed_to_documents(&left))?;
                Ok(left.except(&right))
            }

            QueryPart::Near { left, right, tolerance } => {
                let left = left.evaluate(source, context)?;
                if left.is_empty() {
                    return Ok(left);
                }
                let right = right.evaluate(source, &context.narrowed_to_documents(&left))?;
                Ok(left.composite_positional_intersect(&right, *tolerance, *tolerance))
            }

            QueryPart::PrecedingNear { left, right, tolerance } => {
                let left = left.evaluate(source, context)?;
                if left.is_empty() {
                    return Ok(left);
                }
                let right = right.evaluate(source, &context.narrowed_to_documents(&left))?;
                Ok(left.composite_positional_intersect(&right, 0, *tolerance))
            }

            QueryPart::Preceding(left, right) => {
                let left = left.evaluate(source, context)?;
                if left.is_empty() {
                    return Ok(left);
                }
                let right = right.evaluate(source, &context.narrowed_to_documents(&left))?;
                Ok(left.preceding_intersect(&right))
            }

            QueryPart::AdjacentWords(words) => {
                let Some(first) = words.first() else {
                    return Err(Error::invalid_argument(
                        "adjacent words operator requires at least one word",
                    ));
                };
                let mut result = first.evaluate(source, context)?;
                for word in &words[1..] {
                    if result.is_empty() {
                        break;
                    }
                    let next = word.evaluate(source, &context.narrowed_to_documents(&result))?;
                    result = result.composite_positional_intersect(&next, 0, 1);
                }
                Ok(result)
            }

            QueryPart::FieldFilter { field_id, part } => {
                part.evaluate(source, &context.scoped_to_field(*field_id))
            }

            QueryPart::Bracketed(part) => part.evaluate(source, context),

            QueryPart::Empty => Ok(IntermediateQueryResult::empty().clone()),
        }
    }

    /// Relative weighting of this part. Leaf parts memoize their
    /// navigator-driven computation; operator weightings are derived from
    /// their children on every call.
    pub fn weighting(&self, source: &dyn NavigatorSource) -> f64 {
        match self {
            QueryPart::Word(word) => word.weighting(source),
            QueryPart::Wildcard(wildcard) => wildcard.weighting(source),
            QueryPart::Fuzzy(fuzzy) => fuzzy.weighting(source),

            QueryPart::And(left, right)
            | QueryPart::Or(left, right)
            | QueryPart::Near { left, right, .. }
            | QueryPart::PrecedingNear { left, right, .. }
            | QueryPart::Preceding(left, right) => {
                (left.weighting(source) + right.weighting(source)) / 2.0
            }

            QueryPart::AndNot(left, _) => left.weighting(source),

            QueryPart::AdjacentWords(words) => {
                if words.is_empty() {
                    0.0
                } else {
                    words.iter().map(|w| w.weighting(source)).sum::<f64>() / words.len() as f64
                }
            }

            QueryPart::FieldFilter { part, .. } => part.weighting(source) / 2.0,

            QueryPart::Bracketed(part) => part.weighting(source),

            QueryPart::Empty => 0.0,
        }
    }
}

impl From<WordQueryPart> for QueryPart {
    fn from(part: WordQueryPart) -> Self {
        QueryPart::Word(part)
    }
}

impl From<WildcardQueryPart> for QueryPart {
    fn from(part: WildcardQueryPart) -> Self {
        QueryPart::Wildcard(part)
    }
}

impl From<FuzzyMatchQueryPart> for QueryPart {
    fn from(part: FuzzyMatchQueryPart) -> Self {
        QueryPart::Fuzzy(part)
    }
}
