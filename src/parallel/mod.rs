use rayon::prelude::*;
use crate::core::error::Result;
use crate::index::navigator::NavigatorSource;
use crate::query::context::QueryContext;
use crate::query::part::QueryPart;
use crate::results::intermediate::IntermediateQueryResult;

/// Evaluates independent query trees against one snapshot concurrently.
/// Safe because every evaluation drives its own navigators and the snapshot
/// is immutable; results come back in input order.
pub fn evaluate_batch<S>(
    source: &S,
    parts: &[QueryPart],
    context: &QueryContext,
) -> Vec<Result<IntermediateQueryResult>>
where
    S: NavigatorSource + Sync,
{
    parts
        .par_iter()
        .map(|part| part.evaluate(source, context))
        .collect()
}
