//! Merge operators over ordered result sets. All operators expect operands
//! sorted ascending by document id and preserve that order in O(n+m).

use std::cmp::Ordering;
use crate::results::intermediate::IntermediateQueryResult;
use crate::results::location::MatchLocation;
use crate::results::scored::{FieldMatch, ScoredToken};

pub fn union(
    left: &IntermediateQueryResult,
    right: &IntermediateQueryResult,
) -> IntermediateQueryResult {
    let l = left.matches();
    let r = right.matches();
    let mut out = Vec::with_capacity(l.len() + r.len());
    let (mut i, mut j) = (0, 0);

    while i < l.len() && j < r.len() {
        match l[i].document_id.cmp(&r[j].document_id) {
            Ordering::Less => {
                out.push(l[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                out.push(r[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                out.push(ScoredToken::new(
                    l[i].document_id,
                    union_fields(&l[i].field_matches, &r[j].field_matches),
                ));
                i += 1;
                j += 1;
            }
        }
    }

    out.extend_from_slice(&l[i..]);
    out.extend_from_slice(&r[j..]);
    IntermediateQueryResult::new(out)
}

pub fn intersect(
    left: &IntermediateQueryResult,
    right: &IntermediateQueryResult,
) -> IntermediateQueryResult {
    join_shared_documents(left, right, |l, r| {
        let mut fields = Vec::new();
        for_shared_fields(l, r, |lm, rm| {
            fields.push(FieldMatch::new(
                lm.field_id,
                lm.score + rm.score,
                merged_locations(&lm.locations, &rm.locations),
            ));
        });
        fields
    })
}

pub fn except(
    left: &IntermediateQueryResult,
    right: &IntermediateQueryResult,
) -> IntermediateQueryResult {
    let l = left.matches();
    let r = right.matches();
    let mut out = Vec::with_capacity(l.len());
    let mut j = 0;

    for token in l {
        while j < r.len() && r[j].document_id < token.document_id {
            j += 1;
        }
        if j >= r.len() || r[j].document_id != token.document_id {
            out.push(token.clone());
        }
    }

    IntermediateQueryResult::new(out)
}

pub fn preceding_intersect(
    left: &IntermediateQueryResult,
    right: &IntermediateQueryResult,
) -> IntermediateQueryResult {
    join_shared_documents(left, right, |l, r| {
        let mut fields = Vec::new();
        for_shared_fields(l, r, |lm, rm| {
            // Some left location must start before some right location, which
            // holds exactly when the earliest left start precedes the latest
            // right start.
            let earliest_left = lm.locations.iter().map(MatchLocation::min_token_index).min();
            let latest_right = rm.locations.iter().map(MatchLocation::min_token_index).max();
            if let (Some(earliest_left), Some(latest_right)) = (earliest_left, latest_right) {
                if earliest_left < latest_right {
                    fields.push(FieldMatch::new(
                        lm.field_id,
                        lm.score + rm.score,
                        merged_locations(&lm.locations, &rm.locations),
                    ));
                }
            }
        });
        fields
    })
}

pub fn composite_positional_intersect(
    left: &IntermediateQueryResult,
    right: &IntermediateQueryResult,
    left_tolerance: u32,
    right_tolerance: u32,
) -> IntermediateQueryResult {
    join_shared_documents(left, right, |l, r| {
        let mut fields = Vec::new();
        for_shared_fields(l, r, |lm, rm| {
            let mut composed = Vec::new();
            for left_location in &lm.locations {
                for right_location in &rm.locations {
                    let gap = right_location.min_token_index() as i64
                        - left_location.max_token_index() as i64;
                    if gap >= -(left_tolerance as i64) && gap <= right_tolerance as i64 {
                        composed.push(
                            left_location.clone().compose(right_location.clone()),
                        );
                    }
                }
            }
            if !composed.is_empty() {
                fields.push(FieldMatch::new(lm.field_id, lm.score + rm.score, composed));
            }
        });
        fields
    })
}

/// Merge-join over documents present in both operands. `join_fields` returns
/// the surviving field matches; documents with none are dropped.
fn join_shared_documents(
    left: &IntermediateQueryResult,
    right: &IntermediateQueryResult,
    mut join_fields: impl FnMut(&ScoredToken, &ScoredToken) -> Vec<FieldMatch>,
) -> IntermediateQueryResult {
    let l = left.matches();
    let r = right.matches();
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < l.len() && j < r.len() {
        match l[i].document_id.cmp(&r[j].document_id) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                let fields = join_fields(&l[i], &r[j]);
                if !fields.is_empty() {
                    out.push(ScoredToken::new(l[i].document_id, fields));
                }
                i += 1;
                j += 1;
            }
        }
    }

    IntermediateQueryResult::new(out)
}

/// Walks field matches shared by both tokens; both sides are field-sorted
fn for_shared_fields(
    left: &ScoredToken,
    right: &ScoredToken,
    mut visit: impl FnMut(&FieldMatch, &FieldMatch),
) {
    let (mut i, mut j) = (0, 0);
    let l = &left.field_matches;
    let r = &right.field_matches;

    while i < l.len() && j < r.len() {
        match l[i].field_id.cmp(&r[j].field_id) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                visit(&l[i], &r[j]);
                i += 1;
                j += 1;
            }
        }
    }
}

/// Union of two field-match lists: shared fields merge locations and sum
/// scores, one-sided fields pass through unchanged
fn union_fields(left: &[FieldMatch], right: &[FieldMatch]) -> Vec<FieldMatch> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        match left[i].field_id.cmp(&right[j].field_id) {
            Ordering::Less => {
                out.push(left[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                out.push(right[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                out.push(FieldMatch::new(
                    left[i].field_id,
                    left[i].score + right[j].score,
                    merged_locations(&left[i].locations, &right[j].locations),
                ));
                i += 1;
                j += 1;
            }
        }
    }

    out.extend_from_slice(&left[i..]);
    out.extend_from_slice(&right[j..]);
    out
}

fn merged_locations(left: &[MatchLocation], right: &[MatchLocation]) -> Vec<MatchLocation> {
    let mut out: Vec<MatchLocation> = left.iter().chain(right).cloned().collect();
    out.sort_by_key(MatchLocation::sort_key);
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DocId, FieldId};
    use crate::results::location::TokenLocation;

    fn location(token_index: u32) -> MatchLocation {
        MatchLocation::Single(TokenLocation::new(token_index, token_index * 5, 4))
    }

    fn result(entries: &[(u64, u16, f64, &[u32])]) -> IntermediateQueryResult {
        let mut tokens: Vec<ScoredToken> = Vec::new();
        for &(doc, field, score, indexes) in entries {
            let field_match = FieldMatch::new(
                FieldId(field),
                score,
                indexes.iter().map(|&i| location(i)).collect(),
            );
            match tokens.iter_mut().find(|t| t.document_id == DocId(doc)) {
                Some(token) => {
                    token.field_matches.push(field_match);
                    token.field_matches.sort_by_key(|m| m.field_id);
                }
                None => tokens.push(ScoredToken::new(DocId(doc), vec![field_match])),
            }
        }
        tokens.sort_by_key(|t| t.document_id);
        IntermediateQueryResult::new(tokens)
    }

    fn assert_ordered_no_duplicates(result: &IntermediateQueryResult) {
        let ids: Vec<DocId> = result.document_ids().collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(ids, sorted);
        for token in result.matches() {
            assert!(!token.field_matches.is_empty());
            for field_match in &token.field_matches {
                assert!(!field_match.locations.is_empty());
            }
        }
    }

    /// Shape of a result ignoring scores: (doc, field, flattened token indexes)
    fn shape(result: &IntermediateQueryResult) -> Vec<(u64, u16, Vec<u32>)> {
        result
            .matches()
            .iter()
            .flat_map(|t| {
                t.field_matches.iter().map(|m| {
                    (
                        t.document_id.value(),
                        m.field_id.value(),
                        m.token_locations().iter().map(|l| l.token_index).collect(),
                    )
                })
            })
            .collect()
    }

    #[test]
    fn test_union_merges_shared_fields_and_sums_scores() {
        let a = result(&[(1, 0, 1.0, &[2, 4]), (3, 0, 2.0, &[1])]);
        let b = result(&[(1, 0, 0.5, &[4, 7]), (2, 1, 1.0, &[0])]);

        let merged = a.union(&b);
        assert_ordered_no_duplicates(&merged);
        assert_eq!(
            shape(&merged),
            vec![
                (1, 0, vec![2, 4, 7]),
                (2, 1, vec![0]),
                (3, 0, vec![1]),
            ]
        );
        assert!((merged.matches()[0].score() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_union_commutative_as_sets() {
        let a = result(&[(1, 0, 1.0, &[2]), (5, 2, 0.5, &[8])]);
        let b = result(&[(1, 0, 0.25, &[3]), (4, 0, 1.0, &[1])]);
        assert_eq!(shape(&a.union(&b)), shape(&b.union(&a)));
    }

    #[test]
    fn test_intersect_keeps_only_shared_documents() {
        let a = result(&[(1, 0, 1.0, &[2]), (2, 0, 1.0, &[5])]);
        let b = result(&[(2, 0, 1.0, &[9]), (3, 0, 1.0, &[0])]);

        let merged = a.intersect(&b);
        assert_ordered_no_duplicates(&merged);
        assert_eq!(shape(&merged), vec![(2, 0, vec![5, 9])]);
    }

    #[test]
    fn test_intersect_drops_one_sided_fields() {
        // The document matches both sides, but in different fields: the
        // field-scoped join drops it entirely. Pinned behavior.
        let a = result(&[(7, 0, 1.0, &[1])]);
        let b = result(&[(7, 1, 1.0, &[2])]);
        assert!(a.intersect(&b).is_empty());

        // A shared field keeps the document even if another field is one-sided
        let c = result(&[(7, 0, 1.0, &[1]), (7, 1, 1.0, &[4])]);
        let d = result(&[(7, 1, 1.0, &[6])]);
        assert_eq!(shape(&c.intersect(&d)), vec![(7, 1, vec![4, 6])]);
    }

    #[test]
    fn test_intersect_commutative_as_sets() {
        let a = result(&[(1, 0, 1.0, &[2]), (2, 0, 1.0, &[5]), (2, 1, 1.0, &[7])]);
        let b = result(&[(2, 0, 1.0, &[9]), (2, 1, 1.0, &[1])]);
        assert_eq!(shape(&a.intersect(&b)), shape(&b.intersect(&a)));
    }

    #[test]
    fn test_except_subtracts_by_document_id() {
        let a = result(&[(1, 0, 1.0, &[2]), (2, 0, 1.0, &[5]), (3, 0, 1.0, &[7])]);
        let b = result(&[(2, 1, 1.0, &[0])]);

        let merged = a.except(&b);
        assert_ordered_no_duplicates(&merged);
        // subtraction is by document id, not by field or location
        assert_eq!(shape(&merged), vec![(1, 0, vec![2]), (3, 0, vec![7])]);
    }

    #[test]
    fn test_except_result_disjoint_from_right() {
        let a = result(&[(1, 0, 1.0, &[2]), (2, 0, 1.0, &[5])]);
        let b = result(&[(2, 0, 1.0, &[9]), (3, 0, 1.0, &[4])]);

        let left = a.except(&b);
        let right_ids: Vec<DocId> = b.document_ids().collect();
        assert!(left.document_ids().all(|id| !right_ids.contains(&id)));

        // anti-symmetric in general
        assert_ne!(shape(&a.except(&b)), shape(&b.except(&a)));
    }

    #[test]
    fn test_preceding_intersect_requires_left_before_right() {
        let a = result(&[(1, 0, 1.0, &[10])]);
        let b = result(&[(1, 0, 1.0, &[20])]);
        assert_eq!(shape(&a.preceding_intersect(&b)), vec![(1, 0, vec![10, 20])]);

        // reversed operands fail the precedence check
        assert!(b.preceding_intersect(&a).is_empty());
    }

    #[test]
    fn test_preceding_intersect_drops_mismatched_fields() {
        let a = result(&[(1, 0, 1.0, &[10])]);
        let b = result(&[(1, 1, 1.0, &[20])]);
        assert!(a.preceding_intersect(&b).is_empty());
    }

    #[test]
    fn test_positional_intersect_tolerance_boundary() {
        let a = result(&[(1, 0, 1.0, &[30])]);
        let b = result(&[(1, 0, 1.0, &[35])]);

        let within = a.composite_positional_intersect(&b, 0, 5);
        assert_eq!(within.len(), 1);
        let locations = &within.matches()[0].field_matches[0].locations;
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].min_token_index(), 30);
        assert_eq!(locations[0].max_token_index(), 35);

        let outside = a.composite_positional_intersect(&b, 0, 4);
        assert!(outside.is_empty());
    }

    #[test]
    fn test_positional_intersect_left_tolerance_allows_reversal() {
        let a = result(&[(1, 0, 1.0, &[12])]);
        let b = result(&[(1, 0, 1.0, &[9])]);

        assert!(a.composite_positional_intersect(&b, 2, 2).is_empty());
        let merged = a.composite_positional_intersect(&b, 3, 2);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.matches()[0].field_matches[0].locations[0].sort_key(), (9, 12));
    }

    #[test]
    fn test_positional_intersect_adjacency() {
        let a = result(&[(1, 0, 1.0, &[4])]);
        let b = result(&[(1, 0, 1.0, &[5])]);
        assert_eq!(a.composite_positional_intersect(&b, 0, 1).len(), 1);

        // same token index is within (0, 0) but a gap of one is not
        let c = result(&[(1, 0, 1.0, &[6])]);
        assert!(b.composite_positional_intersect(&c, 0, 0).is_empty());
    }

    #[test]
    fn test_positional_intersect_sums_scores_once_per_field() {
        let a = result(&[(1, 0, 2.0, &[10, 11])]);
        let b = result(&[(1, 0, 3.0, &[12])]);
        let merged = a.composite_positional_intersect(&b, 0, 2);
        // two pairs survive but the field score is summed once
        assert_eq!(merged.matches()[0].field_matches[0].locations.len(), 2);
        assert!((merged.matches()[0].score() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_operators_preserve_document_order() {
        let a = result(&[(1, 0, 1.0, &[1]), (4, 0, 1.0, &[2]), (9, 0, 1.0, &[3])]);
        let b = result(&[(2, 0, 1.0, &[1]), (4, 0, 1.0, &[4]), (8, 0, 1.0, &[5])]);

        for merged in [
            a.union(&b),
            a.intersect(&b),
            a.except(&b),
            a.preceding_intersect(&b),
            a.composite_positional_intersect(&b, 5, 5),
        ] {
            assert_ordered_no_duplicates(&merged);
        }
    }
}
