use serde::{Serialize, Deserialize};
use crate::core::types::{DocId, FieldId};
use crate::results::location::{MatchLocation, TokenLocation};

/// Weighted set of match locations inside one field of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field_id: FieldId,
    pub score: f64,
    pub locations: Vec<MatchLocation>,
}

impl FieldMatch {
    /// Locations are sorted ascending by span and deduplicated
    pub fn new(field_id: FieldId, score: f64, mut locations: Vec<MatchLocation>) -> Self {
        locations.sort_by_key(MatchLocation::sort_key);
        locations.dedup();
        FieldMatch { field_id, score, locations }
    }

    pub fn min_token_index(&self) -> Option<u32> {
        self.locations.first().map(MatchLocation::min_token_index)
    }

    /// All primitive token locations, flattened out of any composites
    pub fn token_locations(&self) -> Vec<TokenLocation> {
        let mut out = Vec::new();
        for location in &self.locations {
            location.collect_token_locations(&mut out);
        }
        out.sort();
        out.dedup();
        out
    }
}

/// All field matches for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredToken {
    pub document_id: DocId,
    pub field_matches: Vec<FieldMatch>,
}

impl ScoredToken {
    /// Field matches are kept sorted ascending by field id, one per field
    pub fn new(document_id: DocId, mut field_matches: Vec<FieldMatch>) -> Self {
        field_matches.sort_by_key(|m| m.field_id);
        ScoredToken { document_id, field_matches }
    }

    pub fn score(&self) -> f64 {
        self.field_matches.iter().map(|m| m.score).sum()
    }

    pub fn field_match(&self, field_id: FieldId) -> Option<&FieldMatch> {
        self.field_matches.iter().find(|m| m.field_id == field_id)
    }
}
