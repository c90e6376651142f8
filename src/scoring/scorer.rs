/// Scorer trait; implementations turn term statistics into a relevance score
pub trait Scorer: Send + Sync {
    fn score(&self, inputs: &TermScoreInputs) -> f64;

    fn name(&self) -> &str;
}

/// Statistics for one term in one document field
#[derive(Debug, Clone)]
pub struct TermScoreInputs {
    pub term_frequency: u32,        // occurrences in this document field
    pub matching_documents: u64,    // documents containing the term
    pub total_documents: u64,
    pub field_length: u32,          // tokens in this document field
    pub average_field_length: f64,  // average field length across documents
}

/// BM25 Scorer
pub struct Bm25Scorer {
    pub k1: f64,  // Term frequency saturation (default: 1.2)
    pub b: f64,   // Length normalization strength (default: 0.75)
}

impl Default for Bm25Scorer {
    fn default() -> Self {
        Bm25Scorer {
            k1: 1.2,
            b: 0.75,
        }
    }
}

impl Scorer for Bm25Scorer {
    fn score(&self, inputs: &TermScoreInputs) -> f64 {
        let tf = inputs.term_frequency as f64;
        let field_len = inputs.field_length as f64;
        let avg_field_len = if inputs.average_field_length > 0.0 {
            inputs.average_field_length
        } else {
            1.0
        };

        // IDF = log(1 + (N - df + 0.5) / (df + 0.5)), strictly positive even
        // for terms present in every document
        let n = inputs.total_documents as f64;
        let df = inputs.matching_documents as f64;
        let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();

        let numerator = idf * tf * (self.k1 + 1.0);
        let denominator = tf + self.k1 * (1.0 - self.b + self.b * (field_len / avg_field_len));

        numerator / denominator
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

/// Constant scorer, useful when ranking should reflect weighting alone
pub struct UniformScorer;

impl Scorer for UniformScorer {
    fn score(&self, _inputs: &TermScoreInputs) -> f64 {
        1.0
    }

    fn name(&self) -> &str {
        "uniform"
    }
}
