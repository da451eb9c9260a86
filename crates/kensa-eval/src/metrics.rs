use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use kensa_core::error::{EvalError, Result};

use crate::report::TaskResult;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Round to 4 decimal places from the exact binary value of `x`, so
/// `0.00035` (stored just below the midpoint) becomes `0.0003`. Exact ties
/// go to even.
pub fn round4(x: f64) -> f64 {
    format!("{x:.4}").parse().unwrap_or(x)
}

/// Weights combining correctness and format compliance into a final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub correctness: f64,
    pub format: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            correctness: 0.8,
            format: 0.2,
        }
    }
}

impl ScoreWeights {
    /// Both weights must lie in `[0, 1]` and sum to 1.
    pub fn new(correctness: f64, format: f64) -> Result<Self> {
        let in_range = |w: f64| (0.0..=1.0).contains(&w);
        if !in_range(correctness)
            || !in_range(format)
            || ((correctness + format) - 1.0).abs() > WEIGHT_SUM_TOLERANCE
        {
            return Err(EvalError::InvalidWeights {
                correctness,
                format,
            }
            .into());
        }
        Ok(Self {
            correctness,
            format,
        })
    }

    /// Weights where format takes whatever correctness leaves.
    pub fn from_correctness(correctness: f64) -> Result<Self> {
        // Strip float noise so 0.8 yields 0.2 rather than 0.19999999999999996.
        let format = ((1.0 - correctness) * 1e12).round() / 1e12;
        Self::new(correctness, format)
    }

    /// Weighted final score, rounded to 4 decimals.
    pub fn combine(&self, correctness: f64, format: f64) -> f64 {
        round4(self.correctness * correctness + self.format * format)
    }
}

/// Per-category averages, each rounded to 4 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetrics {
    pub count: usize,
    pub avg_correctness: f64,
    pub avg_format: f64,
    pub avg_final: f64,
}

/// Aggregate view over one run's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub avg_final_score: f64,
    /// Keyed by category, in order of first appearance.
    pub category_metrics: IndexMap<String, CategoryMetrics>,
}

#[derive(Default)]
struct Totals {
    count: usize,
    correctness: f64,
    format: f64,
    final_score: f64,
}

impl Totals {
    fn add(&mut self, r: &TaskResult) {
        self.count += 1;
        self.correctness += r.correctness_score;
        self.format += r.format_score;
        self.final_score += r.final_score;
    }

    fn metrics(&self) -> CategoryMetrics {
        let n = self.count as f64;
        CategoryMetrics {
            count: self.count,
            avg_correctness: round4(self.correctness / n),
            avg_format: round4(self.format / n),
            avg_final: round4(self.final_score / n),
        }
    }
}

/// Overall mean final score plus per-category metrics.
///
/// An empty result set is an error rather than a NaN or zero average.
pub fn aggregate(results: &[TaskResult]) -> Result<Summary> {
    if results.is_empty() {
        return Err(EvalError::EmptyResults.into());
    }

    let mut overall = Totals::default();
    let mut buckets: IndexMap<&str, Totals> = IndexMap::new();
    for r in results {
        overall.add(r);
        buckets.entry(r.category.as_str()).or_default().add(r);
    }

    Ok(Summary {
        avg_final_score: overall.metrics().avg_final,
        category_metrics: buckets
            .into_iter()
            .map(|(category, totals)| (category.to_string(), totals.metrics()))
            .collect(),
    })
}
