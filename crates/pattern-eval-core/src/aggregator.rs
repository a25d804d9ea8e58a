//! Cross-pattern comparison.
//!
//! Ranks evaluated patterns independently on each dimension. Selection runs
//! on unrounded scores; the published scores are rounded like the metric
//! reports. Exact ties go to the pattern listed first.

use serde::{Deserialize, Serialize};

use crate::metrics::{round_to, PatternMetrics, PatternSummary};

/// Which end of a dimension's scale wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

impl Direction {
    fn beats(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::HigherIsBetter => candidate > incumbent,
            Direction::LowerIsBetter => candidate < incumbent,
        }
    }

    fn reversed(self) -> Self {
        match self {
            Direction::HigherIsBetter => Direction::LowerIsBetter,
            Direction::LowerIsBetter => Direction::HigherIsBetter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternScore {
    pub pattern: String,
    pub score: f64,
}

/// Best and worst pattern on one dimension, plus every pattern's score in
/// input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionRanking {
    pub metric: String,
    pub direction: Direction,
    pub scores: Vec<PatternScore>,
    pub best_pattern: String,
    pub best_score: f64,
    pub worst_pattern: String,
    pub worst_score: f64,
}

impl DimensionRanking {
    /// `None` for an empty input.
    fn rank(
        metric: &str,
        direction: Direction,
        places: i32,
        scores: &[(&str, f64)],
    ) -> Option<Self> {
        let (best_pattern, best_score) = select(scores, direction)?;
        let (worst_pattern, worst_score) = select(scores, direction.reversed())?;

        Some(Self {
            metric: metric.to_string(),
            direction,
            scores: scores
                .iter()
                .map(|(pattern, score)| PatternScore {
                    pattern: pattern.to_string(),
                    score: round_to(*score, places),
                })
                .collect(),
            best_pattern: best_pattern.to_string(),
            best_score: round_to(best_score, places),
            worst_pattern: worst_pattern.to_string(),
            worst_score: round_to(worst_score, places),
        })
    }
}

/// First entry that no later entry strictly beats.
fn select<'a>(scores: &[(&'a str, f64)], wanted: Direction) -> Option<(&'a str, f64)> {
    let mut iter = scores.iter().copied();
    let first = iter.next()?;
    Some(iter.fold(first, |incumbent, candidate| {
        if wanted.beats(candidate.1, incumbent.1) {
            candidate
        } else {
            incumbent
        }
    }))
}

/// Per-dimension winners and a flat summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternComparison {
    pub patterns: Vec<String>,
    #[serde(rename = "success_dimension")]
    pub success: DimensionRanking,
    #[serde(rename = "efficiency_dimension")]
    pub efficiency: DimensionRanking,
    #[serde(rename = "robustness_dimension")]
    pub robustness: DimensionRanking,
    #[serde(rename = "controllability_dimension")]
    pub controllability: DimensionRanking,
    pub summary_table: Vec<PatternSummary>,
}

pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Compare patterns on success (max strict rate), efficiency (min average
    /// latency), robustness (min degradation) and controllability (max
    /// overall score). `None` when `metrics` is empty.
    pub fn compare_patterns(metrics: &[PatternMetrics]) -> Option<PatternComparison> {
        let scores = |score: fn(&PatternMetrics) -> f64| {
            metrics
                .iter()
                .map(|m| (m.pattern_name.as_str(), score(m)))
                .collect::<Vec<_>>()
        };

        Some(PatternComparison {
            patterns: metrics.iter().map(|m| m.pattern_name.clone()).collect(),
            success: DimensionRanking::rank(
                "success_rate",
                Direction::HigherIsBetter,
                3,
                &scores(|m: &PatternMetrics| m.success.success_rate()),
            )?,
            efficiency: DimensionRanking::rank(
                "avg_latency_sec",
                Direction::LowerIsBetter,
                2,
                &scores(|m: &PatternMetrics| m.efficiency.avg_latency()),
            )?,
            robustness: DimensionRanking::rank(
                "degradation_percentage",
                Direction::LowerIsBetter,
                2,
                &scores(|m: &PatternMetrics| m.robustness.degradation_percentage),
            )?,
            controllability: DimensionRanking::rank(
                "overall_controllability",
                Direction::HigherIsBetter,
                3,
                &scores(|m: &PatternMetrics| m.controllability.overall_controllability()),
            )?,
            summary_table: Self::summary_table(metrics),
        })
    }

    /// One summary row per pattern, in input order.
    pub fn summary_table(metrics: &[PatternMetrics]) -> Vec<PatternSummary> {
        metrics.iter().map(PatternMetrics::summary).collect()
    }
}
