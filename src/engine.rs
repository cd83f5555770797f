//! Risk-scoring engine.
//!
//! Scores are computed one method at a time across every order, then
//! combined row by row. The input dataset is only borrowed; all results
//! live in the returned [`ScoringRun`].

use serde::Serialize;
use tracing::{debug, info};

use crate::aggregates::{build_aggregates, Aggregates};
use crate::category::RiskCategory;
use crate::combiner::combine;
use crate::config::EngineConfig;
use crate::empty::EmptyValueClassifier;
use crate::methods::{Method, MethodCatalog, Thresholds};
use crate::scorers::{self, is_flagged};
use crate::types::Dataset;
use crate::util::{round2, round_to};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MethodScore {
    /// Score in [0, 10], rounded to 2 decimals.
    pub score: f64,
    /// Exactly `score >= 5.0`.
    pub flagged: bool,
}

impl MethodScore {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            flagged: is_flagged(score),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredOrder {
    /// Position of the order in the scored dataset.
    pub index: usize,
    pub id: String,
    /// Indexed by [`Method::index`].
    pub scores: [MethodScore; 6],
    pub methods_total: f64,
    pub methods_count: usize,
    pub multiplier: f64,
    pub dq_risk: f64,
    pub priority_score: f64,
    pub category: RiskCategory,
    /// `priority_score` rescaled by the maximum of this run into [0, 10].
    pub legacy_score: f64,
}

impl ScoredOrder {
    pub fn score(&self, method: Method) -> MethodScore {
        self.scores[method.index()]
    }

    pub fn flagged_methods(&self) -> impl Iterator<Item = Method> + '_ {
        Method::ALL.into_iter().filter(|m| self.score(*m).flagged)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringRun {
    pub orders: Vec<ScoredOrder>,
    /// Effective threshold per method for this run.
    pub thresholds: Thresholds,
    /// Orders the problem-equipment method skipped for empty equipment.
    pub orders_without_equipment: usize,
}

impl ScoringRun {
    pub fn max_priority(&self) -> f64 {
        self.orders
            .iter()
            .map(|o| o.priority_score)
            .fold(0.0, f64::max)
    }
}

/// Read-only engine state built once from configuration.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    catalog: MethodCatalog,
    classifier: EmptyValueClassifier,
    open_status_patterns: Vec<String>,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl RiskEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            catalog: config.catalog(),
            classifier: config.classifier(),
            open_status_patterns: config.open_status_patterns.clone(),
        }
    }

    pub fn catalog(&self) -> &MethodCatalog {
        &self.catalog
    }

    pub fn classifier(&self) -> &EmptyValueClassifier {
        &self.classifier
    }

    pub fn aggregates(&self, data: &Dataset) -> Aggregates {
        build_aggregates(data, &self.classifier)
    }

    /// Rebuild aggregates from `data` and score it.
    pub fn score_view(&self, data: &Dataset, thresholds: &Thresholds) -> ScoringRun {
        let agg = self.aggregates(data);
        self.score(data, &agg, thresholds)
    }

    pub fn score(&self, data: &Dataset, agg: &Aggregates, thresholds: &Thresholds) -> ScoringRun {
        let resolved: Thresholds = Method::ALL
            .into_iter()
            .map(|m| (m, thresholds.resolve(m, &self.catalog)))
            .collect();
        let threshold = |m: Method| resolved.resolve(m, &self.catalog);

        let equipment = scorers::score_problem_equipment(
            data,
            threshold(Method::ProblemEquipment),
            agg,
            &self.classifier,
        );
        let columns: [Vec<f64>; 6] = [
            scorers::score_budget_overrun(data, threshold(Method::BudgetOverrun)),
            scorers::score_location_anomaly(data, threshold(Method::LocationAnomaly), agg),
            scorers::score_unfinished_work(data, &self.open_status_patterns),
            equipment.scores,
            scorers::score_year_end_closure(data, threshold(Method::YearEndClosure)),
            scorers::score_status_returns(data, threshold(Method::StatusReturns)),
        ];

        for method in Method::ALL {
            let flagged = columns[method.index()]
                .iter()
                .filter(|s| is_flagged(round2(**s)))
                .count();
            debug!(
                method = method.id(),
                threshold = threshold(method),
                flagged,
                "method scored"
            );
        }

        let with_completeness = data.capabilities.completeness;
        let mut orders: Vec<ScoredOrder> = data
            .orders
            .iter()
            .enumerate()
            .map(|(i, order)| {
                // Flags and the methods count both read the stored 2 dp score.
                let stored: [f64; 6] = std::array::from_fn(|m| round2(columns[m][i]));
                let completeness = order.completeness.filter(|_| with_completeness);
                let combined = combine(&stored, &self.catalog, completeness);
                let priority_score = round2(combined.priority_score);
                ScoredOrder {
                    index: i,
                    id: order.id.clone(),
                    scores: stored.map(MethodScore::new),
                    methods_total: round2(combined.methods_total),
                    methods_count: combined.methods_count,
                    multiplier: combined.multiplier,
                    dq_risk: round2(combined.dq_risk),
                    priority_score,
                    category: RiskCategory::from_priority(priority_score),
                    legacy_score: 0.0,
                }
            })
            .collect();

        apply_legacy_scale(&mut orders);

        info!(
            orders = orders.len(),
            without_equipment = equipment.orders_without_equipment,
            "risk scoring complete"
        );

        ScoringRun {
            orders,
            thresholds: resolved,
            orders_without_equipment: equipment.orders_without_equipment,
        }
    }
}

/// Rescale priority scores into [0, 10] by the run's maximum.
///
/// The same absolute priority maps to different values under different
/// filters, since the maximum is taken over the current view only.
fn apply_legacy_scale(orders: &mut [ScoredOrder]) {
    let max = orders.iter().map(|o| o.priority_score).fold(0.0, f64::max);
    for o in orders.iter_mut() {
        o.legacy_score = if max > 0.0 {
            round_to(o.priority_score / max * 10.0, 1)
        } else {
            0.0
        };
    }
}
