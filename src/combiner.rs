//! Combines per-method scores into a single priority score.
//!
//! Orders that trip several independent methods are escalated through a
//! non-linear multiplier keyed by how many methods flagged.

use crate::methods::{Method, MethodCatalog};
use crate::scorers::{is_flagged, MAX_SCORE, MIN_SCORE};

/// Multiplier per flagged-method count, 0..=6.
pub const MULTIPLIERS: [f64; 7] = [0.0, 1.0, 1.3, 1.7, 2.2, 2.5, 3.0];

/// Weight of the data-quality penalty in the priority score.
pub const DQ_WEIGHT: f64 = 0.8;

pub fn multiplier(methods_count: usize) -> f64 {
    MULTIPLIERS[methods_count.min(MULTIPLIERS.len() - 1)]
}

/// Penalty for missing required fields: 10 at 0% completeness, 0 at 100%.
pub fn dq_risk(completeness: Option<f64>) -> f64 {
    match completeness {
        // 10 * (1 - c/100), written so whole percentages stay exact
        Some(c) if c.is_finite() => ((100.0 - c) / 10.0).clamp(MIN_SCORE, MAX_SCORE),
        _ => MIN_SCORE,
    }
}

pub fn priority_score(methods_total: f64, multiplier: f64, dq_risk: f64) -> f64 {
    methods_total * multiplier + dq_risk * DQ_WEIGHT
}

/// Full-precision combination for one order. Rounding is left to callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combined {
    pub methods_total: f64,
    pub methods_count: usize,
    pub multiplier: f64,
    pub dq_risk: f64,
    pub priority_score: f64,
}

/// `scores` is indexed by [`Method::index`].
pub fn combine(scores: &[f64; 6], catalog: &MethodCatalog, completeness: Option<f64>) -> Combined {
    let mut methods_total = 0.0;
    let mut methods_count = 0;
    for method in Method::ALL {
        let score = scores[method.index()];
        methods_total += score * catalog.weight(method);
        if is_flagged(score) {
            methods_count += 1;
        }
    }
    let multiplier = multiplier(methods_count);
    let dq_risk = dq_risk(completeness);
    Combined {
        methods_total,
        methods_count,
        multiplier,
        dq_risk,
        priority_score: priority_score(methods_total, multiplier, dq_risk),
    }
}
