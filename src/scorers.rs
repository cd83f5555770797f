//! Method scorers.
//!
//! Each scorer makes one pass over the dataset and returns one score per
//! order, in order. Continuous methods share [`linear_score`]: the threshold
//! maps to 5.0 and twice the threshold to 10.0. A scorer that cannot evaluate
//! a row (column absent, value missing, undefined denominator) scores that
//! row 0.0 and never fails.

use crate::aggregates::{group_key, Aggregates};
use crate::empty::EmptyValueClassifier;
use crate::types::Dataset;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;
/// Score at which a method counts as triggered.
pub const FLAG_SCORE: f64 = 5.0;
/// Fixed score of a triggered binary method.
pub const BINARY_SCORE: f64 = 5.0;

pub fn linear_score(value: f64, threshold: f64) -> f64 {
    if !threshold.is_finite() || threshold <= 0.0 || !value.is_finite() {
        return MIN_SCORE;
    }
    (value / threshold * FLAG_SCORE).clamp(MIN_SCORE, MAX_SCORE)
}

pub fn is_flagged(score: f64) -> bool {
    score >= FLAG_SCORE
}

fn zeros(data: &Dataset) -> Vec<f64> {
    vec![MIN_SCORE; data.len()]
}

/// Overrun percentage `(actual/planned - 1) * 100`, floored at zero.
/// `None` when planned cost is missing or not positive.
pub fn overrun_pct(planned: Option<f64>, actual: Option<f64>) -> Option<f64> {
    let planned = planned.filter(|p| *p > 0.0)?;
    let actual = actual?;
    Some(((actual - planned) * 100.0 / planned).max(0.0))
}

pub fn score_budget_overrun(data: &Dataset, threshold: f64) -> Vec<f64> {
    let caps = &data.capabilities;
    if !(caps.planned_cost && caps.actual_cost) {
        return zeros(data);
    }
    data.orders
        .iter()
        .map(|o| match overrun_pct(o.planned_cost, o.actual_cost) {
            Some(pct) => linear_score(pct, threshold),
            None => MIN_SCORE,
        })
        .collect()
}

/// Actual cost against the location median scaled by `threshold` percent.
pub fn score_location_anomaly(data: &Dataset, threshold: f64, agg: &Aggregates) -> Vec<f64> {
    let caps = &data.capabilities;
    let Some(key) = caps.location else {
        return zeros(data);
    };
    if !caps.actual_cost || agg.median_cost_by_location.is_empty() {
        return zeros(data);
    }
    let coeff = threshold / 100.0;
    data.orders
        .iter()
        .map(|o| {
            let median = group_key(o.location_ref(key))
                .and_then(|k| agg.median_cost_by_location.get(k).copied());
            match (median, o.actual_cost) {
                (Some(median), Some(actual)) => linear_score(actual, median * coeff),
                _ => MIN_SCORE,
            }
        })
        .collect()
}

pub fn is_open_status(status: &str, patterns: &[String]) -> bool {
    patterns
        .iter()
        .filter(|p| !p.trim().is_empty())
        .any(|p| status.contains(p.as_str()))
}

/// Binary: an open status scores [`BINARY_SCORE`], anything else 0.
pub fn score_unfinished_work(data: &Dataset, patterns: &[String]) -> Vec<f64> {
    if !data.capabilities.status {
        return zeros(data);
    }
    data.orders
        .iter()
        .map(|o| match o.status.as_deref() {
            Some(s) if is_open_status(s, patterns) => BINARY_SCORE,
            _ => MIN_SCORE,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentScores {
    pub scores: Vec<f64>,
    /// Rows skipped because their equipment reference is empty.
    pub orders_without_equipment: usize,
}

/// Orders sharing the row's equipment, counted over valid equipment only.
/// Rows with an empty reference score 0 whatever their literal value.
pub fn score_problem_equipment(
    data: &Dataset,
    threshold: f64,
    agg: &Aggregates,
    classifier: &EmptyValueClassifier,
) -> EquipmentScores {
    let Some(key) = data.capabilities.equipment else {
        return EquipmentScores {
            scores: zeros(data),
            orders_without_equipment: 0,
        };
    };
    let empty = classifier.mask(data.orders.iter().map(|o| o.equipment_ref(key)));
    let orders_without_equipment = empty.iter().filter(|e| **e).count();
    let scores = data
        .orders
        .iter()
        .zip(&empty)
        .map(|(o, is_empty)| {
            if *is_empty {
                return MIN_SCORE;
            }
            let count = group_key(o.equipment_ref(key))
                .and_then(|k| agg.count_by_equipment.get(k).copied())
                .unwrap_or(0);
            linear_score(count as f64, threshold)
        })
        .collect();
    EquipmentScores {
        scores,
        orders_without_equipment,
    }
}

const DECEMBER: u32 = 12;

/// Closed in December against a non-December plan, with the actual duration
/// under `threshold` percent of the planned one. Scored on planned/actual
/// duration with `100 / threshold` as the 5.0 point, so the gate boundary
/// is where the score reaches 5.0.
pub fn score_year_end_closure(data: &Dataset, threshold: f64) -> Vec<f64> {
    let caps = &data.capabilities;
    if !(caps.planned_dates && caps.actual_dates) || !threshold.is_finite() || threshold <= 0.0 {
        return zeros(data);
    }
    let coeff = threshold / 100.0;
    data.orders
        .iter()
        .map(|o| {
            let (Some(actual_month), Some(planned_month)) =
                (o.actual_end_month(), o.planned_end_month())
            else {
                return MIN_SCORE;
            };
            let (Some(planned), Some(actual)) =
                (o.planned_duration_days(), o.actual_duration_days())
            else {
                return MIN_SCORE;
            };
            let gated = actual_month == DECEMBER
                && planned_month != DECEMBER
                && planned > 0.0
                && actual >= 0.0
                && actual < planned * coeff;
            // Zero actual duration leaves the speed ratio undefined.
            if !gated || actual == 0.0 {
                return MIN_SCORE;
            }
            linear_score(planned / actual, 1.0 / coeff)
        })
        .collect()
}

pub fn score_status_returns(data: &Dataset, threshold: f64) -> Vec<f64> {
    if !data.capabilities.status_returns {
        return zeros(data);
    }
    data.orders
        .iter()
        .map(|o| match o.status_returns {
            Some(n) => linear_score(n as f64, threshold),
            None => MIN_SCORE,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregates::build_aggregates;
    use crate::types::{Order, SchemaCapabilities};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn costs(planned: f64, actual: f64) -> Order {
        Order {
            planned_cost: Some(planned),
            actual_cost: Some(actual),
            ..Order::new("x")
        }
    }

    #[test]
    fn linear_score_fixed_points() {
        assert_eq!(linear_score(20.0, 20.0), 5.0);
        assert_eq!(linear_score(40.0, 20.0), 10.0);
        assert_eq!(linear_score(10.0, 20.0), 2.5);
        assert_eq!(linear_score(0.0, 20.0), 0.0);
        assert_eq!(linear_score(60.0, 20.0), 10.0);
        assert_eq!(linear_score(-5.0, 20.0), 0.0);
        assert_eq!(linear_score(10.0, 0.0), 0.0);
        assert_eq!(linear_score(10.0, -3.0), 0.0);
        assert_eq!(linear_score(f64::NAN, 3.0), 0.0);
    }

    #[test]
    fn budget_overrun_example() {
        let data = Dataset::new(vec![costs(100_000.0, 130_000.0)], SchemaCapabilities::full());
        let scores = score_budget_overrun(&data, 20.0);
        assert!((scores[0] - 7.5).abs() < 1e-9);
        assert!(is_flagged(scores[0]));
    }

    #[test]
    fn budget_overrun_edge_cases() {
        let data = Dataset::new(
            vec![
                costs(0.0, 10_000.0),
                costs(80_000.0, 60_000.0),
                Order {
                    planned_cost: Some(100.0),
                    ..Order::new("no-actual")
                },
            ],
            SchemaCapabilities::full(),
        );
        assert_eq!(score_budget_overrun(&data, 20.0), vec![0.0, 0.0, 0.0]);
        assert_eq!(score_budget_overrun(&data, 0.0), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn location_anomaly_against_median() {
        let mk = |id: &str, loc: &str, actual: f64| Order {
            location_code: Some(loc.to_string()),
            actual_cost: Some(actual),
            ..Order::new(id)
        };
        let data = Dataset::new(
            vec![
                mk("1", "TM1", 100_000.0),
                mk("2", "TM1", 60_000.0),
                mk("3", "TM1", 150_000.0),
                mk("4", "TM2", 0.0),
                mk("5", "TM2", 0.0),
            ],
            SchemaCapabilities::full(),
        );
        let agg = build_aggregates(&data, &EmptyValueClassifier::default());
        let scores = score_location_anomaly(&data, 100.0, &agg);
        assert_eq!(scores[0], 5.0);
        assert_eq!(scores[1], 3.0);
        assert_eq!(scores[2], 7.5);
        // zero median is an undefined denominator
        assert_eq!(scores[3], 0.0);
    }

    #[test]
    fn location_anomaly_without_history_scores_zero() {
        let data = Dataset::new(vec![costs(1.0, 2.0)], SchemaCapabilities::full());
        let scores = score_location_anomaly(&data, 140.0, &Aggregates::default());
        assert_eq!(scores, vec![0.0]);
    }

    #[test]
    fn unfinished_work_is_binary() {
        let patterns: Vec<String> = vec!["ОТКР".into(), "В работе".into(), "REL".into()];
        let mk = |s: Option<&str>| Order {
            status: s.map(str::to_string),
            ..Order::new("x")
        };
        let data = Dataset::new(
            vec![mk(Some("ОТКР РАСЧ")), mk(Some("ЗАКР")), mk(Some("В работе")), mk(None), mk(Some("REL PRC"))],
            SchemaCapabilities::full(),
        );
        assert_eq!(
            score_unfinished_work(&data, &patterns),
            vec![5.0, 0.0, 5.0, 0.0, 5.0]
        );
    }

    #[test]
    fn empty_equipment_never_scores() {
        let mut orders: Vec<Order> = (0..10)
            .map(|i| Order {
                equipment_code: Some(String::new()),
                ..Order::new(i.to_string())
            })
            .collect();
        orders.push(Order {
            equipment_code: Some("EQ001".to_string()),
            ..Order::new("real")
        });
        let data = Dataset::new(orders, SchemaCapabilities::full());
        let classifier = EmptyValueClassifier::default();
        // Even a hand-built aggregate that counts the blank key is ignored.
        let mut agg = build_aggregates(&data, &classifier);
        agg.count_by_equipment.insert(String::new(), 10);

        let result = score_problem_equipment(&data, 5.0, &agg, &classifier);
        assert!(result.scores[..10].iter().all(|s| *s == 0.0));
        assert_eq!(result.scores[10], 1.0);
        assert_eq!(result.orders_without_equipment, 10);
    }

    #[test]
    fn problem_equipment_counts_shared_units() {
        let orders: Vec<Order> = (0..5)
            .map(|i| Order {
                equipment_code: Some("PUMP-7".to_string()),
                ..Order::new(i.to_string())
            })
            .collect();
        let data = Dataset::new(orders, SchemaCapabilities::full());
        let classifier = EmptyValueClassifier::default();
        let agg = build_aggregates(&data, &classifier);
        let result = score_problem_equipment(&data, 5.0, &agg, &classifier);
        assert!(result.scores.iter().all(|s| *s == 5.0));
        assert_eq!(result.orders_without_equipment, 0);
    }

    #[test]
    fn problem_equipment_absent_column() {
        let data = Dataset::new(
            vec![Order::new("1")],
            SchemaCapabilities {
                equipment: None,
                ..SchemaCapabilities::full()
            },
        );
        let result = score_problem_equipment(
            &data,
            5.0,
            &Aggregates::default(),
            &EmptyValueClassifier::default(),
        );
        assert_eq!(result.scores, vec![0.0]);
        assert_eq!(result.orders_without_equipment, 0);
    }

    fn closure(planned_end: (i32, u32, u32), planned_days: i64, actual_end: (i32, u32, u32), actual_days: i64) -> Order {
        let pe = date(planned_end.0, planned_end.1, planned_end.2).unwrap();
        let ae = date(actual_end.0, actual_end.1, actual_end.2).unwrap();
        Order {
            planned_start: Some(pe - chrono::Duration::days(planned_days)),
            planned_end: Some(pe),
            actual_start: Some(ae - chrono::Duration::days(actual_days)),
            actual_end: Some(ae),
            ..Order::new("x")
        }
    }

    #[test]
    fn year_end_closure_scoring() {
        let data = Dataset::new(
            vec![
                // Dec close, March plan, 30 of 180 days: ratio 6 -> 6 / 2 * 5 = 15 -> 10
                closure((2024, 3, 15), 180, (2024, 12, 20), 30),
                // planned in June, same duration: not fast enough
                closure((2024, 6, 15), 120, (2024, 12, 15), 120),
                // planned end also December
                closure((2024, 12, 1), 90, (2024, 12, 28), 15),
                // not a December close
                closure((2024, 6, 30), 200, (2024, 11, 10), 40),
                // 80 of 200 days at 50%: ratio 2.5 -> 6.25
                closure((2024, 6, 30), 200, (2024, 12, 31), 80),
                // zero-day closure leaves the ratio undefined
                closure((2024, 6, 30), 200, (2024, 12, 31), 0),
            ],
            SchemaCapabilities::full(),
        );
        let scores = score_year_end_closure(&data, 50.0);
        assert_eq!(scores, vec![10.0, 0.0, 0.0, 0.0, 6.25, 0.0]);
        assert_eq!(score_year_end_closure(&data, 0.0), vec![0.0; 6]);
    }

    #[test]
    fn status_returns_scoring_and_legacy_schema() {
        let mk = |n: Option<u32>| Order {
            status_returns: n,
            ..Order::new("x")
        };
        let mut data = Dataset::new(
            vec![mk(Some(0)), mk(Some(3)), mk(Some(8)), mk(None)],
            SchemaCapabilities::full(),
        );
        assert_eq!(score_status_returns(&data, 3.0), vec![0.0, 5.0, 10.0, 0.0]);

        data.capabilities.status_returns = false;
        assert_eq!(score_status_returns(&data, 3.0), vec![0.0; 4]);
    }
}
