use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use wo_audit::category::RiskCategory;
use wo_audit::combiner::{multiplier, priority_score};
use wo_audit::empty::EmptyValueClassifier;
use wo_audit::scorers::linear_score;
use wo_audit::{Dataset, Method, Order, RiskEngine, SchemaCapabilities, Thresholds};

const EQUIPMENT: &[&str] = &["EQ001", "EQ002", "PUMP-7", "", "Н/Д", "0000", "n/a", "AB"];
const LOCATIONS: &[&str] = &["TM1", "TM2", "TM3"];
const STATUSES: &[&str] = &["ОТКР", "ЗАКР", "В работе", "TECO"];

fn order_strategy() -> impl Strategy<Value = Order> {
    (
        (
            proptest::option::of(0.0..500_000.0f64),
            proptest::option::of(0.0..800_000.0f64),
            0..EQUIPMENT.len(),
            0..LOCATIONS.len(),
            0..STATUSES.len(),
        ),
        (
            proptest::option::of(0u32..15),
            0.0..=100.0f64,
            1u32..=12,
            0i64..200,
            1u32..=12,
            0i64..200,
        ),
    )
        .prop_map(
            |((plan, fact, eq, loc, st), (returns, compl, pe_month, pdur, ae_month, adur))| {
                let planned_end = NaiveDate::from_ymd_opt(2024, pe_month, 15).unwrap_or_default();
                let actual_end = NaiveDate::from_ymd_opt(2024, ae_month, 20).unwrap_or_default();
                Order {
                    planned_cost: plan,
                    actual_cost: fact,
                    equipment_code: Some(EQUIPMENT[eq].to_string()),
                    location_code: Some(LOCATIONS[loc].to_string()),
                    status: Some(STATUSES[st].to_string()),
                    status_returns: returns,
                    completeness: Some(compl),
                    planned_start: Some(planned_end - Duration::days(pdur)),
                    planned_end: Some(planned_end),
                    actual_start: Some(actual_end - Duration::days(adur)),
                    actual_end: Some(actual_end),
                    ..Order::new("x")
                }
            },
        )
}

fn dataset_strategy() -> impl Strategy<Value = Dataset> {
    proptest::collection::vec(order_strategy(), 0..40)
        .prop_map(|orders| Dataset::new(orders, SchemaCapabilities::full()))
}

fn thresholds_strategy() -> impl Strategy<Value = Thresholds> {
    (1.0..100.0f64, 50.0..300.0f64, 1.0..20.0f64, 10.0..90.0f64, 1.0..10.0f64).prop_map(
        |(budget, location, equipment, year_end, returns)| {
            Thresholds::new()
                .with(Method::BudgetOverrun, budget)
                .with(Method::LocationAnomaly, location)
                .with(Method::ProblemEquipment, equipment)
                .with(Method::YearEndClosure, year_end)
                .with(Method::StatusReturns, returns)
        },
    )
}

proptest! {
    #[test]
    fn scores_are_bounded_and_flags_match(data in dataset_strategy(), t in thresholds_strategy()) {
        let run = RiskEngine::default().score_view(&data, &t);
        prop_assert_eq!(run.orders.len(), data.len());
        for o in &run.orders {
            for s in o.scores {
                prop_assert!((0.0..=10.0).contains(&s.score));
                prop_assert_eq!(s.flagged, s.score >= 5.0);
            }
            prop_assert!(o.methods_count <= 6);
            prop_assert_eq!(o.category, RiskCategory::from_priority(o.priority_score));
        }
    }

    #[test]
    fn linear_score_fixed_points(t in 0.001..1.0e6f64, v in -1.0e6..1.0e6f64) {
        prop_assert_eq!(linear_score(t, t), 5.0);
        prop_assert_eq!(linear_score(2.0 * t, t), 10.0);
        prop_assert_eq!(linear_score(0.0, t), 0.0);
        prop_assert_eq!(linear_score(v, 0.0), 0.0);
        prop_assert_eq!(linear_score(v, -t), 0.0);
        prop_assert!((0.0..=10.0).contains(&linear_score(v, t)));
    }

    #[test]
    fn mask_agrees_with_scalar_check(values in proptest::collection::vec(
        prop_oneof![
            (0..EQUIPMENT.len()).prop_map(|i| Some(EQUIPMENT[i].to_string())),
            ".{0,8}".prop_map(Some),
            Just(None),
        ],
        0..30,
    )) {
        let classifier = EmptyValueClassifier::default();
        let mask = classifier.mask(values.iter().map(|v| v.as_deref()));
        prop_assert_eq!(mask.len(), values.len());
        for (v, m) in values.iter().zip(mask) {
            prop_assert_eq!(classifier.is_empty(v.as_deref()), m);
        }
    }

    #[test]
    fn empty_equipment_never_scores(data in dataset_strategy(), t in 1.0..20.0f64) {
        let engine = RiskEngine::default();
        let run = engine.score_view(&data, &Thresholds::new().with(Method::ProblemEquipment, t));
        let classifier = engine.classifier();
        let mut empty = 0;
        for (order, scored) in data.orders.iter().zip(&run.orders) {
            if classifier.is_empty(order.equipment_code.as_deref()) {
                empty += 1;
                prop_assert_eq!(scored.score(Method::ProblemEquipment).score, 0.0);
            }
        }
        prop_assert_eq!(run.orders_without_equipment, empty);
    }

    /// Year-end closure takes a percentage ceiling, so it is made more
    /// sensitive by raising it; every other threshold by lowering it.
    #[test]
    fn methods_count_grows_as_methods_get_more_sensitive(
        data in dataset_strategy(),
        t in thresholds_strategy(),
        factor in 0.1..1.0f64,
    ) {
        let engine = RiskEngine::default();
        let tighter: Thresholds = Method::ALL
            .into_iter()
            .filter_map(|m| t.get(m).map(|v| (m, v)))
            .map(|(m, v)| match m {
                Method::YearEndClosure => (m, (v / factor).min(100.0)),
                _ => (m, v * factor),
            })
            .collect();
        let before = engine.score_view(&data, &t);
        let after = engine.score_view(&data, &tighter);
        for (a, b) in before.orders.iter().zip(&after.orders) {
            prop_assert!(b.methods_count >= a.methods_count);
        }
    }

    #[test]
    fn priority_is_monotone(
        total in 0.0..60.0f64,
        dq in 0.0..=10.0f64,
        count in 0usize..6,
        bump in 0.0..10.0f64,
    ) {
        let m = multiplier(count);
        let base = priority_score(total, m, dq);
        prop_assert!(priority_score(total + bump, m, dq) >= base);
        prop_assert!(priority_score(total, m, (dq + bump).min(10.0)) >= base);
        prop_assert!(priority_score(total, multiplier(count + 1), dq) >= base);
    }

    #[test]
    fn category_is_monotone(a in 0.0..50.0f64, b in 0.0..50.0f64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(RiskCategory::from_priority(lo) <= RiskCategory::from_priority(hi));
    }
}

#[test]
fn category_boundaries() {
    assert_eq!(RiskCategory::from_priority(1.0), RiskCategory::Watch);
    assert_eq!(RiskCategory::from_priority(4.0), RiskCategory::Elevated);
    assert_eq!(RiskCategory::from_priority(7.0), RiskCategory::Critical);
}

#[test]
fn budget_example() {
    let order = Order {
        planned_cost: Some(100_000.0),
        actual_cost: Some(130_000.0),
        completeness: Some(100.0),
        ..Order::new("1")
    };
    let data = Dataset::new(vec![order], SchemaCapabilities::full());
    let run = RiskEngine::default().score_view(&data, &Thresholds::new().with(Method::BudgetOverrun, 20.0));
    let s = run.orders[0].score(Method::BudgetOverrun);
    assert!((s.score - 7.5).abs() < 1e-9);
    assert!(s.flagged);
}

#[test]
fn repeated_blank_equipment_is_not_a_problem() {
    let orders = (0..10)
        .map(|i| Order {
            equipment_code: Some(String::new()),
            ..Order::new(i.to_string())
        })
        .collect();
    let data = Dataset::new(orders, SchemaCapabilities::full());
    let run = RiskEngine::default().score_view(&data, &Thresholds::new());
    assert!(run
        .orders
        .iter()
        .all(|o| o.score(Method::ProblemEquipment).score == 0.0));
    assert_eq!(run.orders_without_equipment, 10);
}
