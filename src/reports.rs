use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tabled::Tabled;

use crate::aggregates::Aggregates;
use crate::category::RiskCategory;
use crate::empty::EmptyValueClassifier;
use crate::engine::{ScoredOrder, ScoringRun};
use crate::loader::{required_fields, REQUIRED_FIELDS};
use crate::methods::{Method, MethodCatalog};
use crate::types::{Dataset, Order};
use crate::util::{average, format_number, round2};

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MethodSummaryRow {
    #[serde(rename = "Method")]
    #[tabled(rename = "Method")]
    pub method: String,
    #[serde(rename = "Title")]
    #[tabled(rename = "Title")]
    pub title: String,
    #[serde(rename = "Triggered")]
    #[tabled(rename = "Triggered")]
    pub triggered: usize,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct")]
    pub share_pct: String,
    #[serde(rename = "TriggeredActualCost")]
    #[tabled(rename = "TriggeredActualCost")]
    pub triggered_cost: String,
    #[serde(rename = "AvgScore")]
    #[tabled(rename = "AvgScore")]
    pub avg_score: String,
    #[serde(rename = "Threshold")]
    #[tabled(rename = "Threshold")]
    pub threshold: String,
    #[serde(rename = "Weight")]
    #[tabled(rename = "Weight")]
    pub weight: String,
    #[serde(rename = "WithoutEquipment")]
    #[tabled(rename = "WithoutEquipment")]
    pub without_equipment: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CategoryCountRow {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Color")]
    #[tabled(rename = "Color")]
    pub color: String,
    #[serde(rename = "Orders")]
    #[tabled(rename = "Orders")]
    pub orders: usize,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct")]
    pub share_pct: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopOrderRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Order")]
    #[tabled(rename = "Order")]
    pub id: String,
    #[serde(rename = "Description")]
    #[tabled(rename = "Description")]
    pub description: String,
    #[serde(rename = "Priority")]
    #[tabled(rename = "Priority")]
    pub priority_score: String,
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Methods")]
    #[tabled(rename = "Methods")]
    pub methods_count: usize,
    #[serde(rename = "Triggered")]
    #[tabled(rename = "Triggered")]
    pub triggered: String,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct GroupCountRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Orders")]
    #[tabled(rename = "Orders")]
    pub orders: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct FieldQualityRow {
    #[serde(rename = "Field")]
    #[tabled(rename = "Field")]
    pub field: String,
    #[serde(rename = "Filled")]
    #[tabled(rename = "Filled")]
    pub filled: usize,
    #[serde(rename = "Empty")]
    #[tabled(rename = "Empty")]
    pub empty: usize,
    #[serde(rename = "EmptyPct")]
    #[tabled(rename = "EmptyPct")]
    pub empty_pct: f64,
}

/// Fill statistics over the required fields of a view.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct QualityReport {
    pub total_rows: usize,
    pub total_fields: usize,
    /// Fields more than [`PROBLEM_EMPTY_PCT`] percent empty.
    pub problem_fields: usize,
    pub fill_rate: f64,
    pub fields: Vec<FieldQualityRow>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct EquipmentReport {
    pub distinct_equipment: usize,
    pub orders_with_equipment: usize,
    pub orders_without_equipment: usize,
    pub top: Vec<GroupCountRow>,
}

pub const PROBLEM_EMPTY_PCT: f64 = 30.0;

/// One line of `scored_orders.csv`. Scores carry the engine's 2 dp value.
#[derive(Debug, Serialize, Clone)]
pub struct ScoredOrderRow {
    pub id: String,
    pub description: String,
    pub work_type: String,
    pub location: String,
    pub equipment: String,
    pub status: String,
    pub budget_overrun: f64,
    pub budget_overrun_flag: bool,
    pub location_anomaly: f64,
    pub location_anomaly_flag: bool,
    pub unfinished_work: f64,
    pub unfinished_work_flag: bool,
    pub problem_equipment: f64,
    pub problem_equipment_flag: bool,
    pub year_end_closure: f64,
    pub year_end_closure_flag: bool,
    pub status_returns: f64,
    pub status_returns_flag: bool,
    pub methods_total: f64,
    pub methods_count: usize,
    pub multiplier: f64,
    pub dq_risk: f64,
    pub priority_score: f64,
    pub risk_category: RiskCategory,
    pub legacy_score: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct KpiSummary {
    pub total_orders: usize,
    /// Orders with a priority score above zero.
    pub risk_orders: usize,
    pub risk_pct: f64,
    pub priority_sum: f64,
    pub priority_avg: f64,
    pub max_priority: f64,
    pub orders_without_equipment: usize,
    pub by_category: BTreeMap<RiskCategory, usize>,
    pub thresholds: BTreeMap<&'static str, f64>,
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn text(v: Option<&str>) -> String {
    v.unwrap_or_default().to_string()
}

fn order_of<'a>(data: &'a Dataset, scored: &ScoredOrder) -> Option<&'a Order> {
    data.orders.get(scored.index)
}

pub fn method_summary(run: &ScoringRun, data: &Dataset, catalog: &MethodCatalog) -> Vec<MethodSummaryRow> {
    let total = run.orders.len();
    Method::ALL
        .into_iter()
        .map(|method| {
            let def = catalog.get(method);
            let scores: Vec<f64> = run.orders.iter().map(|o| o.score(method).score).collect();
            let triggered: Vec<&ScoredOrder> =
                run.orders.iter().filter(|o| o.score(method).flagged).collect();
            let triggered_cost: f64 = triggered
                .iter()
                .filter_map(|o| order_of(data, o).and_then(|ord| ord.actual_cost))
                .sum();
            let threshold = if def.adjustable {
                format_number(run.thresholds.resolve(method, catalog), 2)
            } else {
                "-".to_string()
            };
            let without_equipment = match method {
                Method::ProblemEquipment => run.orders_without_equipment.to_string(),
                _ => "-".to_string(),
            };
            MethodSummaryRow {
                method: method.id().to_string(),
                title: def.title.to_string(),
                triggered: triggered.len(),
                share_pct: format_number(pct(triggered.len(), total), 2),
                triggered_cost: format_number(triggered_cost, 2),
                avg_score: format_number(average(&scores), 2),
                threshold,
                weight: format_number(def.weight, 2),
                without_equipment,
            }
        })
        .collect()
}

pub fn category_counts(run: &ScoringRun) -> Vec<CategoryCountRow> {
    let total = run.orders.len();
    RiskCategory::ALL
        .into_iter()
        .map(|c| {
            let n = run.orders.iter().filter(|o| o.category == c).count();
            CategoryCountRow {
                category: c.to_string(),
                color: c.color().to_string(),
                orders: n,
                share_pct: format_number(pct(n, total), 2),
            }
        })
        .collect()
}

pub fn kpi_summary(run: &ScoringRun) -> KpiSummary {
    let total_orders = run.orders.len();
    let priorities: Vec<f64> = run.orders.iter().map(|o| o.priority_score).collect();
    let risk_orders = priorities.iter().filter(|p| **p > 0.0).count();
    let mut by_category: BTreeMap<RiskCategory, usize> =
        RiskCategory::ALL.into_iter().map(|c| (c, 0)).collect();
    for o in &run.orders {
        *by_category.entry(o.category).or_default() += 1;
    }
    KpiSummary {
        total_orders,
        risk_orders,
        risk_pct: round2(pct(risk_orders, total_orders)),
        priority_sum: round2(priorities.iter().sum()),
        priority_avg: round2(average(&priorities)),
        max_priority: run.max_priority(),
        orders_without_equipment: run.orders_without_equipment,
        by_category,
        thresholds: Method::ALL
            .into_iter()
            .filter_map(|m| run.thresholds.get(m).map(|t| (m.id(), t)))
            .collect(),
    }
}

/// Highest-priority orders first; ties keep dataset order.
pub fn top_priority(run: &ScoringRun, data: &Dataset, n: usize) -> Vec<TopOrderRow> {
    let mut ranked: Vec<&ScoredOrder> = run.orders.iter().collect();
    ranked.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(Ordering::Equal)
    });
    ranked
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, o)| TopOrderRow {
            rank: i + 1,
            id: o.id.clone(),
            description: text(order_of(data, o).and_then(|ord| ord.description.as_deref())),
            priority_score: format_number(o.priority_score, 2),
            category: o.category.to_string(),
            methods_count: o.methods_count,
            triggered: o.flagged_methods().map(Method::id).collect::<Vec<_>>().join(", "),
        })
        .collect()
}

/// Largest groups first, then by name.
pub fn group_counts(counts: &HashMap<String, usize>, n: usize) -> Vec<GroupCountRow> {
    let mut rows: Vec<GroupCountRow> = counts
        .iter()
        .map(|(k, v)| GroupCountRow {
            group: k.clone(),
            orders: *v,
        })
        .collect();
    rows.sort_by(|a, b| b.orders.cmp(&a.orders).then_with(|| a.group.cmp(&b.group)));
    rows.truncate(n);
    rows
}

/// Per-field fill counts, most-empty field first. A field is filled under
/// the same rule that drives the per-order completeness percentage.
pub fn quality_report(data: &Dataset) -> QualityReport {
    let total_rows = data.orders.len();
    let mut filled = [0usize; REQUIRED_FIELDS];
    let mut names = [""; REQUIRED_FIELDS];
    for order in &data.orders {
        for (i, (name, is_filled)) in required_fields(order).into_iter().enumerate() {
            names[i] = name;
            if is_filled {
                filled[i] += 1;
            }
        }
    }
    if total_rows == 0 {
        return QualityReport {
            total_rows,
            total_fields: REQUIRED_FIELDS,
            problem_fields: 0,
            fill_rate: 0.0,
            fields: Vec::new(),
        };
    }

    let mut fields: Vec<FieldQualityRow> = names
        .iter()
        .zip(filled)
        .map(|(name, f)| FieldQualityRow {
            field: name.to_string(),
            filled: f,
            empty: total_rows - f,
            empty_pct: round1(pct(total_rows - f, total_rows)),
        })
        .collect();
    fields.sort_by(|a, b| b.empty.cmp(&a.empty));

    let filled_cells: usize = filled.iter().sum();
    QualityReport {
        total_rows,
        total_fields: REQUIRED_FIELDS,
        problem_fields: fields.iter().filter(|f| f.empty_pct > PROBLEM_EMPTY_PCT).count(),
        fill_rate: round1(pct(filled_cells, total_rows * REQUIRED_FIELDS)),
        fields,
    }
}

/// Orders per equipment unit, plus how many orders carry no real equipment.
pub fn equipment_report(
    data: &Dataset,
    agg: &Aggregates,
    classifier: &EmptyValueClassifier,
    n: usize,
) -> EquipmentReport {
    let orders_without_equipment = match data.capabilities.equipment {
        Some(key) => classifier.count_empty(data.orders.iter().map(|o| o.equipment_ref(key))),
        None => 0,
    };
    EquipmentReport {
        distinct_equipment: agg.count_by_equipment.len(),
        orders_with_equipment: agg.count_by_equipment.values().sum(),
        orders_without_equipment,
        top: group_counts(&agg.count_by_equipment, n),
    }
}

pub fn scored_rows(run: &ScoringRun, data: &Dataset) -> Vec<ScoredOrderRow> {
    let key_loc = data.capabilities.location;
    let key_eq = data.capabilities.equipment;
    run.orders
        .iter()
        .map(|o| {
            let ord = order_of(data, o);
            let s = |m: Method| o.score(m).score;
            let f = |m: Method| o.score(m).flagged;
            ScoredOrderRow {
                id: o.id.clone(),
                description: text(ord.and_then(|x| x.description.as_deref())),
                work_type: text(ord.and_then(|x| x.work_type.as_deref())),
                location: text(ord.zip(key_loc).and_then(|(x, k)| x.location_ref(k))),
                equipment: text(ord.zip(key_eq).and_then(|(x, k)| x.equipment_ref(k))),
                status: text(ord.and_then(|x| x.status.as_deref())),
                budget_overrun: s(Method::BudgetOverrun),
                budget_overrun_flag: f(Method::BudgetOverrun),
                location_anomaly: s(Method::LocationAnomaly),
                location_anomaly_flag: f(Method::LocationAnomaly),
                unfinished_work: s(Method::UnfinishedWork),
                unfinished_work_flag: f(Method::UnfinishedWork),
                problem_equipment: s(Method::ProblemEquipment),
                problem_equipment_flag: f(Method::ProblemEquipment),
                year_end_closure: s(Method::YearEndClosure),
                year_end_closure_flag: f(Method::YearEndClosure),
                status_returns: s(Method::StatusReturns),
                status_returns_flag: f(Method::StatusReturns),
                methods_total: o.methods_total,
                methods_count: o.methods_count,
                multiplier: o.multiplier,
                dq_risk: o.dq_risk,
                priority_score: o.priority_score,
                risk_category: o.category,
                legacy_score: o.legacy_score,
            }
        })
        .collect()
}

/// Everything written to `summary.json`.
#[derive(Debug, Serialize, Clone)]
pub struct RunSummary {
    pub kpi: KpiSummary,
    pub methods: Vec<MethodSummaryRow>,
    pub categories: Vec<CategoryCountRow>,
    pub quality: QualityReport,
    pub equipment: EquipmentReport,
}
