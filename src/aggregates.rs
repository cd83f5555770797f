//! Dataset-wide reference statistics used by the history-aware methods.
//!
//! Aggregates are always rebuilt from the view being scored: filtering
//! changes the population the medians and counts are drawn from.

use serde::Serialize;
use std::collections::HashMap;

use crate::empty::EmptyValueClassifier;
use crate::types::{Dataset, Order};
use crate::util::{average, median};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregates {
    pub mean_cost_by_work_type: HashMap<String, f64>,
    pub mean_planned_cost: f64,
    pub median_cost_by_location: HashMap<String, f64>,
    pub count_by_location: HashMap<String, usize>,
    /// Only equipment references that pass the empty-value classifier.
    pub count_by_equipment: HashMap<String, usize>,
    pub count_by_planner_group: HashMap<String, usize>,
    pub count_by_author: HashMap<String, usize>,
    pub count_by_workplace: HashMap<String, usize>,
}

/// Normalized grouping key: trimmed, blank values dropped.
pub fn group_key(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn count_by<'a, F>(orders: &'a [Order], key: F) -> HashMap<String, usize>
where
    F: Fn(&'a Order) -> Option<&'a str>,
{
    let mut map: HashMap<String, usize> = HashMap::new();
    for o in orders {
        if let Some(k) = group_key(key(o)) {
            *map.entry(k.to_string()).or_default() += 1;
        }
    }
    map
}

fn values_by<'a, F>(orders: &'a [Order], key: F) -> HashMap<String, Vec<f64>>
where
    F: Fn(&'a Order) -> Option<&'a str>,
{
    let mut map: HashMap<String, Vec<f64>> = HashMap::new();
    for o in orders {
        if let (Some(k), Some(cost)) = (group_key(key(o)), o.actual_cost) {
            map.entry(k.to_string()).or_default().push(cost);
        }
    }
    map
}

pub fn build_aggregates(data: &Dataset, classifier: &EmptyValueClassifier) -> Aggregates {
    let caps = &data.capabilities;
    let orders = data.orders.as_slice();
    let mut agg = Aggregates::default();

    if caps.work_type && caps.actual_cost {
        agg.mean_cost_by_work_type = values_by(orders, |o| o.work_type.as_deref())
            .into_iter()
            .map(|(k, v)| (k, average(&v)))
            .collect();
    }

    if caps.planned_cost {
        let planned: Vec<f64> = orders.iter().filter_map(|o| o.planned_cost).collect();
        agg.mean_planned_cost = average(&planned);
    }

    if let Some(key) = caps.location {
        if caps.actual_cost {
            agg.median_cost_by_location = values_by(orders, |o| o.location_ref(key))
                .into_iter()
                .map(|(k, v)| (k, median(v)))
                .collect();
        }
        agg.count_by_location = count_by(orders, |o| o.location_ref(key));
    }

    if let Some(key) = caps.equipment {
        let empty = classifier.mask(orders.iter().map(|o| o.equipment_ref(key)));
        let mut map: HashMap<String, usize> = HashMap::new();
        for (o, is_empty) in orders.iter().zip(empty) {
            if is_empty {
                continue;
            }
            if let Some(k) = group_key(o.equipment_ref(key)) {
                *map.entry(k.to_string()).or_default() += 1;
            }
        }
        agg.count_by_equipment = map;
    }

    if caps.planner_group {
        agg.count_by_planner_group = count_by(orders, |o| o.planner_group.as_deref());
    }
    if caps.author {
        agg.count_by_author = count_by(orders, |o| o.author.as_deref());
    }
    if caps.workplace {
        agg.count_by_workplace = count_by(orders, |o| o.workplace.as_deref());
    }

    agg
}
