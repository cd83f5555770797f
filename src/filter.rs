use chrono::NaiveDate;

use crate::types::{Dataset, Order};

/// Attribute filter applied before scoring. Empty lists place no restriction.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub work_types: Vec<String>,
    pub planner_groups: Vec<String>,
    pub statuses: Vec<String>,
    pub workplaces: Vec<String>,
    pub abc: Vec<String>,
    /// Inclusive bounds on the planned start date.
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive substring over id, description, location and equipment.
    pub search: Option<String>,
}

fn in_list(list: &[String], value: Option<&str>) -> bool {
    if list.is_empty() {
        return true;
    }
    match value.map(str::trim) {
        Some(v) => list.iter().any(|x| x.trim() == v),
        None => false,
    }
}

impl OrderFilter {
    pub fn is_empty(&self) -> bool {
        self.work_types.is_empty()
            && self.planner_groups.is_empty()
            && self.statuses.is_empty()
            && self.workplaces.is_empty()
            && self.abc.is_empty()
            && self.date_from.is_none()
            && self.date_to.is_none()
            && self.search.as_deref().map_or(true, |s| s.trim().is_empty())
    }

    pub fn matches(&self, order: &Order) -> bool {
        if !in_list(&self.work_types, order.work_type.as_deref())
            || !in_list(&self.planner_groups, order.planner_group.as_deref())
            || !in_list(&self.statuses, order.status.as_deref())
            || !in_list(&self.workplaces, order.workplace.as_deref())
            || !in_list(&self.abc, order.abc.as_deref())
        {
            return false;
        }

        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(start) = order.planned_start else {
                return false;
            };
            if self.date_from.is_some_and(|from| start < from)
                || self.date_to.is_some_and(|to| start > to)
            {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                [
                    Some(order.id.as_str()),
                    order.description.as_deref(),
                    order.location_code.as_deref(),
                    order.location_name.as_deref(),
                    order.equipment_code.as_deref(),
                    order.equipment_name.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }

    /// New view holding only the matching orders; capabilities carry over.
    pub fn apply(&self, data: &Dataset) -> Dataset {
        let orders = data
            .orders
            .iter()
            .filter(|o| self.matches(o))
            .cloned()
            .collect();
        Dataset::new(orders, data.capabilities)
    }
}
