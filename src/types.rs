use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::util::days_diff;

/// One CSV row as it appears in the export. Every field is optional text;
/// parsing and cleaning happen in the loader.
///
/// Normalized snake_case headers are primary; the SAP technical names are
/// accepted as aliases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(alias = "AUFNR")]
    pub id: Option<String>,
    #[serde(alias = "AUFNR_TXT")]
    pub description: Option<String>,
    #[serde(alias = "AUART_TXT")]
    pub work_type: Option<String>,
    #[serde(alias = "PMCOALLP")]
    pub planned_cost: Option<String>,
    #[serde(alias = "PMCOALLF")]
    pub actual_cost: Option<String>,
    #[serde(alias = "GSTRP")]
    pub planned_start: Option<String>,
    #[serde(alias = "GLTRP")]
    pub planned_end: Option<String>,
    #[serde(alias = "ZZFACTBEG")]
    pub actual_start: Option<String>,
    #[serde(alias = "ZZFACTEND")]
    pub actual_end: Option<String>,
    #[serde(alias = "ISTAT_TXT")]
    pub status: Option<String>,
    #[serde(alias = "ISTAT")]
    pub status_code: Option<String>,
    #[serde(alias = "AEDAT")]
    pub changed_at: Option<String>,
    #[serde(alias = "TPLNR")]
    pub location_code: Option<String>,
    #[serde(alias = "TPLNR_TXT")]
    pub location: Option<String>,
    #[serde(alias = "EQUNR")]
    pub equipment_code: Option<String>,
    #[serde(alias = "EQUNR_TXT")]
    pub equipment: Option<String>,
    #[serde(alias = "INGPR_TXT")]
    pub planner_group: Option<String>,
    #[serde(alias = "ERNAM")]
    pub author: Option<String>,
    #[serde(alias = "GEWRK_TXT")]
    pub workplace: Option<String>,
    #[serde(alias = "ABCKZ")]
    pub abc: Option<String>,
    #[serde(alias = "N_STATUS_CHANGES")]
    pub status_changes: Option<String>,
    #[serde(alias = "N_STATUS_RETURNS")]
    pub status_returns: Option<String>,
}

/// Header names per optional column, primary name first. Must stay in sync
/// with the `alias` attributes on [`RawRow`].
const COLUMN_NAMES: &[(Column, &[&str])] = &[
    (Column::Id, &["id", "AUFNR"]),
    (Column::Description, &["description", "AUFNR_TXT"]),
    (Column::WorkType, &["work_type", "AUART_TXT"]),
    (Column::PlannedCost, &["planned_cost", "PMCOALLP"]),
    (Column::ActualCost, &["actual_cost", "PMCOALLF"]),
    (Column::PlannedStart, &["planned_start", "GSTRP"]),
    (Column::PlannedEnd, &["planned_end", "GLTRP"]),
    (Column::ActualStart, &["actual_start", "ZZFACTBEG"]),
    (Column::ActualEnd, &["actual_end", "ZZFACTEND"]),
    (Column::Status, &["status", "ISTAT_TXT"]),
    (Column::StatusCode, &["status_code", "ISTAT"]),
    (Column::ChangedAt, &["changed_at", "AEDAT"]),
    (Column::LocationCode, &["location_code", "TPLNR"]),
    (Column::Location, &["location", "TPLNR_TXT"]),
    (Column::EquipmentCode, &["equipment_code", "EQUNR"]),
    (Column::Equipment, &["equipment", "EQUNR_TXT"]),
    (Column::PlannerGroup, &["planner_group", "INGPR_TXT"]),
    (Column::Author, &["author", "ERNAM"]),
    (Column::Workplace, &["workplace", "GEWRK_TXT"]),
    (Column::Abc, &["abc", "ABCKZ"]),
    (Column::StatusChanges, &["status_changes", "N_STATUS_CHANGES"]),
    (Column::StatusReturns, &["status_returns", "N_STATUS_RETURNS"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Description,
    WorkType,
    PlannedCost,
    ActualCost,
    PlannedStart,
    PlannedEnd,
    ActualStart,
    ActualEnd,
    Status,
    StatusCode,
    ChangedAt,
    LocationCode,
    Location,
    EquipmentCode,
    Equipment,
    PlannerGroup,
    Author,
    Workplace,
    Abc,
    StatusChanges,
    StatusReturns,
}

/// Which key identifies a piece of equipment in this export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipmentKey {
    Code,
    Name,
}

/// Which key identifies a technical location in this export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKey {
    Code,
    Name,
}

/// Schema capability descriptor: which optional columns the export carried.
///
/// Computed once per dataset and handed to every scorer, so a scorer whose
/// column is absent scores zero by declaration instead of by probing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchemaCapabilities {
    pub work_type: bool,
    pub planned_cost: bool,
    pub actual_cost: bool,
    pub status: bool,
    pub location: Option<LocationKey>,
    pub equipment: Option<EquipmentKey>,
    pub planned_dates: bool,
    pub actual_dates: bool,
    pub planner_group: bool,
    pub author: bool,
    pub workplace: bool,
    pub status_returns: bool,
    pub completeness: bool,
}

impl SchemaCapabilities {
    /// Everything present, keyed by codes. Handy for datasets built in code.
    pub fn full() -> Self {
        Self {
            work_type: true,
            planned_cost: true,
            actual_cost: true,
            status: true,
            location: Some(LocationKey::Code),
            equipment: Some(EquipmentKey::Code),
            planned_dates: true,
            actual_dates: true,
            planner_group: true,
            author: true,
            workplace: true,
            status_returns: true,
            completeness: true,
        }
    }

    /// Derive capabilities from the set of columns found in a header.
    pub fn from_columns(has: impl Fn(Column) -> bool) -> Self {
        let location = if has(Column::LocationCode) {
            Some(LocationKey::Code)
        } else if has(Column::Location) {
            Some(LocationKey::Name)
        } else {
            None
        };
        let equipment = if has(Column::EquipmentCode) {
            Some(EquipmentKey::Code)
        } else if has(Column::Equipment) {
            Some(EquipmentKey::Name)
        } else {
            None
        };
        Self {
            work_type: has(Column::WorkType),
            planned_cost: has(Column::PlannedCost),
            actual_cost: has(Column::ActualCost),
            status: has(Column::Status),
            location,
            equipment,
            planned_dates: has(Column::PlannedStart) && has(Column::PlannedEnd),
            actual_dates: has(Column::ActualStart) && has(Column::ActualEnd),
            planner_group: has(Column::PlannerGroup),
            author: has(Column::Author),
            workplace: has(Column::Workplace),
            // The loader also sets this for collapsed status-history exports.
            status_returns: has(Column::StatusReturns),
            completeness: true,
        }
    }
}

/// Map a header cell to the column it names, if any.
pub fn column_for_header(header: &str) -> Option<Column> {
    let header = header.trim().trim_start_matches('\u{feff}');
    COLUMN_NAMES
        .iter()
        .find(|(_, names)| names.iter().any(|n| *n == header))
        .map(|(col, _)| *col)
}

/// One cleaned work order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Order {
    pub id: String,
    pub description: Option<String>,
    pub work_type: Option<String>,
    pub planned_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
    pub actual_start: Option<NaiveDate>,
    pub actual_end: Option<NaiveDate>,
    pub status: Option<String>,
    pub location_code: Option<String>,
    pub location_name: Option<String>,
    pub equipment_code: Option<String>,
    pub equipment_name: Option<String>,
    pub planner_group: Option<String>,
    pub author: Option<String>,
    pub workplace: Option<String>,
    pub abc: Option<String>,
    pub status_changes: Option<u32>,
    pub status_returns: Option<u32>,
    /// Share of required fields that are filled, 0..=100.
    pub completeness: Option<f64>,
}

impl Order {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn location_ref(&self, key: LocationKey) -> Option<&str> {
        match key {
            LocationKey::Code => self.location_code.as_deref(),
            LocationKey::Name => self.location_name.as_deref(),
        }
    }

    pub fn equipment_ref(&self, key: EquipmentKey) -> Option<&str> {
        match key {
            EquipmentKey::Code => self.equipment_code.as_deref(),
            EquipmentKey::Name => self.equipment_name.as_deref(),
        }
    }

    pub fn planned_duration_days(&self) -> Option<f64> {
        Some(days_diff(self.planned_start?, self.planned_end?))
    }

    pub fn actual_duration_days(&self) -> Option<f64> {
        Some(days_diff(self.actual_start?, self.actual_end?))
    }

    pub fn actual_end_month(&self) -> Option<u32> {
        self.actual_end.map(|d| d.month())
    }

    pub fn planned_end_month(&self) -> Option<u32> {
        self.planned_end.map(|d| d.month())
    }
}

/// A filtered view of orders together with the columns its export carried.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub orders: Vec<Order>,
    pub capabilities: SchemaCapabilities,
}

impl Dataset {
    pub fn new(orders: Vec<Order>, capabilities: SchemaCapabilities) -> Self {
        Self {
            orders,
            capabilities,
        }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
