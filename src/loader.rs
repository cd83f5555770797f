use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::error::LoadError;
use crate::history::count_status_returns;
use crate::types::{column_for_header, Column, Dataset, Order, RawRow, SchemaCapabilities};
use crate::util::{parse_date_safe, parse_f64_safe, parse_u32_safe, plausible_actual_date};

/// Text values that do not count as "filled" for completeness.
const UNFILLED_TEXT: &[&str] = &["Н/Д", "nan", "None", "0", "Не присвоено", "Пусто"];

/// Number of required fields behind the completeness percentage.
pub const REQUIRED_FIELDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportSchema {
    /// One row per order.
    Legacy,
    /// One row per status change, several rows per order.
    StatusHistory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_orders: usize,
    pub parse_errors: usize,
    pub skipped_without_id: usize,
    pub schema: ExportSchema,
}

pub fn load_orders(path: &Path) -> Result<(Dataset, LoadReport), LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.display().to_string(),
        source,
    })?;
    load_orders_from_reader(file)
}

/// Pick `;` or `,` by which appears more often in the header line.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let semis = header.iter().filter(|b| **b == b';').count();
    let commas = header.iter().filter(|b| **b == b',').count();
    if semis > commas {
        b';'
    } else {
        b','
    }
}

pub fn load_orders_from_reader<R: Read>(mut reader: R) -> Result<(Dataset, LoadReport), LoadError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let delimiter = sniff_delimiter(&bytes);

    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes.as_slice());

    let columns: HashSet<Column> = rdr.headers()?.iter().filter_map(column_for_header).collect();
    if !columns.contains(&Column::Id) {
        return Err(LoadError::MissingIdColumn);
    }

    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut skipped_without_id = 0usize;
    let mut rows: Vec<RawRow> = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(row = total_rows, error = %e, "skipping unreadable row");
                parse_errors += 1;
                continue;
            }
        };
        if clean_text(row.id.as_deref()).is_none() {
            skipped_without_id += 1;
            continue;
        }
        rows.push(row);
    }

    let schema = detect_schema(&columns, &rows);
    let mut capabilities = SchemaCapabilities::from_columns(|c| columns.contains(&c));
    if schema == ExportSchema::StatusHistory {
        capabilities.status_returns = true;
        // The collapse falls back to the status code when no status text exists.
        capabilities.status |= columns.contains(&Column::StatusCode);
    }

    let orders: Vec<Order> = match schema {
        ExportSchema::Legacy => rows.into_iter().map(clean_row).collect(),
        ExportSchema::StatusHistory => collapse_status_history(rows),
    };

    let report = LoadReport {
        total_rows,
        loaded_orders: orders.len(),
        parse_errors,
        skipped_without_id,
        schema,
    };
    info!(
        rows = report.total_rows,
        orders = report.loaded_orders,
        parse_errors = report.parse_errors,
        schema = ?report.schema,
        "export loaded"
    );
    Ok((Dataset::new(orders, capabilities), report))
}

fn detect_schema(columns: &HashSet<Column>, rows: &[RawRow]) -> ExportSchema {
    if !columns.contains(&Column::StatusCode) {
        return ExportSchema::Legacy;
    }
    let mut seen = HashSet::new();
    let repeated = rows
        .iter()
        .filter_map(|r| clean_text(r.id.as_deref()))
        .any(|id| !seen.insert(id));
    if repeated {
        ExportSchema::StatusHistory
    } else {
        ExportSchema::Legacy
    }
}

fn clean_text(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn owned(s: Option<String>) -> Option<String> {
    clean_text(s.as_deref()).map(str::to_string)
}

fn is_filled_text(s: Option<&str>) -> bool {
    matches!(clean_text(s), Some(v) if !UNFILLED_TEXT.contains(&v))
}

/// Each required field with whether `order` carries a usable value for it.
pub fn required_fields(order: &Order) -> [(&'static str, bool); REQUIRED_FIELDS] {
    let location = order.location_name.as_deref().or(order.location_code.as_deref());
    [
        ("id", is_filled_text(Some(order.id.as_str()))),
        ("description", is_filled_text(order.description.as_deref())),
        ("location", is_filled_text(location)),
        ("work_type", is_filled_text(order.work_type.as_deref())),
        ("planned_cost", order.planned_cost.is_some()),
        ("actual_cost", order.actual_cost.is_some()),
        ("planned_start", order.planned_start.is_some()),
        ("planned_end", order.planned_end.is_some()),
        ("status", is_filled_text(order.status.as_deref())),
        ("abc", is_filled_text(order.abc.as_deref())),
    ]
}

/// Percentage of required fields that carry a usable value.
pub fn completeness(order: &Order) -> f64 {
    let filled = required_fields(order).iter().filter(|(_, f)| *f).count();
    filled as f64 / REQUIRED_FIELDS as f64 * 100.0
}

fn clean_row(row: RawRow) -> Order {
    let mut order = Order {
        id: clean_text(row.id.as_deref()).unwrap_or_default().to_string(),
        description: owned(row.description),
        work_type: owned(row.work_type),
        planned_cost: parse_f64_safe(row.planned_cost.as_deref()),
        actual_cost: parse_f64_safe(row.actual_cost.as_deref()),
        planned_start: parse_date_safe(row.planned_start.as_deref()),
        planned_end: parse_date_safe(row.planned_end.as_deref()),
        actual_start: plausible_actual_date(parse_date_safe(row.actual_start.as_deref())),
        actual_end: plausible_actual_date(parse_date_safe(row.actual_end.as_deref())),
        status: owned(row.status),
        location_code: owned(row.location_code),
        location_name: owned(row.location),
        equipment_code: owned(row.equipment_code),
        equipment_name: owned(row.equipment),
        planner_group: owned(row.planner_group),
        author: owned(row.author),
        workplace: owned(row.workplace),
        abc: owned(row.abc),
        status_changes: parse_u32_safe(row.status_changes.as_deref()),
        status_returns: parse_u32_safe(row.status_returns.as_deref()),
        completeness: None,
    };
    order.completeness = Some(completeness(&order));
    order
}

/// Fill each missing field of `into` from `from`.
fn fill_missing(into: &mut RawRow, from: &RawRow) {
    macro_rules! fill {
        ($($field:ident),* $(,)?) => {
            $(
                if clean_text(into.$field.as_deref()).is_none() {
                    into.$field = from.$field.clone();
                }
            )*
        };
    }
    fill!(
        description,
        work_type,
        planned_cost,
        actual_cost,
        planned_start,
        planned_end,
        actual_start,
        actual_end,
        location_code,
        location,
        equipment_code,
        equipment,
        planner_group,
        workplace,
        abc,
    );
}

/// Collapse status-change rows into one order each, keeping first-seen order.
///
/// Static fields take the first non-blank value, the current status comes
/// from the latest change, the author is whoever made the first change.
fn collapse_status_history(rows: Vec<RawRow>) -> Vec<Order> {
    let mut order_of_ids: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<RawRow>> = HashMap::new();
    for row in rows {
        let id = clean_text(row.id.as_deref()).unwrap_or_default().to_string();
        groups
            .entry(id.clone())
            .or_insert_with(|| {
                order_of_ids.push(id);
                Vec::new()
            })
            .push(row);
    }

    order_of_ids
        .into_iter()
        .filter_map(|id| groups.remove(&id))
        .filter_map(|mut history| {
            // Stable sort; rows without a change date keep their place at the end.
            history.sort_by_key(|r| {
                let d = parse_date_safe(r.changed_at.as_deref());
                (d.is_none(), d)
            });
            let changes = history.len() as u32;
            let returns = count_status_returns(
                history
                    .iter()
                    .filter_map(|r| clean_text(r.status_code.as_deref())),
            );
            let last = history.last()?.clone();
            let mut merged = history.first()?.clone();
            for row in &history[1..] {
                fill_missing(&mut merged, row);
            }
            merged.status = last.status.or(last.status_code);
            merged.status_changes = Some(changes.to_string());
            merged.status_returns = Some(returns.to_string());
            Some(clean_row(merged))
        })
        .collect()
}
