//! The six risk methods, their definitions and threshold overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    BudgetOverrun,
    LocationAnomaly,
    UnfinishedWork,
    ProblemEquipment,
    YearEndClosure,
    StatusReturns,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::BudgetOverrun,
        Method::LocationAnomaly,
        Method::UnfinishedWork,
        Method::ProblemEquipment,
        Method::YearEndClosure,
        Method::StatusReturns,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Method::BudgetOverrun => "budget_overrun",
            Method::LocationAnomaly => "location_anomaly",
            Method::UnfinishedWork => "unfinished_work",
            Method::ProblemEquipment => "problem_equipment",
            Method::YearEndClosure => "year_end_closure",
            Method::StatusReturns => "status_returns",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Method::BudgetOverrun => 0,
            Method::LocationAnomaly => 1,
            Method::UnfinishedWork => 2,
            Method::ProblemEquipment => 3,
            Method::YearEndClosure => 4,
            Method::StatusReturns => 5,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown method '{}'", self.0)
    }
}

impl std::error::Error for UnknownMethod {}

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Method::ALL
            .into_iter()
            .find(|m| m.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// Scoring shape of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Ratio,
    Binary,
    Count,
}

/// Static description of a method plus its configured weight and threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodDefinition {
    pub method: Method,
    pub title: &'static str,
    pub description: &'static str,
    pub shape: Shape,
    pub unit: &'static str,
    pub default_threshold: f64,
    pub weight: f64,
    pub adjustable: bool,
    pub threshold_range: (f64, f64),
    pub color: &'static str,
    pub icon: &'static str,
}

impl MethodDefinition {
    /// Built-in definition before any configuration overrides.
    pub fn builtin(method: Method) -> Self {
        match method {
            Method::BudgetOverrun => Self {
                method,
                title: "Budget overrun",
                description: "Actual cost exceeds planned cost by more than the threshold percentage.",
                shape: Shape::Ratio,
                unit: "%",
                default_threshold: 20.0,
                weight: 1.0,
                adjustable: true,
                threshold_range: (0.0, 100.0),
                color: "#f43f5e",
                icon: "$",
            },
            Method::LocationAnomaly => Self {
                method,
                title: "Location cost anomaly",
                description: "Actual cost exceeds the technical-location median by the threshold percentage.",
                shape: Shape::Ratio,
                unit: "%",
                default_threshold: 140.0,
                weight: 1.0,
                adjustable: true,
                threshold_range: (100.0, 300.0),
                color: "#fbbf24",
                icon: "~",
            },
            Method::UnfinishedWork => Self {
                method,
                title: "Unfinished work",
                description: "Order status is still open, released or in internal planning.",
                shape: Shape::Binary,
                unit: "",
                default_threshold: 0.0,
                weight: 1.0,
                adjustable: false,
                threshold_range: (0.0, 0.0),
                color: "#a78bfa",
                icon: "…",
            },
            Method::ProblemEquipment => Self {
                method,
                title: "Problem equipment",
                description: "The equipment unit carries at least the threshold number of orders.",
                shape: Shape::Count,
                unit: "orders",
                default_threshold: 5.0,
                weight: 1.0,
                adjustable: true,
                threshold_range: (2.0, 20.0),
                color: "#fb923c",
                icon: "⚙",
            },
            Method::YearEndClosure => Self {
                method,
                title: "Year-end formal closure",
                description: "Closed in December against a non-December plan, much faster than planned.",
                shape: Shape::Ratio,
                unit: "%",
                default_threshold: 50.0,
                weight: 1.0,
                adjustable: true,
                threshold_range: (30.0, 70.0),
                color: "#22d3ee",
                icon: "❄",
            },
            Method::StatusReturns => Self {
                method,
                title: "Status returns",
                description: "The order returned to an earlier status at least the threshold number of times.",
                shape: Shape::Count,
                unit: "returns",
                default_threshold: 3.0,
                weight: 1.0,
                adjustable: true,
                threshold_range: (1.0, 10.0),
                color: "#34d399",
                icon: "↺",
            },
        }
    }
}

/// Resolved definitions for all six methods, indexed by [`Method::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCatalog {
    definitions: Vec<MethodDefinition>,
}

impl Default for MethodCatalog {
    fn default() -> Self {
        Self {
            definitions: Method::ALL.into_iter().map(MethodDefinition::builtin).collect(),
        }
    }
}

impl MethodCatalog {
    pub fn get(&self, method: Method) -> &MethodDefinition {
        &self.definitions[method.index()]
    }

    pub(crate) fn get_mut(&mut self, method: Method) -> &mut MethodDefinition {
        &mut self.definitions[method.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodDefinition> {
        self.definitions.iter()
    }

    pub fn weight(&self, method: Method) -> f64 {
        self.get(method).weight
    }
}

/// Caller-supplied threshold overrides. Methods without an entry use the
/// catalog default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thresholds(BTreeMap<Method, f64>);

impl Thresholds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, method: Method, value: f64) -> Self {
        self.set(method, value);
        self
    }

    pub fn set(&mut self, method: Method, value: f64) {
        self.0.insert(method, value);
    }

    pub fn get(&self, method: Method) -> Option<f64> {
        self.0.get(&method).copied()
    }

    /// Effective threshold: the override when present, else the default.
    pub fn resolve(&self, method: Method, catalog: &MethodCatalog) -> f64 {
        self.get(method)
            .unwrap_or_else(|| catalog.get(method).default_threshold)
    }

    /// Parse a `method=value` override such as `budget_overrun=25`.
    pub fn parse_override(s: &str) -> Result<(Method, f64), String> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected METHOD=VALUE, got '{}'", s))?;
        let method: Method = name.parse().map_err(|e: UnknownMethod| e.to_string())?;
        let value = crate::util::parse_f64_safe(Some(value))
            .ok_or_else(|| format!("invalid threshold value '{}' for {}", value.trim(), method))?;
        Ok((method, value))
    }
}

impl FromIterator<(Method, f64)> for Thresholds {
    fn from_iter<I: IntoIterator<Item = (Method, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_from_str() {
        for m in Method::ALL {
            assert_eq!(m.id().parse::<Method>(), Ok(m));
        }
        assert!("bogus".parse::<Method>().is_err());
        assert_eq!("Budget_Overrun".parse::<Method>(), Ok(Method::BudgetOverrun));
    }

    #[test]
    fn indices_follow_catalog_order() {
        let catalog = MethodCatalog::default();
        for m in Method::ALL {
            assert_eq!(catalog.get(m).method, m);
        }
    }

    #[test]
    fn builtin_defaults() {
        let catalog = MethodCatalog::default();
        assert_eq!(catalog.get(Method::BudgetOverrun).default_threshold, 20.0);
        assert_eq!(catalog.get(Method::LocationAnomaly).default_threshold, 140.0);
        assert_eq!(catalog.get(Method::ProblemEquipment).default_threshold, 5.0);
        assert_eq!(catalog.get(Method::YearEndClosure).default_threshold, 50.0);
        assert_eq!(catalog.get(Method::StatusReturns).default_threshold, 3.0);
        assert!(!catalog.get(Method::UnfinishedWork).adjustable);
    }

    #[test]
    fn resolve_prefers_override() {
        let catalog = MethodCatalog::default();
        let t = Thresholds::new().with(Method::BudgetOverrun, 35.0);
        assert_eq!(t.resolve(Method::BudgetOverrun, &catalog), 35.0);
        assert_eq!(t.resolve(Method::StatusReturns, &catalog), 3.0);
    }

    #[test]
    fn parse_override_forms() {
        assert_eq!(
            Thresholds::parse_override("budget_overrun=25"),
            Ok((Method::BudgetOverrun, 25.0))
        );
        assert_eq!(
            Thresholds::parse_override(" status_returns = 2,5 "),
            Ok((Method::StatusReturns, 2.5))
        );
        assert!(Thresholds::parse_override("budget_overrun").is_err());
        assert!(Thresholds::parse_override("nope=1").is_err());
        assert!(Thresholds::parse_override("budget_overrun=abc").is_err());
    }
}
