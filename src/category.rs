use serde::Serialize;
use std::fmt;

/// Risk band of an order. Lower bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Normal,   // < 1
    Watch,    // 1-4
    Elevated, // 4-7
    Critical, // >= 7
}

pub const WATCH_FROM: f64 = 1.0;
pub const ELEVATED_FROM: f64 = 4.0;
pub const CRITICAL_FROM: f64 = 7.0;

impl RiskCategory {
    pub const ALL: [RiskCategory; 4] = [
        RiskCategory::Critical,
        RiskCategory::Elevated,
        RiskCategory::Watch,
        RiskCategory::Normal,
    ];

    pub fn from_priority(priority_score: f64) -> Self {
        match priority_score {
            s if s >= CRITICAL_FROM => RiskCategory::Critical,
            s if s >= ELEVATED_FROM => RiskCategory::Elevated,
            s if s >= WATCH_FROM => RiskCategory::Watch,
            _ => RiskCategory::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Normal => "normal",
            RiskCategory::Watch => "watch",
            RiskCategory::Elevated => "elevated",
            RiskCategory::Critical => "critical",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RiskCategory::Normal => "green",
            RiskCategory::Watch => "grey",
            RiskCategory::Elevated => "yellow",
            RiskCategory::Critical => "red",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
