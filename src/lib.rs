//! Continuous risk scoring for maintenance work-order exports.
//!
//! Orders are loaded from CSV, optionally filtered, and scored by six
//! independent methods. Per-method scores are combined into a priority
//! score and a risk category.

pub mod aggregates;
pub mod category;
pub mod combiner;
pub mod config;
pub mod empty;
pub mod engine;
pub mod error;
pub mod filter;
pub mod history;
pub mod loader;
pub mod methods;
pub mod output;
pub mod reports;
pub mod scorers;
pub mod types;
pub mod util;

pub use aggregates::Aggregates;
pub use category::RiskCategory;
pub use engine::{MethodScore, RiskEngine, ScoredOrder, ScoringRun};
pub use error::{ConfigError, LoadError, OutputError};
pub use methods::{Method, MethodCatalog, Thresholds};
pub use types::{Dataset, Order, SchemaCapabilities};
