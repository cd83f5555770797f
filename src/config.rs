use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::empty::{EmptyValueClassifier, DEFAULT_PLACEHOLDERS};
use crate::error::ConfigError;
use crate::methods::{Method, MethodCatalog};

/// Default substrings that mark an order status as still open.
pub const DEFAULT_OPEN_STATUS_PATTERNS: &[&str] = &[
    "ОТКР",
    "В работе",
    "Внутреннее планирование",
    "REL",
    "In progress",
    "Internal planning",
];

/// Engine configuration, read once at start-up and passed by reference.
///
/// Example TOML:
/// ```toml
/// open_status_patterns = ["REL", "In progress"]
///
/// [methods.budget_overrun]
/// weight = 1.5
/// threshold = 25
///
/// [methods.problem_equipment]
/// range = [2, 30]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    /// Per-method overrides keyed by method id.
    pub methods: BTreeMap<String, MethodSettings>,

    /// Equipment placeholder catalog used by the empty-value classifier.
    pub placeholders: Vec<String>,

    /// Substrings that mark an order status as unfinished.
    pub open_status_patterns: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            methods: BTreeMap::new(),
            placeholders: DEFAULT_PLACEHOLDERS.iter().map(|s| s.to_string()).collect(),
            open_status_patterns: DEFAULT_OPEN_STATUS_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MethodSettings {
    #[serde(default)]
    pub weight: Option<f64>,

    /// Default threshold for this method.
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Allowed range for user-adjusted thresholds, `[min, max]`.
    #[serde(default)]
    pub range: Option<[f64; 2]>,
}

impl EngineConfig {
    /// Built-in catalog with this configuration's overrides applied.
    ///
    /// Unknown method ids are ignored here; [`validate_config`] reports them.
    pub fn catalog(&self) -> MethodCatalog {
        let mut catalog = MethodCatalog::default();
        for (name, settings) in &self.methods {
            let Ok(method) = name.parse::<Method>() else {
                continue;
            };
            let def = catalog.get_mut(method);
            if let Some(weight) = settings.weight {
                def.weight = weight;
            }
            if let Some(threshold) = settings.threshold {
                def.default_threshold = threshold;
            }
            if let Some([lo, hi]) = settings.range {
                def.threshold_range = (lo, hi);
            }
        }
        catalog
    }

    pub fn classifier(&self) -> EmptyValueClassifier {
        EmptyValueClassifier::new(self.placeholders.iter().map(String::as_str))
    }
}

/// Load configuration from a TOML file, or the defaults when `path` is None.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content).map_err(|e| match e {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })
}

pub fn parse_config(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: "<inline>".to_string(),
        source,
    })?;
    validate_config(&config).map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Validate configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for (name, settings) in &config.methods {
        let method = match name.parse::<Method>() {
            Ok(m) => m,
            Err(e) => {
                errors.push(format!("methods.{}: {}", name, e));
                continue;
            }
        };
        if let Some(weight) = settings.weight {
            if !weight.is_finite() || weight < 0.0 {
                errors.push(format!("methods.{}.weight: must be non-negative", name));
            }
        }
        if let Some(threshold) = settings.threshold {
            if method == Method::UnfinishedWork {
                errors.push(format!("methods.{}.threshold: method is not adjustable", name));
            } else if !threshold.is_finite() || threshold <= 0.0 {
                errors.push(format!("methods.{}.threshold: must be positive", name));
            }
        }
        if let Some([lo, hi]) = settings.range {
            if !(lo.is_finite() && hi.is_finite()) || lo > hi {
                errors.push(format!("methods.{}.range: expected [min, max] with min <= max", name));
            }
        }
    }

    if config.open_status_patterns.iter().all(|p| p.trim().is_empty()) {
        errors.push("open_status_patterns: at least one non-blank pattern is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = parse_config(
            r#"
[methods.budget_overrun]
weight = 1.5
threshold = 25
"#,
        )
        .unwrap();
        let catalog = config.catalog();
        assert_eq!(catalog.weight(Method::BudgetOverrun), 1.5);
        assert_eq!(catalog.get(Method::BudgetOverrun).default_threshold, 25.0);
        assert_eq!(catalog.weight(Method::StatusReturns), 1.0);
        assert_eq!(config.open_status_patterns.len(), DEFAULT_OPEN_STATUS_PATTERNS.len());
    }

    #[test]
    fn empty_toml_is_defaults() {
        assert_eq!(parse_config("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        assert!(matches!(parse_config("colour = 1"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = EngineConfig::default();
        config.methods.insert(
            "budget_overrun".to_string(),
            MethodSettings {
                weight: Some(-1.0),
                threshold: Some(0.0),
                range: Some([10.0, 5.0]),
            },
        );
        config.methods.insert("made_up".to_string(), MethodSettings::default());
        config.open_status_patterns = vec![" ".to_string()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| e.contains("methods.made_up")));
        assert!(errors.iter().any(|e| e.contains("budget_overrun.weight")));
    }

    #[test]
    fn unfinished_work_threshold_is_rejected() {
        let mut config = EngineConfig::default();
        config.methods.insert(
            "unfinished_work".to_string(),
            MethodSettings {
                threshold: Some(3.0),
                ..MethodSettings::default()
            },
        );
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].contains("not adjustable"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
