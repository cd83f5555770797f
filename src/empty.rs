//! Empty-equipment classification.
//!
//! Exports rarely leave the equipment column blank. Instead it carries
//! placeholder text, zero fillers or truncated codes. Every count that is
//! attributed to a piece of equipment must first pass through this
//! classifier, and the per-value check and the column mask must agree on
//! every input.

use std::collections::HashSet;

/// Placeholder tokens seen in equipment columns.
pub const DEFAULT_PLACEHOLDERS: &[&str] = &[
    "not assigned",
    "unassigned",
    "n/a",
    "na",
    "empty",
    "none",
    "null",
    "nan",
    "-",
    "0",
    "0.0",
    "",
    "Н/Д",
    "НД",
    "Не присвоено",
    "Не присв",
    "Пусто",
];

/// Codes shorter than this, after trimming, are not real equipment codes.
pub const MIN_EQUIPMENT_LEN: usize = 3;

#[derive(Debug, Clone)]
pub struct EmptyValueClassifier {
    exact: HashSet<String>,
    folded: HashSet<String>,
}

impl Default for EmptyValueClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDERS.iter().copied())
    }
}

impl EmptyValueClassifier {
    pub fn new<'a>(placeholders: impl IntoIterator<Item = &'a str>) -> Self {
        let mut exact = HashSet::new();
        let mut folded = HashSet::new();
        for token in placeholders {
            let token = token.trim();
            exact.insert(token.to_string());
            folded.insert(token.to_lowercase());
        }
        Self { exact, folded }
    }

    /// True when `value` should be read as "no equipment assigned".
    pub fn is_empty(&self, value: Option<&str>) -> bool {
        let Some(raw) = value else {
            return true;
        };
        let s = raw.trim();
        if s.chars().count() < MIN_EQUIPMENT_LEN {
            return true;
        }
        if s.chars().all(|c| c == '0') {
            return true;
        }
        self.exact.contains(s) || self.folded.contains(&s.to_lowercase())
    }

    /// Column form of [`is_empty`](Self::is_empty): one flag per value.
    pub fn mask<'a, I>(&self, values: I) -> Vec<bool>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        values.into_iter().map(|v| self.is_empty(v)).collect()
    }

    /// Number of values in the column classified as empty.
    pub fn count_empty<'a, I>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        self.mask(values).into_iter().filter(|e| *e).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_blank_are_empty() {
        let c = EmptyValueClassifier::default();
        assert!(c.is_empty(None));
        assert!(c.is_empty(Some("")));
        assert!(c.is_empty(Some("   ")));
    }

    #[test]
    fn placeholders_match_exactly_or_case_folded() {
        let c = EmptyValueClassifier::default();
        assert!(c.is_empty(Some("Not Assigned")));
        assert!(c.is_empty(Some("  NULL ")));
        assert!(c.is_empty(Some("Н/Д")));
        assert!(c.is_empty(Some("не присвоено")));
        assert!(c.is_empty(Some("ПУСТО")));
    }

    #[test]
    fn zero_fillers_and_short_codes_are_empty() {
        let c = EmptyValueClassifier::default();
        assert!(c.is_empty(Some("0000")));
        assert!(c.is_empty(Some("000000000000000000")));
        assert!(c.is_empty(Some("AB")));
        assert!(c.is_empty(Some(" 7 ")));
    }

    #[test]
    fn real_codes_are_not_empty() {
        let c = EmptyValueClassifier::default();
        assert!(!c.is_empty(Some("EQ001")));
        assert!(!c.is_empty(Some("10004711")));
        assert!(!c.is_empty(Some("Pump NCV-10")));
        assert!(!c.is_empty(Some("000100")));
    }

    #[test]
    fn mask_agrees_with_scalar_check() {
        let c = EmptyValueClassifier::default();
        let column = [None, Some(""), Some("EQ001"), Some("0000"), Some("n/a"), Some("PUMP-7")];
        let mask = c.mask(column.iter().copied());
        let scalar: Vec<bool> = column.iter().map(|v| c.is_empty(*v)).collect();
        assert_eq!(mask, scalar);
        assert_eq!(c.count_empty(column.iter().copied()), 4);
    }

    #[test]
    fn custom_catalog_extends_defaults_only_when_given() {
        let c = EmptyValueClassifier::new(["TBD"]);
        assert!(c.is_empty(Some("tbd")));
        assert!(!c.is_empty(Some("none")));
    }
}
