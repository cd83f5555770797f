//! Status-history exports carry one row per status change. These helpers
//! collapse them into one record per order.

use std::collections::HashSet;

/// Number of status returns: statuses entered again after they were first
/// seen in the audit trail. `statuses` must be in chronological order.
pub fn count_status_returns<'a, I>(statuses: I) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut returns = 0;
    for status in statuses {
        if !seen.insert(status.trim()) {
            returns += 1;
        }
    }
    returns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_history_has_no_returns() {
        assert_eq!(count_status_returns(["CRTD", "REL", "TECO", "CLSD"]), 0);
    }

    #[test]
    fn revisits_are_counted_each_time() {
        assert_eq!(count_status_returns(["CRTD", "REL", "CRTD", "REL", "TECO", "REL"]), 3);
    }

    #[test]
    fn whitespace_does_not_hide_a_return() {
        assert_eq!(count_status_returns(["REL", " REL "]), 1);
    }

    #[test]
    fn empty_history() {
        assert_eq!(count_status_returns(Vec::<&str>::new()), 0);
    }
}
