use std::collections::BTreeMap;

use crate::models::{JobApplication, SUCCESS_STATUS};

/// Share of applications that reached an offer. 0.0 when there are none.
pub fn success_rate<'a, I>(applications: I) -> f64
where
    I: IntoIterator<Item = &'a JobApplication>,
{
    let mut total = 0usize;
    let mut offers = 0usize;
    for app in applications {
        total += 1;
        if app.status() == SUCCESS_STATUS {
            offers += 1;
        }
    }

    if total == 0 {
        0.0
    } else {
        offers as f64 / total as f64
    }
}

/// Number of applications per status, keyed by the status string.
pub fn status_breakdown<'a, I>(applications: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a JobApplication>,
{
    let mut counts = BTreeMap::new();
    for app in applications {
        *counts.entry(app.status().to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Fields, STATUS_APPLIED, STATUS_OFFER_RECEIVED};

    fn app(status: &str) -> JobApplication {
        let mut fields = Fields::new();
        fields.insert("status".to_string(), status.to_string());
        JobApplication::new(fields)
    }

    #[test]
    fn test_success_rate_empty() {
        let apps: Vec<JobApplication> = Vec::new();
        assert_eq!(success_rate(&apps), 0.0);
    }

    #[test]
    fn test_success_rate_half() {
        let apps = vec![app(STATUS_APPLIED), app(STATUS_OFFER_RECEIVED)];
        assert_eq!(success_rate(&apps), 0.5);
    }

    #[test]
    fn test_success_rate_ignores_near_misses() {
        let apps = vec![app("offer received"), app("Offer Received ")];
        assert_eq!(success_rate(&apps), 0.0);
    }

    #[test]
    fn test_status_breakdown_counts_missing_status_as_not_started() {
        let apps = vec![
            app(STATUS_APPLIED),
            app(STATUS_APPLIED),
            JobApplication::default(),
        ];
        let counts = status_breakdown(&apps);
        assert_eq!(counts.get(STATUS_APPLIED), Some(&2));
        assert_eq!(counts.get("Not Started"), Some(&1));
    }
}
