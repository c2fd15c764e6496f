use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

//
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestDay {
    pub day: String,
    pub total_reviewed: u64,
    pub total_created: u64,
    pub total_created_by_copilot: u64,
    pub total_reviewed_by_copilot: u64,
}

impl PullRequestDay {
    pub fn reviewed_by_humans(&self) -> u64 {
        self.total_reviewed
            .saturating_sub(self.total_reviewed_by_copilot)
    }

    pub fn created_by_humans(&self) -> u64 {
        self.total_created.saturating_sub(self.total_created_by_copilot)
    }
}

/// Sums `day_totals[].pull_requests` across reports, one row per day, ordered by day.
pub fn build_pr_timeseries(reports: &[Value]) -> Vec<PullRequestDay> {
    let mut totals_by_day: BTreeMap<&str, PullRequestDay> = BTreeMap::new();

    let day_totals = reports
        .iter()
        .filter_map(|report| report.get("day_totals").and_then(Value::as_array))
        .flatten();

    for day_total in day_totals {
        let day = match day_total.get("day").and_then(Value::as_str) {
            Some(day) if !day.is_empty() => day,
            _ => continue,
        };
        let pr = day_total.get("pull_requests");
        let count = |name: &str| pr.and_then(|pr| pr.get(name)).map_or(0, as_count);

        let bucket = totals_by_day.entry(day).or_insert_with(|| PullRequestDay {
            day: day.to_owned(),
            ..Default::default()
        });
        bucket.total_reviewed += count("total_reviewed");
        bucket.total_created += count("total_created");
        bucket.total_created_by_copilot += count("total_created_by_copilot");
        bucket.total_reviewed_by_copilot += count("total_reviewed_by_copilot");
    }

    totals_by_day.into_values().collect()
}

fn as_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

//
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSummaryRow {
    #[serde(flatten)]
    pub totals: PullRequestDay,
    pub reviewed_by_humans: u64,
    pub created_by_humans: u64,
}

impl From<PullRequestDay> for PullRequestSummaryRow {
    fn from(totals: PullRequestDay) -> Self {
        Self {
            reviewed_by_humans: totals.reviewed_by_humans(),
            created_by_humans: totals.created_by_humans(),
            totals,
        }
    }
}

pub fn summarize(timeseries: Vec<PullRequestDay>) -> Vec<PullRequestSummaryRow> {
    timeseries.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_build_pr_timeseries() {
        let reports = vec![
            json!({
                "day_totals": [
                    {
                        "day": "2025-01-02",
                        "pull_requests": {
                            "total_reviewed": 10,
                            "total_created": 4,
                            "total_created_by_copilot": 1,
                            "total_reviewed_by_copilot": 3
                        }
                    },
                    {
                        "day": "2025-01-01",
                        "pull_requests": { "total_reviewed": 2 }
                    },
                    { "pull_requests": { "total_reviewed": 100 } },
                    { "day": "", "pull_requests": { "total_reviewed": 100 } }
                ]
            }),
            json!({
                "day_totals": [
                    {
                        "day": "2025-01-02",
                        "pull_requests": { "total_reviewed": "5", "total_created": 1 }
                    },
                    { "day": "2025-01-03" }
                ]
            }),
            json!({}),
        ];

        let timeseries = build_pr_timeseries(&reports);

        assert_eq!(
            timeseries,
            vec![
                PullRequestDay {
                    day: "2025-01-01".into(),
                    total_reviewed: 2,
                    ..Default::default()
                },
                PullRequestDay {
                    day: "2025-01-02".into(),
                    total_reviewed: 15,
                    total_created: 5,
                    total_created_by_copilot: 1,
                    total_reviewed_by_copilot: 3,
                },
                PullRequestDay {
                    day: "2025-01-03".into(),
                    ..Default::default()
                },
            ]
        );
        assert_eq!(timeseries[1].reviewed_by_humans(), 12);
        assert_eq!(timeseries[1].created_by_humans(), 4);
    }

    #[test]
    fn test_summarize() {
        let rows = summarize(vec![PullRequestDay {
            day: "2025-01-01".into(),
            total_reviewed: 1,
            total_reviewed_by_copilot: 3,
            ..Default::default()
        }]);

        assert_eq!(rows[0].reviewed_by_humans, 0);
        assert_eq!(
            serde_json::to_value(&rows[0]).unwrap(),
            json!({
                "day": "2025-01-01",
                "total_reviewed": 1,
                "total_created": 0,
                "total_created_by_copilot": 0,
                "total_reviewed_by_copilot": 3,
                "reviewed_by_humans": 0,
                "created_by_humans": 0
            })
        );
    }
}
