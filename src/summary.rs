//! Read-only statistics for the dashboard.
//!
//! Computed on demand from the current collection and never persisted, so
//! it cannot drift from the records it describes.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::record::{ApplicationRecord, JobSource, JobStatus};

/// Aggregate counts and rates over a set of applications.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Every record. Those with an unrecognized status count here and in
    /// the response rate only.
    pub total: usize,
    /// Still at `Applied`, waiting on a response.
    pub pending: usize,
    pub interviews: usize,
    pub offers: usize,
    pub rejected: usize,
    /// Percentage of applications that moved past `Applied`.
    pub response_rate: f64,
    /// Percentage of applications that were rejected.
    pub rejection_rate: f64,
    /// Most common source. Ties go to the one listed first in
    /// [`JobSource::ALL`].
    pub top_source: Option<JobSource>,
    /// Applications dated in the current month.
    pub this_month: usize,
    /// Applications per month of the current year, January first.
    pub monthly: [usize; 12],
    /// Follow-ups dated today or earlier that are not done.
    pub follow_ups_due: usize,
}

impl DashboardSummary {
    /// Summarize `records` as of `today`.
    pub fn compute(records: &[ApplicationRecord], today: NaiveDate) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };
        let mut sources = vec![0usize; JobSource::ALL.len()];

        for record in records {
            match record.job_status {
                JobStatus::Applied => summary.pending += 1,
                JobStatus::Interview => summary.interviews += 1,
                JobStatus::Offer => summary.offers += 1,
                JobStatus::Rejected => summary.rejected += 1,
                JobStatus::Other(_) => {}
            }

            if let Some(source) = &record.job_source
                && let Some(slot) = JobSource::ALL.iter().position(|s| s == source)
            {
                sources[slot] += 1;
            }

            if record.application_date.year() == today.year() {
                summary.monthly[record.application_date.month0() as usize] += 1;
            }

            if record.follow_up_due(today) {
                summary.follow_ups_due += 1;
            }
        }

        summary.this_month = summary.monthly[today.month0() as usize];
        summary.response_rate = percent(summary.total - summary.pending, summary.total);
        summary.rejection_rate = percent(summary.rejected, summary.total);

        let mut best = 0;
        for (slot, count) in sources.into_iter().enumerate() {
            if count > best {
                best = count;
                summary.top_source = Some(JobSource::ALL[slot].clone());
            }
        }

        summary
    }

    /// Count for a single status.
    pub fn count(&self, status: JobStatus) -> usize {
        match status {
            JobStatus::Applied => self.pending,
            JobStatus::Interview => self.interviews,
            JobStatus::Offer => self.offers,
            JobStatus::Rejected => self.rejected,
            JobStatus::Other(_) => 0,
        }
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::record::NewApplication;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn record(id: &str, input: NewApplication) -> ApplicationRecord {
        let application_date = input.validate().expect("valid input");
        ApplicationRecord::from_input(
            input,
            application_date,
            id.into(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn empty_collection_has_zero_rates() {
        let summary = DashboardSummary::compute(&[], date(2024, 3, 1));
        assert_eq!(summary, DashboardSummary::default());
        assert_eq!(summary.response_rate, 0.0);
    }

    #[test]
    fn counts_statuses_and_rates() {
        let records = vec![
            record("1", NewApplication::new("a", "A", date(2024, 3, 1))),
            record(
                "2",
                NewApplication::new("b", "B", date(2024, 3, 2)).with_status(JobStatus::Interview),
            ),
            record(
                "3",
                NewApplication::new("c", "C", date(2024, 2, 2)).with_status(JobStatus::Offer),
            ),
            record(
                "4",
                NewApplication::new("d", "D", date(2024, 1, 5)).with_status(JobStatus::Rejected),
            ),
        ];

        let summary = DashboardSummary::compute(&records, date(2024, 3, 15));

        assert_eq!(summary.total, 4);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.count(JobStatus::Interview), 1);
        assert_eq!(summary.count(JobStatus::Offer), 1);
        assert_eq!(summary.count(JobStatus::Rejected), 1);
        assert_eq!(summary.response_rate, 75.0);
        assert_eq!(summary.rejection_rate, 25.0);
        assert_eq!(summary.this_month, 2);
        assert_eq!(&summary.monthly[..4], &[1, 1, 2, 0]);
    }

    #[test]
    fn monthly_ignores_other_years() {
        let records = vec![
            record("1", NewApplication::new("a", "A", date(2023, 3, 1))),
            record("2", NewApplication::new("b", "B", date(2024, 3, 1))),
        ];
        let summary = DashboardSummary::compute(&records, date(2024, 3, 15));
        assert_eq!(summary.this_month, 1);
        assert_eq!(summary.monthly.iter().sum::<usize>(), 1);
    }

    #[test]
    fn top_source_prefers_first_listed_on_tie() {
        let records = vec![
            record(
                "1",
                NewApplication::new("a", "A", date(2024, 3, 1)).with_source(JobSource::Referral),
            ),
            record(
                "2",
                NewApplication::new("b", "B", date(2024, 3, 1)).with_source(JobSource::Indeed),
            ),
            record("3", NewApplication::new("c", "C", date(2024, 3, 1))),
        ];
        let summary = DashboardSummary::compute(&records, date(2024, 3, 15));
        assert_eq!(summary.top_source, Some(JobSource::Indeed));
    }

    #[test]
    fn unknown_labels_count_toward_total_only() {
        let records = vec![
            record(
                "1",
                NewApplication::new("a", "A", date(2024, 3, 1))
                    .with_status(JobStatus::Other("Ghosted".into()))
                    .with_source(JobSource::Other("Glassdoor".into())),
            ),
            record("2", NewApplication::new("b", "B", date(2024, 3, 1))),
        ];
        let summary = DashboardSummary::compute(&records, date(2024, 3, 15));
        assert_eq!(summary.total, 2);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.count(JobStatus::Other("Ghosted".into())), 0);
        assert_eq!(summary.response_rate, 50.0);
        assert_eq!(summary.top_source, None);
    }

    #[test]
    fn no_sources_means_no_top_source() {
        let records = vec![record("1", NewApplication::new("a", "A", date(2024, 3, 1)))];
        let summary = DashboardSummary::compute(&records, date(2024, 3, 15));
        assert_eq!(summary.top_source, None);
    }

    #[test]
    fn follow_ups_due_counts_open_past_dates() {
        let mut done = record(
            "3",
            NewApplication::new("c", "C", date(2024, 3, 1)).with_follow_up(date(2024, 3, 5)),
        );
        done.follow_up_completed = true;
        let records = vec![
            record(
                "1",
                NewApplication::new("a", "A", date(2024, 3, 1)).with_follow_up(date(2024, 3, 10)),
            ),
            record(
                "2",
                NewApplication::new("b", "B", date(2024, 3, 1)).with_follow_up(date(2024, 3, 20)),
            ),
            done,
        ];
        let summary = DashboardSummary::compute(&records, date(2024, 3, 15));
        assert_eq!(summary.follow_ups_due, 1);
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(DashboardSummary::default()).expect("serialize");
        assert!(value.get("responseRate").is_some());
        assert!(value.get("followUpsDue").is_some());
    }
}
