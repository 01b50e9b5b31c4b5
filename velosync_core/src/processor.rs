//! Activity transfer orchestrator
//!
//! Sequences one activity at a time through: source auth → download →
//! transform → destination auth → upload → cleanup. Strictly sequential,
//! no overlap within or across activities. Every per-activity failure is
//! caught here, logged with context, and folded into the returned
//! [`RunSummary`]; nothing propagates past this boundary.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use log::{error, info};
use serde::Serialize;

use crate::destination::{DestinationClient, UploadOutcome};
use crate::error::Result;
use crate::source::{ActivityRef, SourceClient};
use crate::transform::{Transformer, remove_best_effort};

/// Terminal status of a processing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every selected activity reached the destination (or was already there)
    Completed,
    /// The source listing had nothing to process; a normal outcome
    NoActivities,
    /// A step failed; the batch was aborted at that activity
    Failed,
}

/// Outcome of one processing run, JSON-serializable for the HTTP trigger
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: RunStatus,
    /// Activities selected for processing
    pub selected: usize,
    /// Activities newly uploaded to the destination
    pub transferred: usize,
    /// Activities the destination already had (conflict, success-equivalent)
    pub duplicates: usize,
    /// Failure description when `status` is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.status != RunStatus::Failed
    }

    fn no_activities() -> Self {
        Self {
            status: RunStatus::NoActivities,
            selected: 0,
            transferred: 0,
            duplicates: 0,
            failure: None,
        }
    }

    fn failed(message: String, selected: usize, transferred: usize, duplicates: usize) -> Self {
        Self {
            status: RunStatus::Failed,
            selected,
            transferred,
            duplicates,
            failure: Some(message),
        }
    }
}

/// How a run picks activities from the source listing
enum Selection {
    /// First activity in listing order
    Latest,
    /// First `n` activities in listing order
    LastN(usize),
    /// Every activity starting strictly after the cutoff date
    SinceDate(NaiveDate),
}

/// Orchestrates activity transfer from the source to the destination
pub struct ActivityProcessor {
    source: Arc<dyn SourceClient>,
    destination: Arc<dyn DestinationClient>,
    transformer: Transformer,
}

impl ActivityProcessor {
    /// Create a processor over injected platform clients and transformer
    pub fn new(
        source: Arc<dyn SourceClient>,
        destination: Arc<dyn DestinationClient>,
        transformer: Transformer,
    ) -> Self {
        Self {
            source,
            destination,
            transformer,
        }
    }

    /// Transfer the most recent activity
    pub async fn process_latest_activity(&self) -> RunSummary {
        self.run(Selection::Latest).await
    }

    /// Transfer the `n` most recent activities, in listing order
    ///
    /// The batch aborts at the first failing activity; activities already
    /// transferred stay transferred.
    pub async fn process_last_activities(&self, n: usize) -> RunSummary {
        self.run(Selection::LastN(n)).await
    }

    /// Transfer every activity recorded strictly after `cutoff`
    ///
    /// The comparison strips timezone information from activity timestamps
    /// (wall-clock against midnight of the cutoff date), matching the
    /// platform's listing semantics.
    pub async fn process_activities_since(&self, cutoff: NaiveDate) -> RunSummary {
        self.run(Selection::SinceDate(cutoff)).await
    }

    async fn run(&self, selection: Selection) -> RunSummary {
        info!("Starting activity processing...");

        let selected = match self.select_activities(&selection).await {
            Ok(selected) => selected,
            Err(e) => {
                error!("Activity processing failed: {e}");
                return RunSummary::failed(e.to_string(), 0, 0, 0);
            }
        };

        if selected.is_empty() {
            info!("No activities found to process");
            return RunSummary::no_activities();
        }

        let mut transferred = 0;
        let mut duplicates = 0;
        for activity in &selected {
            match self.transfer_one(activity).await {
                Ok(UploadOutcome::Accepted(_)) => transferred += 1,
                Ok(UploadOutcome::Duplicate) => {
                    info!("Activity {} already on the destination", activity.id);
                    duplicates += 1;
                }
                Err(e) => {
                    // One failure aborts the remaining batch.
                    error!("Processing activity {} failed: {e}", activity.id);
                    return RunSummary::failed(
                        format!("activity {}: {e}", activity.id),
                        selected.len(),
                        transferred,
                        duplicates,
                    );
                }
            }
        }

        info!("Activity processing completed successfully");
        RunSummary {
            status: RunStatus::Completed,
            selected: selected.len(),
            transferred,
            duplicates,
            failure: None,
        }
    }

    async fn select_activities(&self, selection: &Selection) -> Result<Vec<ActivityRef>> {
        self.source.authenticate().await?;
        let activities = self.source.list_activities().await?;
        Ok(select(activities, selection))
    }

    /// Run one activity through the full pipeline
    ///
    /// Owns both temporary files and removes them whatever the outcome;
    /// cleanup failures are logged, never escalated.
    async fn transfer_one(&self, activity: &ActivityRef) -> Result<UploadOutcome> {
        let mut temp_files: Vec<PathBuf> = Vec::new();
        let result = self.transfer_inner(activity, &mut temp_files).await;

        for path in &temp_files {
            remove_best_effort(path);
        }

        result
    }

    async fn transfer_inner(
        &self,
        activity: &ActivityRef,
        temp_files: &mut Vec<PathBuf>,
    ) -> Result<UploadOutcome> {
        let raw = self.source.download(activity).await?;
        temp_files.push(raw.clone());

        let modified = self.transformer.modify_device_info(&raw).await?;
        temp_files.push(modified.clone());

        // Sessions are not assumed to survive across iterations.
        self.destination.authenticate().await?;

        match self.destination.upload(&modified).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_upload_conflict() => Ok(UploadOutcome::Duplicate),
            Err(e) => Err(e),
        }
    }
}

/// Apply a selection rule to the flattened listing
fn select(activities: Vec<ActivityRef>, selection: &Selection) -> Vec<ActivityRef> {
    match selection {
        Selection::Latest => activities.into_iter().take(1).collect(),
        Selection::LastN(n) => activities.into_iter().take(*n).collect(),
        Selection::SinceDate(cutoff) => {
            let cutoff = cutoff.and_time(chrono::NaiveTime::MIN);
            activities
                .into_iter()
                .filter(|activity| activity.start_date.naive_local() > cutoff)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(id: u64, start: &str) -> ActivityRef {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "fitFileBucket": "bucket",
            "fitFileKey": format!("key/{id}.fit"),
            "startDate": start,
        }))
        .unwrap()
    }

    #[test]
    fn test_latest_takes_first_in_listing_order() {
        let listing = vec![
            activity(3, "2026-08-03T08:00:00.000+0000"),
            activity(2, "2026-08-02T08:00:00.000+0000"),
        ];
        let picked = select(listing, &Selection::Latest);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, 3);
    }

    #[test]
    fn test_last_n_clamps_to_listing_length() {
        let listing = vec![
            activity(3, "2026-08-03T08:00:00.000+0000"),
            activity(2, "2026-08-02T08:00:00.000+0000"),
        ];
        assert_eq!(select(listing, &Selection::LastN(5)).len(), 2);
    }

    #[test]
    fn test_since_date_picks_strictly_later_regardless_of_order() {
        let cutoff = NaiveDate::from_ymd_opt(2026, 8, 2).unwrap();
        // Deliberately unordered listing.
        let listing = vec![
            activity(1, "2026-08-01T23:59:00.000+0000"),
            activity(3, "2026-08-03T06:00:00.000+0000"),
            activity(2, "2026-08-02T00:00:01.000+0000"),
        ];

        let picked = select(listing, &Selection::SinceDate(cutoff));
        let ids: Vec<u64> = picked.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_since_date_comparison_is_timezone_naive() {
        // 2026-08-01T23:00 at +02:00 is 21:00 UTC, but the naive wall-clock
        // reading keeps it before the Aug 2 cutoff.
        let cutoff = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let listing = vec![activity(1, "2026-08-01T23:00:00.000+0200")];

        let picked = select(listing, &Selection::SinceDate(cutoff));
        assert_eq!(picked.len(), 1);

        let cutoff = NaiveDate::from_ymd_opt(2026, 8, 2).unwrap();
        let listing = vec![activity(1, "2026-08-01T23:00:00.000+0200")];
        assert!(select(listing, &Selection::SinceDate(cutoff)).is_empty());
    }
}
