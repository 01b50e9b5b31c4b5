//! Orchestration tests over scripted platform clients and the mock codec

use std::sync::Arc;

use chrono::NaiveDate;
use velosync_core::identity::DeviceIdentity;
use velosync_core::processor::{ActivityProcessor, RunStatus};
use velosync_core::transform::Transformer;
use velosync_test_utils::{
    MockCodec, MockDestinationClient, MockSourceClient, TabularFixture, UploadScript, activity_ref,
};

struct Harness {
    processor: ActivityProcessor,
    source: Arc<MockSourceClient>,
    destination: Arc<MockDestinationClient>,
    _scratch: tempfile::TempDir,
}

fn harness(source: MockSourceClient, destination: MockDestinationClient) -> Harness {
    let scratch = tempfile::tempdir().unwrap();
    let source = Arc::new(source);
    let destination = Arc::new(destination);
    let transformer = Transformer::new(
        Arc::new(MockCodec::new()),
        DeviceIdentity::default(),
        scratch.path(),
    );

    Harness {
        processor: ActivityProcessor::new(source.clone(), destination.clone(), transformer),
        source,
        destination,
        _scratch: scratch,
    }
}

fn source_with(scratch: &std::path::Path, ids: &[(u64, &str)]) -> MockSourceClient {
    let listing = ids.iter().map(|(id, date)| activity_ref(*id, date)).collect();
    MockSourceClient::new(scratch)
        .with_listing(listing)
        .with_payload(TabularFixture::default().to_csv())
}

#[tokio::test]
async fn latest_transfers_first_listed_activity() {
    let scratch = tempfile::tempdir().unwrap();
    let source = source_with(
        scratch.path(),
        &[
            (7, "2026-08-03T08:00:00.000+0000"),
            (6, "2026-08-02T08:00:00.000+0000"),
        ],
    );
    let h = harness(source, MockDestinationClient::new());

    let summary = h.processor.process_latest_activity().await;

    assert!(summary.is_success());
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.transferred, 1);
    assert_eq!(h.source.calls().downloads, vec![7]);

    let dest = h.destination.calls();
    assert_eq!(dest.authenticate, 1);
    assert_eq!(dest.uploads.len(), 1);
    let (uploaded, existed_at_upload) = &dest.uploads[0];
    assert!(*existed_at_upload, "file must exist while uploading");
    assert!(
        uploaded
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("modified_"),
        "the transformed file is uploaded, not the raw one"
    );
    // Both temp files are gone once processing finished.
    assert!(!uploaded.exists());
    assert!(!h.source.download_path(7).exists());
}

#[tokio::test]
async fn empty_listing_is_a_normal_outcome_for_all_variants() {
    let scratch = tempfile::tempdir().unwrap();
    let h = harness(
        source_with(scratch.path(), &[]),
        MockDestinationClient::new(),
    );

    let latest = h.processor.process_latest_activity().await;
    let last_n = h.processor.process_last_activities(5).await;
    let since = h
        .processor
        .process_activities_since(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
        .await;

    for summary in [latest, last_n, since] {
        assert!(summary.is_success());
        assert_eq!(summary.status, RunStatus::NoActivities);
        assert_eq!(summary.transferred, 0);
    }
    assert!(h.destination.calls().uploads.is_empty());
}

#[tokio::test]
async fn upload_conflict_is_success_equivalent() {
    let scratch = tempfile::tempdir().unwrap();
    let source = source_with(scratch.path(), &[(7, "2026-08-03T08:00:00.000+0000")]);
    let destination = MockDestinationClient::new().with_script([UploadScript::Conflict]);
    let h = harness(source, destination);

    let summary = h.processor.process_latest_activity().await;

    assert!(summary.is_success());
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.transferred, 0);
}

#[tokio::test]
async fn conflict_signaled_as_error_is_also_swallowed() {
    let scratch = tempfile::tempdir().unwrap();
    let source = source_with(scratch.path(), &[(7, "2026-08-03T08:00:00.000+0000")]);
    let destination = MockDestinationClient::new().with_script([UploadScript::ConflictError]);
    let h = harness(source, destination);

    let summary = h.processor.process_latest_activity().await;

    assert!(summary.is_success());
    assert_eq!(summary.duplicates, 1);
}

#[tokio::test]
async fn transform_failure_still_cleans_up_the_downloaded_file() {
    let scratch = tempfile::tempdir().unwrap();
    let source = Arc::new(source_with(
        scratch.path(),
        &[(9, "2026-08-03T08:00:00.000+0000")],
    ));
    let destination = Arc::new(MockDestinationClient::new());
    let transformer = Transformer::new(
        Arc::new(MockCodec::new().failing_encode()),
        DeviceIdentity::default(),
        scratch.path(),
    );
    let processor = ActivityProcessor::new(source.clone(), destination.clone(), transformer);

    let summary = processor.process_latest_activity().await;

    assert!(!summary.is_success());
    assert_eq!(summary.status, RunStatus::Failed);
    assert!(summary.failure.unwrap().contains("mock encode failure"));
    // The raw file was downloaded, then deleted on the failure path; the
    // transformed file never came to exist.
    assert_eq!(source.calls().downloads, vec![9]);
    assert!(!source.download_path(9).exists());
    assert!(destination.calls().uploads.is_empty());
}

#[tokio::test]
async fn batch_aborts_on_first_failure() {
    let scratch = tempfile::tempdir().unwrap();
    let source = source_with(
        scratch.path(),
        &[
            (1, "2026-08-03T08:00:00.000+0000"),
            (2, "2026-08-02T08:00:00.000+0000"),
            (3, "2026-08-01T08:00:00.000+0000"),
        ],
    )
    .failing_download_for(2);
    let h = harness(source, MockDestinationClient::new());

    let summary = h.processor.process_last_activities(3).await;

    assert!(!summary.is_success());
    assert_eq!(summary.transferred, 1);
    assert_eq!(summary.selected, 3);
    // The third activity is never attempted once the second fails.
    assert_eq!(h.source.calls().downloads, vec![1, 2]);
}

#[tokio::test]
async fn destination_reauthenticates_before_every_upload() {
    let scratch = tempfile::tempdir().unwrap();
    let source = source_with(
        scratch.path(),
        &[
            (1, "2026-08-03T08:00:00.000+0000"),
            (2, "2026-08-02T08:00:00.000+0000"),
        ],
    );
    let h = harness(source, MockDestinationClient::new());

    let summary = h.processor.process_last_activities(2).await;

    assert!(summary.is_success());
    assert_eq!(summary.transferred, 2);
    assert_eq!(h.destination.calls().authenticate, 2);
}

#[tokio::test]
async fn since_date_selects_by_start_timestamp_not_listing_order() {
    let scratch = tempfile::tempdir().unwrap();
    let source = source_with(
        scratch.path(),
        &[
            (1, "2026-08-01T06:00:00.000+0000"),
            (3, "2026-08-03T06:00:00.000+0000"),
            (2, "2026-08-02T06:00:00.000+0000"),
        ],
    );
    let h = harness(source, MockDestinationClient::new());

    let summary = h
        .processor
        .process_activities_since(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap())
        .await;

    assert!(summary.is_success());
    assert_eq!(summary.transferred, 2);
    assert_eq!(h.source.calls().downloads, vec![3, 2]);
}

#[tokio::test]
async fn non_conflict_upload_failure_is_fatal() {
    let scratch = tempfile::tempdir().unwrap();
    let source = source_with(scratch.path(), &[(7, "2026-08-03T08:00:00.000+0000")]);
    let destination =
        MockDestinationClient::new().with_script([UploadScript::Fail(500, "server error")]);
    let h = harness(source, destination);

    let summary = h.processor.process_latest_activity().await;

    assert!(!summary.is_success());
    assert!(summary.failure.unwrap().contains("500"));
}

#[tokio::test]
async fn source_authentication_failure_aborts_before_any_download() {
    let scratch = tempfile::tempdir().unwrap();
    let source = source_with(scratch.path(), &[(7, "2026-08-03T08:00:00.000+0000")])
        .failing_authentication();
    let h = harness(source, MockDestinationClient::new());

    let summary = h.processor.process_latest_activity().await;

    assert!(!summary.is_success());
    assert!(h.source.calls().downloads.is_empty());
}
