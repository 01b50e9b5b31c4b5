//! Transform pipeline tests over the mock codec
//!
//! The mock codec treats FIT content as CSV text, so writing a tabular
//! fixture as the "binary" input exercises the real decode → patch →
//! encode flow end to end.

use std::path::Path;
use std::sync::Arc;

use velosync_core::identity::DeviceIdentity;
use velosync_core::transform::Transformer;
use velosync_test_utils::{MockCodec, TabularFixture};

fn transformer(codec: Arc<MockCodec>, scratch: &Path) -> Transformer {
    Transformer::new(codec, DeviceIdentity::default(), scratch)
}

async fn write_fixture(dir: &Path, fixture: &TabularFixture) -> std::path::PathBuf {
    let fit_path = dir.join("zwift_activity_100.fit");
    tokio::fs::write(&fit_path, fixture.to_csv()).await.unwrap();
    fit_path
}

fn parse_rows(csv: &str) -> Vec<Vec<String>> {
    csv.lines()
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn patches_exactly_the_identity_rows() {
    let dir = tempfile::tempdir().unwrap();
    let codec = Arc::new(MockCodec::new());
    let fixture = TabularFixture::new()
        .with_file_id("260", "15")
        .with_device_info("260", "15", "1.13")
        .with_device_info("263", "21", "2.0")
        .with_record_row("250")
        .with_record_row("310");
    let fit_path = write_fixture(dir.path(), &fixture).await;

    let report = transformer(codec.clone(), dir.path())
        .modify_device_info_report(&fit_path)
        .await
        .unwrap();

    // One file_id data row plus two device_info rows; the file_id
    // definition row and the record rows pass through.
    assert_eq!(report.patched_rows, 3);
    assert_eq!(report.total_rows, fixture.rows().len() - 1);
    assert!(report.output.exists());
    assert_eq!(
        report.output.file_name().unwrap().to_str().unwrap(),
        "modified_zwift_activity_100.fit"
    );

    let encoded = codec.last_encoded_csv().unwrap();
    let rows = parse_rows(&encoded);
    assert_eq!(rows.len(), fixture.rows().len());

    for (row, original) in rows.iter().zip(fixture.rows()) {
        match (row[0].as_str(), row.get(2).map(String::as_str)) {
            ("Data", Some("file_id")) => {
                assert_eq!(row[7], "1");
                assert_eq!(row[9], "garmin_product");
                assert_eq!(row[10], "3570");
                assert_eq!(row[4], original[4], "serial number must pass through");
            }
            ("Data", Some("device_info")) => {
                assert_eq!(row[7], "1");
                assert_eq!(row[10], "3570");
                assert_eq!(row[13], "9.75");
            }
            _ => assert_eq!(row, original, "non-identity rows must pass through"),
        }
    }
}

#[tokio::test]
async fn transform_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let codec = Arc::new(MockCodec::new());
    let fit_path = write_fixture(dir.path(), &TabularFixture::default()).await;
    let transformer = transformer(codec.clone(), dir.path());

    let first = transformer.modify_device_info(&fit_path).await.unwrap();
    let first_csv = codec.last_encoded_csv().unwrap();

    transformer.modify_device_info(&first).await.unwrap();
    let second_csv = codec.last_encoded_csv().unwrap();

    assert_eq!(first_csv, second_csv);
}

#[tokio::test]
async fn missing_input_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let codec = Arc::new(MockCodec::new());

    let error = transformer(codec, dir.path())
        .modify_device_info(&dir.path().join("missing.fit"))
        .await
        .unwrap_err();

    assert!(error.to_string().contains("File not found"));
}

#[tokio::test]
async fn decode_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let codec = Arc::new(MockCodec::new().failing_decode());
    let fit_path = write_fixture(dir.path(), &TabularFixture::default()).await;

    let error = transformer(codec, dir.path())
        .modify_device_info(&fit_path)
        .await
        .unwrap_err();

    assert!(error.to_string().contains("mock decode failure"));
    assert!(!dir.path().join("modified_zwift_activity_100.fit").exists());
}

#[tokio::test]
async fn encode_failure_still_cleans_up_intermediates() {
    let dir = tempfile::tempdir().unwrap();
    let codec = Arc::new(MockCodec::new().failing_encode());
    let fit_path = write_fixture(dir.path(), &TabularFixture::default()).await;

    let error = transformer(codec, dir.path())
        .modify_device_info(&fit_path)
        .await
        .unwrap_err();

    assert!(error.to_string().contains("mock encode failure"));
    assert!(!fit_path.with_extension("csv").exists());
    assert!(!dir.path().join("zwift_activity_100.csv_mod").exists());
}

#[tokio::test]
async fn unexpected_header_fails_loudly() {
    let dir = tempfile::tempdir().unwrap();
    let codec = Arc::new(MockCodec::new());
    let fixture = TabularFixture::headerless()
        .with_row(&["Kind", "Slot", "Name", "Column 1"])
        .with_device_info("260", "15", "1.13");
    let fit_path = write_fixture(dir.path(), &fixture).await;

    let error = transformer(codec, dir.path())
        .modify_device_info(&fit_path)
        .await
        .unwrap_err();

    assert!(error.to_string().contains("Unexpected tabular schema"));
}

#[tokio::test]
async fn truncated_identity_row_fails_instead_of_skipping() {
    let dir = tempfile::tempdir().unwrap();
    let codec = Arc::new(MockCodec::new());
    let fixture = TabularFixture::new().with_row(&["Data", "0", "file_id", "manufacturer"]);
    let fit_path = write_fixture(dir.path(), &fixture).await;

    let error = transformer(codec, dir.path())
        .modify_device_info(&fit_path)
        .await
        .unwrap_err();

    assert!(error.to_string().contains("Malformed row"));
}
