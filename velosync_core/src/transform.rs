//! Transform orchestrator: decode → patch → encode
//!
//! Drives the codec and the identity patcher over one activity file,
//! managing the intermediate CSV paths. Strictly serial; each step consumes
//! the previous step's output. Codec failures are fatal for the activity
//! and never retried.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::codec::ActivityCodec;
use crate::error::{IoError, Result};
use crate::identity::{DeviceIdentity, IdentityPatcher, validate_header};

/// Outcome of one transform, for logging and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformReport {
    /// Path of the re-encoded FIT file
    pub output: PathBuf,
    /// Number of rows whose identity fields were rewritten
    pub patched_rows: usize,
    /// Total rows seen (excluding the header)
    pub total_rows: usize,
}

/// Rewrites the device identity inside a FIT activity file
pub struct Transformer {
    codec: Arc<dyn ActivityCodec>,
    patcher: IdentityPatcher,
    scratch_dir: PathBuf,
}

impl Transformer {
    /// Create a transformer writing modified files into `scratch_dir`
    pub fn new(
        codec: Arc<dyn ActivityCodec>,
        identity: DeviceIdentity,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            codec,
            patcher: IdentityPatcher::new(identity),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Rewrite the device identity of `fit_path`, returning the new file
    ///
    /// The input must exist on local storage. On success the returned path
    /// names a structurally valid FIT file (framing recomputed by the
    /// encode step) under the scratch directory, named
    /// `modified_<basename>`. Intermediate CSVs are removed best-effort.
    pub async fn modify_device_info(&self, fit_path: &Path) -> Result<PathBuf> {
        let report = self.modify_device_info_report(fit_path).await?;
        Ok(report.output)
    }

    /// As [`Self::modify_device_info`], also reporting row counts
    pub async fn modify_device_info_report(&self, fit_path: &Path) -> Result<TransformReport> {
        if !fit_path.exists() {
            return Err(IoError::file_not_found(fit_path).into());
        }

        info!("Modifying device info in {}", fit_path.display());

        let csv_in = self.codec.decode(fit_path).await?;
        let csv_out = appended_path(&csv_in, "_mod");
        let output = self.modified_output_path(fit_path);

        let patch_result = self.patch_tabular_file(&csv_in, &csv_out);
        let encode_result = match &patch_result {
            Ok(_) => self.codec.encode(&csv_out, &output).await,
            Err(_) => Ok(()),
        };

        remove_best_effort(&csv_in);
        remove_best_effort(&csv_out);

        let (patched_rows, total_rows) = patch_result?;
        encode_result?;

        info!(
            "Patched {patched_rows} of {total_rows} rows, modified file at {}",
            output.display()
        );

        Ok(TransformReport {
            output,
            patched_rows,
            total_rows,
        })
    }

    /// Stream the decoded CSV through the patcher into `csv_out`
    fn patch_tabular_file(&self, csv_in: &Path, csv_out: &Path) -> Result<(usize, usize)> {
        // Rows have varying column counts, one triplet group per field.
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(csv_in)?;
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(csv_out)?;

        let mut rows = reader.records();
        let header: Vec<String> = match rows.next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => {
                return Err(crate::error::TransformError::schema_mismatch(
                    "decoded tabular file is empty",
                )
                .into());
            }
        };
        validate_header(&header)?;
        writer.write_record(&header)?;

        let mut patched_rows = 0;
        let mut total_rows = 0;
        for (index, record) in rows.enumerate() {
            let mut row: Vec<String> = record?.iter().map(str::to_string).collect();
            if self.patcher.patch_row(index + 1, &mut row)? {
                patched_rows += 1;
            }
            writer.write_record(&row)?;
            total_rows += 1;
        }
        writer.flush()?;

        debug!("Wrote patched tabular form to {}", csv_out.display());
        Ok((patched_rows, total_rows))
    }

    fn modified_output_path(&self, fit_path: &Path) -> PathBuf {
        let base = fit_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "activity.fit".to_string());
        self.scratch_dir.join(format!("modified_{base}"))
    }
}

/// Append a suffix to the final path component (`a.csv` → `a.csv_mod`)
fn appended_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(suffix);
    path.with_file_name(name)
}

/// Remove a temporary file, logging rather than escalating on failure
pub fn remove_best_effort(path: &Path) {
    if !path.exists() {
        return;
    }
    match std::fs::remove_file(path) {
        Ok(()) => info!("Cleaned up file: {}", path.display()),
        Err(e) => warn!("Failed to clean up {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appended_path_keeps_directory() {
        let path = appended_path(Path::new("/tmp/ride.csv"), "_mod");
        assert_eq!(path, Path::new("/tmp/ride.csv_mod"));
    }

    #[test]
    fn test_remove_best_effort_ignores_missing_files() {
        remove_best_effort(Path::new("/tmp/velosync-does-not-exist.fit"));
    }
}
