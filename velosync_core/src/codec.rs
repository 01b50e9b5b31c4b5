//! Binary↔tabular codec seam
//!
//! The FIT binary format is never parsed here. Conversion in both
//! directions is delegated to Garmin's FitCSVTool, invoked as a subprocess
//! behind the [`ActivityCodec`] trait so the transform pipeline can be
//! exercised against a mock codec in tests.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::debug;

use crate::error::{Result, TransformError, ValidationError};

/// Stateless decode/encode service for the binary activity format
///
/// `decode` produces a CSV rendering of the FIT file next to the input;
/// `encode` rebuilds a FIT file (header and CRC recomputed) from a CSV.
/// Implementations own their external tooling lifecycle; the orchestrator
/// only sees paths.
#[async_trait::async_trait]
pub trait ActivityCodec: Send + Sync {
    /// Decode a FIT file into its tabular form, returning the CSV path
    async fn decode(&self, fit_path: &Path) -> Result<PathBuf>;

    /// Encode a tabular form back into a FIT file at `fit_path`
    async fn encode(&self, csv_path: &Path, fit_path: &Path) -> Result<()>;
}

/// Codec backed by the FitCSVTool JAR, run with `java -jar` per call
///
/// The JAR and the `java` launcher are resolved once at construction, so a
/// missing toolchain is a startup failure rather than a mid-pipeline one.
#[derive(Debug)]
pub struct FitCsvToolCodec {
    jar_path: PathBuf,
    java_bin: PathBuf,
}

impl FitCsvToolCodec {
    /// Create a codec, validating that the converter JAR exists
    pub fn new(jar_path: impl Into<PathBuf>) -> Result<Self> {
        let jar_path = jar_path.into();
        if !jar_path.exists() {
            return Err(ValidationError::invalid_configuration(&format!(
                "FitCSVTool jar not found at {}",
                jar_path.display()
            ))
            .into());
        }

        Ok(Self {
            jar_path,
            java_bin: PathBuf::from("java"),
        })
    }

    /// Override the `java` launcher path
    pub fn with_java_bin(mut self, java_bin: impl Into<PathBuf>) -> Self {
        self.java_bin = java_bin.into();
        self
    }

    async fn run_tool(&self, args: &[&Path]) -> std::io::Result<std::process::Output> {
        let mut command = tokio::process::Command::new(&self.java_bin);
        command
            .arg("-jar")
            .arg(&self.jar_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("Running FitCSVTool: {command:?}");
        command.output().await
    }
}

#[async_trait::async_trait]
impl ActivityCodec for FitCsvToolCodec {
    async fn decode(&self, fit_path: &Path) -> Result<PathBuf> {
        let output = self
            .run_tool(&[fit_path])
            .await
            .map_err(|e| TransformError::decode(fit_path, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransformError::decode(
                fit_path,
                format!("FitCSVTool exited with {}: {}", output.status, stderr.trim()),
            )
            .into());
        }

        let csv_path = fit_path.with_extension("csv");
        if !csv_path.exists() {
            return Err(TransformError::decode(
                fit_path,
                "FitCSVTool reported success but produced no CSV output",
            )
            .into());
        }

        debug!("Decoded {} to {}", fit_path.display(), csv_path.display());
        Ok(csv_path)
    }

    async fn encode(&self, csv_path: &Path, fit_path: &Path) -> Result<()> {
        let output = self
            .run_tool(&[Path::new("-c"), csv_path, fit_path])
            .await
            .map_err(|e| TransformError::encode(fit_path, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransformError::encode(
                fit_path,
                format!("FitCSVTool exited with {}: {}", output.status, stderr.trim()),
            )
            .into());
        }

        debug!("Encoded {} to {}", csv_path.display(), fit_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_jar_is_a_startup_failure() {
        let error = FitCsvToolCodec::new("/nonexistent/FitCSVTool.jar").unwrap_err();
        assert!(error.to_string().contains("FitCSVTool jar not found"));
    }

    #[test]
    fn test_existing_jar_is_accepted() {
        let jar = tempfile::NamedTempFile::new().unwrap();
        assert!(FitCsvToolCodec::new(jar.path()).is_ok());
    }
}
