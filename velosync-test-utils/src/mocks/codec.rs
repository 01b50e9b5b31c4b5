//! Mock binary↔tabular codec

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use velosync_core::codec::ActivityCodec;
use velosync_core::error::{Result, TransformError};

/// Codec treating FIT content as CSV text
///
/// `decode` copies the "binary" file to a sibling `.csv`; `encode` copies
/// the CSV back to the target path and captures its text so tests can
/// re-inspect what the patcher produced.
pub struct MockCodec {
    fail_decode: bool,
    fail_encode: bool,
    encoded: Mutex<Vec<(PathBuf, String)>>,
}

impl MockCodec {
    pub fn new() -> Self {
        Self {
            fail_decode: false,
            fail_encode: false,
            encoded: Mutex::new(Vec::new()),
        }
    }

    /// Make `decode` fail
    pub fn failing_decode(mut self) -> Self {
        self.fail_decode = true;
        self
    }

    /// Make `encode` fail
    pub fn failing_encode(mut self) -> Self {
        self.fail_encode = true;
        self
    }

    /// CSV text of the most recent encode call
    pub fn last_encoded_csv(&self) -> Option<String> {
        self.encoded
            .lock()
            .unwrap()
            .last()
            .map(|(_, csv)| csv.clone())
    }

    /// All encode calls as `(output path, csv text)`
    pub fn encoded(&self) -> Vec<(PathBuf, String)> {
        self.encoded.lock().unwrap().clone()
    }
}

impl Default for MockCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ActivityCodec for MockCodec {
    async fn decode(&self, fit_path: &Path) -> Result<PathBuf> {
        if self.fail_decode {
            return Err(TransformError::decode(fit_path, "mock decode failure").into());
        }

        let csv_path = fit_path.with_extension("csv");
        tokio::fs::copy(fit_path, &csv_path).await?;
        Ok(csv_path)
    }

    async fn encode(&self, csv_path: &Path, fit_path: &Path) -> Result<()> {
        if self.fail_encode {
            return Err(TransformError::encode(fit_path, "mock encode failure").into());
        }

        let text = tokio::fs::read_to_string(csv_path).await?;
        tokio::fs::copy(csv_path, fit_path).await?;
        self.encoded
            .lock()
            .unwrap()
            .push((fit_path.to_path_buf(), text));
        Ok(())
    }
}
