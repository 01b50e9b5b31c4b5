//! Mock destination platform client

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use velosync_core::destination::{DestinationClient, UploadOutcome};
use velosync_core::error::{Result, TransferError};

/// Per-call upload behavior
#[derive(Debug, Clone)]
pub enum UploadScript {
    /// Accept the upload with an empty response body
    Accept,
    /// Report the activity as already present (`Ok(Duplicate)`)
    Conflict,
    /// Signal the conflict through the error channel instead
    ConflictError,
    /// Fail with an upload error
    Fail(u16, &'static str),
}

/// Scripted destination client recording authentication and upload calls
pub struct MockDestinationClient {
    script: Mutex<VecDeque<UploadScript>>,
    fail_authenticate: bool,
    calls: Mutex<DestinationCalls>,
}

#[derive(Debug, Default, Clone)]
pub struct DestinationCalls {
    pub authenticate: usize,
    /// Uploaded paths, with whether the file existed at upload time
    pub uploads: Vec<(PathBuf, bool)>,
}

impl MockDestinationClient {
    /// Create a mock accepting every upload
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fail_authenticate: false,
            calls: Mutex::new(DestinationCalls::default()),
        }
    }

    /// Queue per-call behaviors; once drained, uploads are accepted
    pub fn with_script(self, script: impl IntoIterator<Item = UploadScript>) -> Self {
        self.script.lock().unwrap().extend(script);
        self
    }

    /// Make `authenticate` fail
    pub fn failing_authentication(mut self) -> Self {
        self.fail_authenticate = true;
        self
    }

    /// Snapshot of recorded calls
    pub fn calls(&self) -> DestinationCalls {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockDestinationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DestinationClient for MockDestinationClient {
    async fn authenticate(&self) -> Result<()> {
        self.calls.lock().unwrap().authenticate += 1;
        if self.fail_authenticate {
            return Err(
                TransferError::authentication("garmin", "mock credentials rejected").into(),
            );
        }
        Ok(())
    }

    async fn upload(&self, fit_path: &Path) -> Result<UploadOutcome> {
        self.calls
            .lock()
            .unwrap()
            .uploads
            .push((fit_path.to_path_buf(), fit_path.exists()));

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(UploadScript::Accept);

        match next {
            UploadScript::Accept => Ok(UploadOutcome::Accepted(serde_json::Value::Null)),
            UploadScript::Conflict => Ok(UploadOutcome::Duplicate),
            UploadScript::ConflictError => Err(TransferError::UploadConflict.into()),
            UploadScript::Fail(status, message) => Err(TransferError::Upload {
                status,
                message: message.to_string(),
            }
            .into()),
        }
    }
}
