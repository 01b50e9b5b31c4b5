//! Mock source platform client

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use velosync_core::error::{Result, TransferError};
use velosync_core::source::{ActivityRef, SourceClient};

/// Scripted source client writing fixture payloads into a scratch directory
///
/// The payload bytes become the "raw FIT file"; paired with [`MockCodec`],
/// which treats FIT content as CSV text, a [`TabularFixture`] rendering
/// makes the whole transform pipeline run for real on fixture data.
///
/// [`MockCodec`]: crate::MockCodec
/// [`TabularFixture`]: crate::TabularFixture
pub struct MockSourceClient {
    listing: Vec<ActivityRef>,
    scratch_dir: PathBuf,
    payload: Vec<u8>,
    fail_authenticate: bool,
    fail_download: HashSet<u64>,
    calls: Mutex<SourceCalls>,
}

#[derive(Debug, Default, Clone)]
pub struct SourceCalls {
    pub authenticate: usize,
    pub downloads: Vec<u64>,
}

impl MockSourceClient {
    /// Create a mock writing downloads into `scratch_dir`
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            listing: Vec::new(),
            scratch_dir: scratch_dir.into(),
            payload: Vec::new(),
            fail_authenticate: false,
            fail_download: HashSet::new(),
            calls: Mutex::new(SourceCalls::default()),
        }
    }

    /// Set the activity listing returned by `list_activities`
    pub fn with_listing(mut self, listing: Vec<ActivityRef>) -> Self {
        self.listing = listing;
        self
    }

    /// Set the bytes written for every download
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Make `authenticate` fail
    pub fn failing_authentication(mut self) -> Self {
        self.fail_authenticate = true;
        self
    }

    /// Make `download` fail for the given activity id
    pub fn failing_download_for(mut self, id: u64) -> Self {
        self.fail_download.insert(id);
        self
    }

    /// Snapshot of recorded calls
    pub fn calls(&self) -> SourceCalls {
        self.calls.lock().unwrap().clone()
    }

    /// Path a download for `id` would be written to
    pub fn download_path(&self, id: u64) -> PathBuf {
        self.scratch_dir.join(format!("zwift_activity_{id}.fit"))
    }
}

#[async_trait::async_trait]
impl SourceClient for MockSourceClient {
    async fn authenticate(&self) -> Result<()> {
        self.calls.lock().unwrap().authenticate += 1;
        if self.fail_authenticate {
            return Err(TransferError::authentication("zwift", "mock credentials rejected").into());
        }
        Ok(())
    }

    async fn list_activities(&self) -> Result<Vec<ActivityRef>> {
        Ok(self.listing.clone())
    }

    async fn download(&self, activity: &ActivityRef) -> Result<PathBuf> {
        self.calls.lock().unwrap().downloads.push(activity.id);

        if self.fail_download.contains(&activity.id) {
            return Err(TransferError::connection("zwift", "mock download timed out").into());
        }

        let path = self.download_path(activity.id);
        tokio::fs::write(&path, &self.payload).await?;
        Ok(path)
    }
}
