//! VeloSync Core Library
//!
//! Transfers cycling activities from Zwift to Garmin Connect, rewriting the
//! device-identity fields of the binary FIT file in between so the
//! destination accepts the upload as if recorded by a supported device.
//!
//! The pipeline is strictly sequential: authenticate with the source,
//! download the raw FIT file, decode it to a tabular form, patch the
//! identity rows, re-encode, authenticate with the destination, upload, and
//! clean up both temporary files whatever the outcome.

pub mod codec;
pub mod destination;
pub mod error;
pub mod identity;
pub mod processor;
pub mod source;
pub mod transform;

// Re-export main types
pub use codec::{ActivityCodec, FitCsvToolCodec};
pub use destination::{DestinationClient, GarminClient, UploadOutcome};
pub use error::{Error, Result};
pub use identity::{DeviceIdentity, IdentityPatcher};
pub use processor::{ActivityProcessor, RunStatus, RunSummary};
pub use source::{ActivityRef, SourceClient, ZwiftClient};
pub use transform::{TransformReport, Transformer};
