//! Test utilities for VeloSync
//!
//! This crate provides mock implementations of the platform client and
//! codec seams, plus a builder for tabular activity fixtures, so the
//! transfer pipeline can be tested without network access or the
//! FitCSVTool toolchain.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{TabularFixture, activity_ref};
pub use mocks::{MockCodec, MockDestinationClient, MockSourceClient, UploadScript};
