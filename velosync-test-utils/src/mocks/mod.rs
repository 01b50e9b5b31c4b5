//! Mock implementations of the pipeline's external seams

mod codec;
mod destination;
mod source;

pub use codec::MockCodec;
pub use destination::{MockDestinationClient, UploadScript};
pub use source::MockSourceClient;
