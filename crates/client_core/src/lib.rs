//! Client side of the upload-then-predict workflow.
//!
//! An [`Uploader`] puts a selected file into the object store, the
//! [`Coordinator`] bumps the upload generation on success, and the
//! [`PredictionViewer`] re-fetches the backend's prediction for every new
//! generation it observes. [`Workflow`] wires the three together.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod preview;
pub mod transport;
pub mod uploader;
pub mod viewer;
pub mod workflow;

pub use self::config::ClientSettings;
pub use coordinator::Coordinator;
pub use error::{PredictionFetchError, StorageWriteError, WorkflowError};
pub use preview::{PreviewHandle, PreviewRegistry};
pub use transport::{
    HttpObjectStore, HttpPredictionSource, ObjectStore, PredictionSource, PutObjectRequest,
};
pub use uploader::{LocalFile, UploadOutcome, Uploader};
pub use viewer::{PredictionViewer, RetryPolicy, ViewerState, PREDICTION_PREFIX};
pub use workflow::{Workflow, WorkflowSnapshot};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
