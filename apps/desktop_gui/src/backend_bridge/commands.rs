//! Backend commands queued from UI to backend worker.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    SelectFile { path: PathBuf },
    Upload,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectFile { .. } => "select_file",
            Self::Upload => "upload",
        }
    }
}
