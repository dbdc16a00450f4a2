use std::path::{Path, PathBuf};

use super::NextCallFlag;
use crate::Result;

/// Next-call flag backed by the presence of a file
///
/// Other tools (a web dashboard, a shell alias) set the flag by creating
/// the file.
#[derive(Debug, Clone)]
pub struct FileNextCallFlag {
    path: PathBuf,
}

impl FileNextCallFlag {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NextCallFlag for FileNextCallFlag {
    fn is_set(&self) -> bool {
        self.path.exists()
    }

    fn toggle(&self) -> Result<bool> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            tracing::debug!(path = %self.path.display(), "next call flag cleared");
            Ok(false)
        } else {
            std::fs::write(&self.path, "Permit")?;
            tracing::debug!(path = %self.path.display(), "next call flag set");
            Ok(true)
        }
    }
}
