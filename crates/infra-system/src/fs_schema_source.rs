// Filesystem schema source
use std::path::PathBuf;

use cqldeploy_core::error::{AppError, Result};
use cqldeploy_core::port::SchemaSource;

/// Resolves manifest names relative to a schema directory
pub struct FsSchemaSource {
    root: PathBuf,
}

impl FsSchemaSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl SchemaSource for FsSchemaSource {
    fn exists(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }

    fn read(&self, name: &str) -> Result<String> {
        let path = self.path_of(name);
        std::fs::read_to_string(&path)
            .map_err(|e| AppError::Source(format!("{}: {}", path.display(), e)))
    }

    fn describe(&self, name: &str) -> String {
        self.path_of(name).display().to_string()
    }
}
