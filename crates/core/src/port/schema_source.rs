// Schema Source Port
// Where schema files are read from (filesystem in production)

use crate::error::Result;

/// Read-only access to schema files by manifest name
pub trait SchemaSource: Send + Sync {
    /// Whether the file exists
    fn exists(&self, name: &str) -> bool;

    /// Read the raw (unsubstituted) content
    ///
    /// # Errors
    /// - AppError::Source if the file cannot be read
    fn read(&self, name: &str) -> Result<String>;

    /// Human-readable location (e.g. absolute path) for logs
    fn describe(&self, name: &str) -> String;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;

    /// In-memory schema source
    #[derive(Default)]
    pub struct InMemorySchemaSource {
        files: HashMap<String, String>,
    }

    impl InMemorySchemaSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
            self.files.insert(name.into(), content.into());
            self
        }
    }

    impl SchemaSource for InMemorySchemaSource {
        fn exists(&self, name: &str) -> bool {
            self.files.contains_key(name)
        }

        fn read(&self, name: &str) -> Result<String> {
            self.files
                .get(name)
                .cloned()
                .ok_or_else(|| AppError::Source(format!("{} not found", name)))
        }

        fn describe(&self, name: &str) -> String {
            format!("memory://{}", name)
        }
    }
}
