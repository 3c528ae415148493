// Schema Manifest - ordered list of files to deploy

use super::error::{DomainError, Result};
use serde::Serialize;
use std::collections::HashSet;

/// Built-in deployment order
///
/// Keyspace first, then types and functions the tables depend on, then
/// tables, secondary structures and finally data.
pub const BUILTIN_FILES: &[&str] = &[
    "00_keyspace.cql",
    "01_types.cql",
    "02_functions.cql",
    "03_tables.cql",
    "04_indexes.cql",
    "05_materialized_views.cql",
    "06_reference_data.cql",
    "07_seed_data.cql",
];

/// A schema/data definition file, identified by its name relative to the schema directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SchemaFile(String);

impl SchemaFile {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidManifest(
                "file name must not be empty".to_string(),
            ));
        }

        if trimmed.starts_with('/') || trimmed.starts_with('\\') {
            return Err(DomainError::InvalidManifest(format!(
                "'{}' must be relative to the schema directory",
                trimmed
            )));
        }

        if trimmed.split(['/', '\\']).any(|part| part == "..") {
            return Err(DomainError::InvalidManifest(format!(
                "'{}' must not escape the schema directory",
                trimmed
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SchemaFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, duplicate-free list of schema files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    files: Vec<SchemaFile>,
}

impl Manifest {
    /// Validate and build a manifest, preserving the given order
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for name in names {
            let file = SchemaFile::new(name)?;
            if !seen.insert(file.clone()) {
                return Err(DomainError::InvalidManifest(format!(
                    "duplicate entry '{}'",
                    file
                )));
            }
            files.push(file);
        }

        if files.is_empty() {
            return Err(DomainError::InvalidManifest(
                "manifest contains no files".to_string(),
            ));
        }

        Ok(Self { files })
    }

    /// The hardcoded deployment order
    pub fn builtin() -> Self {
        Self {
            files: BUILTIN_FILES
                .iter()
                .map(|name| SchemaFile(name.to_string()))
                .collect(),
        }
    }

    /// Suffix of the manifest starting at `name` (inclusive)
    pub fn starting_from(&self, name: &str) -> Result<Self> {
        let position = self
            .files
            .iter()
            .position(|f| f.as_str() == name.trim())
            .ok_or_else(|| DomainError::UnknownFile(name.to_string()))?;

        Ok(Self {
            files: self.files[position..].to_vec(),
        })
    }

    pub fn files(&self) -> &[SchemaFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaFile> {
        self.files.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order_is_stable() {
        let manifest = Manifest::builtin();
        let names: Vec<&str> = manifest.iter().map(|f| f.as_str()).collect();
        assert_eq!(names, BUILTIN_FILES);
        assert_eq!(names.first(), Some(&"00_keyspace.cql"));
    }

    #[test]
    fn test_builtin_passes_validation() {
        let validated = Manifest::new(BUILTIN_FILES.iter().copied()).unwrap();
        assert_eq!(validated, Manifest::builtin());
    }

    #[test]
    fn test_new_preserves_given_order() {
        let manifest = Manifest::new(["b.cql", "a.cql", "c.cql"]).unwrap();
        let names: Vec<&str> = manifest.iter().map(|f| f.as_str()).collect();
        assert_eq!(names, vec!["b.cql", "a.cql", "c.cql"]);
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let err = Manifest::new(["a.cql", "b.cql", "a.cql"]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_new_rejects_empty_list() {
        let err = Manifest::new(Vec::<String>::new()).unwrap_err();
        assert!(err.to_string().contains("no files"));
    }

    #[test]
    fn test_new_rejects_escaping_paths() {
        assert!(Manifest::new(["../secrets.cql"]).is_err());
        assert!(Manifest::new(["nested/../../x.cql"]).is_err());
        assert!(Manifest::new(["/etc/passwd"]).is_err());
        assert!(Manifest::new(["  "]).is_err());
        assert!(Manifest::new(["nested/ok.cql"]).is_ok());
    }

    #[test]
    fn test_starting_from() {
        let manifest = Manifest::builtin();
        let tail = manifest.starting_from("03_tables.cql").unwrap();

        assert_eq!(tail.len(), BUILTIN_FILES.len() - 3);
        assert_eq!(tail.files()[0].as_str(), "03_tables.cql");

        assert_eq!(
            manifest.starting_from("99_missing.cql").unwrap_err(),
            DomainError::UnknownFile("99_missing.cql".to_string())
        );
    }
}
