use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Stand-in for `cqlsh`
///
/// Appends its argument list to `calls.log`, copies staged scripts into
/// `captured.cql`, fails scripts containing `FAIL` with exit 3 and fails the
/// `-e` connectivity statement while a `down` marker file exists.
const FAKE_CQLSH: &str = r#"#!/bin/sh
echo "$*" >> "__ROOT__/calls.log"
while [ $# -gt 0 ]; do
  case "$1" in
    -f)
      shift
      echo "staged=$1" >> "__ROOT__/calls.log"
      cat "$1" >> "__ROOT__/captured.cql"
      if grep -q "FAIL" "$1"; then
        echo "SyntaxException: line 1:0 no viable alternative" >&2
        exit 3
      fi
      ;;
    -e)
      shift
      if [ -f "__ROOT__/down" ]; then
        echo "Connection error: Unable to connect to any servers" >&2
        exit 1
      fi
      ;;
  esac
  shift
done
echo "ok"
exit 0
"#;

/// Temporary workspace holding a fake client, a schema directory and a
/// staging directory
pub struct Fixture {
    root: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let script = FAKE_CQLSH.replace("__ROOT__", &root.path().display().to_string());
        let client = root.path().join("fake-cqlsh");

        fs::write(&client, script).unwrap();
        fs::set_permissions(&client, fs::Permissions::from_mode(0o755)).unwrap();
        fs::create_dir(root.path().join("schema")).unwrap();
        fs::create_dir(root.path().join("staging")).unwrap();

        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn client_path(&self) -> PathBuf {
        self.root().join("fake-cqlsh")
    }

    pub fn schema_dir(&self) -> PathBuf {
        self.root().join("schema")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root().join("staging")
    }

    pub fn write_schema(&self, name: &str, content: &str) {
        fs::write(self.schema_dir().join(name), content).unwrap();
    }

    pub fn take_cluster_down(&self) {
        fs::write(self.root().join("down"), "").unwrap();
    }

    /// Lines the fake client appended, in call order
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.root().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Paths of staged scripts the client was handed
    pub fn staged_paths(&self) -> Vec<PathBuf> {
        self.calls()
            .iter()
            .filter_map(|line| line.strip_prefix("staged="))
            .map(PathBuf::from)
            .collect()
    }

    /// Concatenated content of every staged script
    pub fn captured(&self) -> String {
        fs::read_to_string(self.root().join("captured.cql")).unwrap_or_default()
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
