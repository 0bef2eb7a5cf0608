use bindle_utils::indexmap::FxIndexMap;
use serde::Serialize;

/// Maps logical chunk/entry names and source-relative asset paths to the
/// final (possibly hashed) filenames. The seam the HTML-injection
/// collaborator consumes.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Manifest(pub FxIndexMap<String, String>);

impl Manifest {
  pub fn insert(&mut self, logical: impl Into<String>, filename: impl Into<String>) {
    self.0.insert(logical.into(), filename.into());
  }

  pub fn get(&self, logical: &str) -> Option<&str> {
    self.0.get(logical).map(String::as_str)
  }

  pub fn to_json(&self) -> String {
    serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
  }
}
