use std::path::Path;

use arcstr::ArcStr;
use sugar_path::SugarPath;

/// `ModuleId` is the unique string identity of one module: the resolved
/// absolute path, optionally followed by an import query (`?raw`, `?url`,
/// `?inline`). The same file imported with different queries is a different
/// module. Stable across rebuilds unless the underlying file moves.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct ModuleId(ArcStr);

impl ModuleId {
  pub fn new(value: impl Into<ArcStr>) -> Self {
    Self(value.into())
  }

  pub fn from_parts(path: &str, query: Option<&str>) -> Self {
    match query {
      Some(query) => Self(arcstr::format!("{path}?{query}")),
      None => Self(ArcStr::from(path)),
    }
  }

  /// The filesystem path, with any query stripped.
  pub fn path(&self) -> &Path {
    Path::new(self.path_str())
  }

  pub fn path_str(&self) -> &str {
    self.0.split('?').next().unwrap_or(&self.0)
  }

  pub fn query(&self) -> Option<&str> {
    self.0.split_once('?').map(|(_, query)| query)
  }

  /// A cwd-relative slash-separated rendering for diagnostics and manifest
  /// keys, stable across machines.
  pub fn stabilize(&self, cwd: &Path) -> String {
    if self.path().is_absolute() {
      let relative = self.path().relative(cwd).as_path().to_slash_lossy().into_owned();
      match self.query() {
        Some(query) => format!("{relative}?{query}"),
        None => relative,
      }
    } else {
      self.to_string()
    }
  }
}

impl std::ops::Deref for ModuleId {
  type Target = str;

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl AsRef<str> for ModuleId {
  fn as_ref(&self) -> &str {
    self
  }
}

impl std::fmt::Display for ModuleId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<ArcStr> for ModuleId {
  fn from(value: ArcStr) -> Self {
    Self::new(value)
  }
}

impl From<&str> for ModuleId {
  fn from(value: &str) -> Self {
    Self::new(value)
  }
}
