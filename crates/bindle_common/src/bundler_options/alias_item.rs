use std::path::PathBuf;

/// One alias table row: a bare prefix and the absolute path it substitutes.
#[derive(Debug, Clone)]
pub struct AliasItem {
  pub find: String,
  pub replacement: PathBuf,
}

impl AliasItem {
  pub fn new(find: impl Into<String>, replacement: impl Into<PathBuf>) -> Self {
    Self { find: find.into(), replacement: replacement.into() }
  }

  /// Whether this alias applies to `specifier`: the prefix must match whole
  /// path segments, so alias `components` matches `components/Button` but
  /// not `components2/Button`.
  pub fn matches(&self, specifier: &str) -> bool {
    match specifier.strip_prefix(&self.find) {
      Some("") => true,
      Some(rest) => rest.starts_with('/'),
      None => false,
    }
  }
}
