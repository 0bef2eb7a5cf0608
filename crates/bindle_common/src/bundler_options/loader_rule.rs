use serde::Deserialize;

/// One row of the loader table: a match pattern and the ordered stage chain
/// it selects. The first matching rule wins; a module matching no rule is
/// passed through untouched.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderRule {
  /// A glob over the module's slash path (`*.jsx`, `src/**/*.css`).
  /// Patterns without a slash match against the file name alone.
  pub pattern: String,
  pub stage_chain: Vec<String>,
  #[serde(default)]
  pub options: serde_json::Value,
}

impl LoaderRule {
  pub fn new(pattern: impl Into<String>, stage_chain: Vec<String>) -> Self {
    Self { pattern: pattern.into(), stage_chain, options: serde_json::Value::Null }
  }

  pub fn matches(&self, slash_path: &str) -> bool {
    if self.pattern.contains('/') {
      fast_glob::glob_match(&self.pattern, slash_path)
    } else {
      let file_name = slash_path.rsplit('/').next().unwrap_or(slash_path);
      fast_glob::glob_match(&self.pattern, file_name)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn file_name_patterns() {
    let rule = LoaderRule::new("*.{js,jsx}", vec!["ecmascript".to_string()]);
    assert!(rule.matches("/project/src/app.jsx"));
    assert!(rule.matches("/project/index.js"));
    assert!(!rule.matches("/project/style.css"));
  }

  #[test]
  fn path_patterns() {
    let rule = LoaderRule::new("**/assets/**/*.png", vec!["asset".to_string()]);
    assert!(rule.matches("/project/assets/img/logo.png"));
    assert!(!rule.matches("/project/src/logo.png"));
  }
}
