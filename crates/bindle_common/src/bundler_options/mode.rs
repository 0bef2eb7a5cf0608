use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  #[default]
  Development,
  Production,
}

impl Mode {
  pub fn is_production(self) -> bool {
    matches!(self, Self::Production)
  }
}

impl std::fmt::Display for Mode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Development => f.write_str("development"),
      Self::Production => f.write_str("production"),
    }
  }
}
