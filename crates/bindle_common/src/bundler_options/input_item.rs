use arcstr::ArcStr;

/// One normalized entry point: configured name + the specifier to resolve.
#[derive(Debug, Clone)]
pub struct InputItem {
  pub name: ArcStr,
  pub import: String,
}

impl InputItem {
  pub fn new(name: impl Into<ArcStr>, import: impl Into<String>) -> Self {
    Self { name: name.into(), import: import.into() }
  }
}
