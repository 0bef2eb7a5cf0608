use arcstr::ArcStr;

use crate::ImportKind;

/// One dependency declared by a loader stage: the raw specifier as written
/// in the source, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRequest {
  pub specifier: ArcStr,
  pub kind: ImportKind,
}

impl DependencyRequest {
  pub fn new(specifier: impl Into<ArcStr>, kind: ImportKind) -> Self {
    Self { specifier: specifier.into(), kind }
  }
}
