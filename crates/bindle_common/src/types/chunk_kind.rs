use arcstr::ArcStr;

use crate::ModuleIdx;

#[derive(Debug, Clone, Default)]
pub enum ChunkKind {
  /// One per configured entry point; keeps the configured name.
  Entry { name: ArcStr, module: ModuleIdx, bit: u32 },
  /// One per dynamic-import boundary.
  Lazy { module: ModuleIdx, bit: u32 },
  /// The single chunk holding modules reachable from more than one root.
  #[default]
  Common,
}

impl ChunkKind {
  pub fn is_user_defined_entry(&self) -> bool {
    matches!(self, Self::Entry { .. })
  }
}
