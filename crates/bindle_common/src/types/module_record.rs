use crate::{DependencyRequest, EmittedAssetSpec, ModuleId, ModuleIdx};

/// Everything the graph knows about one module. A record is replaced whole
/// when its module is retransformed, never edited in place, so the content
/// hash and the dependency lists can't drift apart.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
  pub idx: ModuleIdx,
  pub id: ModuleId,
  /// Source bytes as read from disk, untouched.
  pub raw: Vec<u8>,
  /// Output of the loader pipeline. Identical to `raw` for modules matching
  /// no loader rule.
  pub output: Vec<u8>,
  /// Dependencies in the order the loader pipeline declared them.
  pub dependencies: Vec<DependencyRequest>,
  /// Resolved module for each entry of `dependencies`, same order. `None`
  /// for external references.
  pub resolved_deps: Vec<Option<ModuleIdx>>,
  /// Standalone files this module contributes (content-addressed assets).
  pub assets: Vec<EmittedAssetSpec>,
  /// xxh3-128 of `output`.
  pub content_hash: u128,
  pub mtime_ms: u64,
}

impl ModuleRecord {
  /// Record equivalence as observed by rebuild correctness tests: identity,
  /// bytes and declared dependencies — not the build-local `idx`.
  pub fn content_eq(&self, other: &ModuleRecord) -> bool {
    self.id == other.id
      && self.content_hash == other.content_hash
      && self.output == other.output
      && self.dependencies == other.dependencies
  }
}
