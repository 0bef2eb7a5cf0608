use arcstr::ArcStr;

/// One file the build produces: a rendered chunk, a static asset referenced
/// by a module, or the manifest itself.
#[derive(Debug, Clone)]
pub struct OutputAsset {
  pub filename: String,
  pub content: Vec<u8>,
  pub kind: ArtifactKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
  /// Logical name doubles as the manifest key.
  Chunk { name: ArcStr },
  Asset,
  Manifest,
}

impl OutputAsset {
  pub fn is_chunk(&self) -> bool {
    matches!(self.kind, ArtifactKind::Chunk { .. })
  }
}
