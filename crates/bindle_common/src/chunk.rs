use arcstr::ArcStr;
use bindle_utils::bitset::BitSet;

use crate::{ChunkIdx, ChunkKind, FilenameTemplate, ModuleIdx, NormalizedBundlerOptions};

/// An ordered set of modules sharing one output artifact. Membership is a
/// partition of the reachable graph: each module lands in exactly one chunk
/// per build.
#[derive(Debug, Default)]
pub struct Chunk {
  pub kind: ChunkKind,
  /// Logical name and manifest key: the entry name for entry chunks.
  /// Lazy and common chunks leave this unset; the generate stage names
  /// them by content hash.
  pub name: Option<ArcStr>,
  pub modules: Vec<ModuleIdx>,
  /// Which entry/boundary roots reach this chunk's modules.
  pub bits: BitSet,
  /// Chunks this chunk's modules import from, excluding itself.
  pub cross_chunk_deps: Vec<ChunkIdx>,
  /// Final emitted filename, filled by the generate stage.
  pub filename: Option<String>,
}

impl Chunk {
  pub fn new(kind: ChunkKind, bits: BitSet) -> Self {
    Self { kind, bits, ..Self::default() }
  }

  pub fn filename_template(&self, options: &NormalizedBundlerOptions) -> FilenameTemplate {
    let raw = if self.kind.is_user_defined_entry() {
      options.entry_filenames.clone()
    } else {
      options.chunk_filenames.clone()
    };
    FilenameTemplate::new(raw)
  }
}
