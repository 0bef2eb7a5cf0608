use bindle_common::{Manifest, OutputAsset};
use bindle_error::BundleError;

/// Everything one build produced, still in memory. The dev server serves
/// this directly; the CLI hands it to the emitter.
#[derive(Debug)]
pub struct BundleOutput {
  pub assets: Vec<OutputAsset>,
  pub manifest: Manifest,
  pub warnings: Vec<BundleError>,
}

/// One push-channel update: a chunk whose content changed, with the modules
/// that changed inside it.
#[derive(Debug, Clone)]
pub struct ChunkUpdate {
  /// Logical chunk name (manifest key).
  pub chunk: String,
  /// Stable module ids, cwd-relative.
  pub modules: Vec<String>,
}

/// Result of an incremental rebuild, with enough detail for the dev server
/// to decide between hot updates and a full reload.
#[derive(Debug)]
pub struct RebuildSummary {
  pub output: BundleOutput,
  /// Stable ids of modules whose record content changed.
  pub changed_modules: Vec<String>,
  pub updates: Vec<ChunkUpdate>,
  /// Set when the chunk structure itself changed (chunks added/removed),
  /// which hot updates cannot express.
  pub full_reload: bool,
}
