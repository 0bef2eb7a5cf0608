use crate::{DependencyRequest, ModuleId};

/// Per-invocation context handed to a loader stage. Stages are pure
/// functions of `(bytes, options)` — they get no handle to the graph or the
/// filesystem, which is what makes independent modules transformable in
/// parallel.
pub struct TransformContext<'a> {
  pub id: &'a ModuleId,
  /// Stage options from the matching loader rule, opaque to the core.
  pub options: &'a serde_json::Value,
}

/// A standalone file a stage wants emitted next to the chunks (images,
/// fonts). Content-addressed by the stage itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedAssetSpec {
  /// Final file name, usually containing a content hash.
  pub filename: String,
  pub content: Vec<u8>,
  /// Source-relative origin, used as the manifest key.
  pub source_path: String,
}

/// Result of one stage: the bytes handed to the next stage, plus whatever
/// dependencies this stage discovered.
#[derive(Debug, Default)]
pub struct TransformOutput {
  pub bytes: Vec<u8>,
  pub dependencies: Vec<DependencyRequest>,
  pub assets: Vec<EmittedAssetSpec>,
}

impl TransformOutput {
  pub fn passthrough(bytes: Vec<u8>) -> Self {
    Self { bytes, ..Self::default() }
  }
}

/// The loader plugin contract. External transpilers, stylesheet processors
/// and asset pipelines integrate through this seam without being part of
/// the core. Implementations must be stateless across invocations.
pub trait TransformStage: Send + Sync {
  fn name(&self) -> &'static str;

  /// Errors are plain messages; the pipeline wraps them with the module id
  /// and stage name.
  fn transform(&self, ctx: &TransformContext<'_>, bytes: Vec<u8>)
  -> Result<TransformOutput, String>;
}
