use std::sync::Arc;

use bindle_common::{DependencyRequest, EmittedAssetSpec, ModuleId, ModuleIdx, ModuleRecord};
use bindle_error::{BuildResult, BundleError};
use bindle_fs::FileSystem;
use bindle_utils::xxhash;

use super::{ModuleLoaderMsg, ModuleTaskResult, task_context::TaskContext};

/// Loads, transforms and dep-resolves one module, then reports back to the
/// coordinator. Tasks for independent modules run concurrently; only the
/// coordinator ever touches the graph.
pub struct ModuleTask {
  ctx: Arc<TaskContext>,
  idx: ModuleIdx,
  id: ModuleId,
  /// Previous-build record, present when the coordinator decided this
  /// module may be reused if its file is unchanged.
  cache: Option<ModuleRecord>,
}

impl ModuleTask {
  pub fn new(ctx: Arc<TaskContext>, idx: ModuleIdx, id: ModuleId, cache: Option<ModuleRecord>) -> Self {
    Self { ctx, idx, id, cache }
  }

  pub async fn run(self) {
    let idx = self.idx;
    let tx = self.ctx.tx.clone();
    let msg = match self.run_inner().await {
      Ok(result) => ModuleLoaderMsg::Done(Box::new(result)),
      Err(errors) => ModuleLoaderMsg::Errors { idx, errors },
    };
    // The coordinator may already have bailed on an earlier error.
    let _ = tx.send(msg).await;
  }

  async fn run_inner(mut self) -> BuildResult<ModuleTaskResult> {
    let path = self.id.path();
    let mtime_ms = self
      .ctx
      .fs
      .mtime_ms(path)
      .map_err(|err| BundleError::io(path.to_path_buf(), err))?;

    let (raw, output, dependencies, assets, content_hash) = match self.cache.take() {
      Some(cached) if cached.mtime_ms == mtime_ms => (
        cached.raw,
        cached.output,
        cached.dependencies,
        cached.assets,
        cached.content_hash,
      ),
      _ => self.load_and_transform().await?,
    };

    // Re-resolution happens even for cached records: file creation or
    // removal elsewhere can change what a probe finds.
    let resolved = self.resolve_dependencies(&dependencies)?;

    Ok(ModuleTaskResult {
      idx: self.idx,
      id: self.id,
      raw,
      output,
      dependencies,
      resolved,
      assets,
      content_hash,
      mtime_ms,
    })
  }

  #[allow(clippy::type_complexity)]
  async fn load_and_transform(
    &self,
  ) -> BuildResult<(Vec<u8>, Vec<u8>, Vec<DependencyRequest>, Vec<EmittedAssetSpec>, u128)> {
    let path = self.id.path();
    let raw =
      self.ctx.fs.read(path).map_err(|err| BundleError::io(path.to_path_buf(), err))?;

    let transformed = self.ctx.pipeline.transform(&self.id, raw.clone()).await?;
    let content_hash = xxhash::xxhash_u128(&transformed.bytes);

    Ok((raw, transformed.bytes, transformed.dependencies, transformed.assets, content_hash))
  }

  fn resolve_dependencies(
    &self,
    dependencies: &[DependencyRequest],
  ) -> BuildResult<Vec<Option<ModuleId>>> {
    let mut resolved = Vec::with_capacity(dependencies.len());
    let mut errors = Vec::new();

    for dependency in dependencies {
      match self.ctx.resolver.resolve(&dependency.specifier, Some(self.id.path()), false) {
        Ok(resolution) if resolution.is_external => resolved.push(None),
        Ok(resolution) => resolved.push(Some(resolution.id)),
        Err(BundleError::Resolve { specifier, .. }) => {
          // The coordinator extends the importer chain up to an entry.
          errors.push(BundleError::Resolve {
            specifier,
            importers: vec![self.id.stabilize(&self.ctx.options.cwd)],
          });
        }
        Err(other) => errors.push(other),
      }
    }

    if errors.is_empty() { Ok(resolved) } else { Err(errors.into()) }
  }
}
