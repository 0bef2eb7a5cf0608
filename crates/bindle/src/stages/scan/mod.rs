use std::path::PathBuf;

use arcstr::ArcStr;
use rustc_hash::FxHashSet;

use bindle_common::ModuleTable;
use bindle_error::{BuildResult, BundleError};
use bindle_fs::OsFileSystem;

use crate::module_loader::{ModuleLoader, ModuleLoaderOutput};
use crate::types::{SharedOptions, SharedPipeline, SharedResolver};

pub type ScanStageOutput = ModuleLoaderOutput;

/// Expands the module graph from the configured entries: resolve each
/// entry, then let the loader fan out over discovered dependencies.
pub struct ScanStage {
  fs: OsFileSystem,
  options: SharedOptions,
  resolver: SharedResolver,
  pipeline: SharedPipeline,
}

impl ScanStage {
  pub fn new(
    fs: OsFileSystem,
    options: SharedOptions,
    resolver: SharedResolver,
    pipeline: SharedPipeline,
  ) -> Self {
    Self { fs, options, resolver, pipeline }
  }

  pub async fn scan(&mut self) -> BuildResult<ScanStageOutput> {
    let loader = ModuleLoader::new(
      self.fs,
      self.options.clone(),
      self.resolver.clone(),
      self.pipeline.clone(),
    );
    loader.fetch_all_modules(self.resolve_user_defined_entries()?).await
  }

  /// Dirty-aware variant for rebuilds: records from `previous` whose path
  /// is not in `dirty_paths` are reused, everything else recomputed. The
  /// resulting table is a fresh full graph, so orphans drop out on their
  /// own.
  pub async fn scan_incremental(
    &mut self,
    previous: &ModuleTable,
    dirty_paths: FxHashSet<PathBuf>,
  ) -> BuildResult<ScanStageOutput> {
    self.resolver.clear_cache();
    let loader = ModuleLoader::new(
      self.fs,
      self.options.clone(),
      self.resolver.clone(),
      self.pipeline.clone(),
    )
    .with_cache(previous, dirty_paths);
    loader.fetch_all_modules(self.resolve_user_defined_entries()?).await
  }

  fn resolve_user_defined_entries(
    &self,
  ) -> BuildResult<Vec<(ArcStr, bindle_common::ResolvedId)>> {
    let mut entries = Vec::with_capacity(self.options.entries.len());
    for input_item in &self.options.entries {
      let resolved = self.resolver.resolve(&input_item.import, None, true)?;
      if resolved.is_external {
        Err(BundleError::Config(format!(
          "entry \"{}\" resolved to an external url, entries must be local files",
          input_item.import
        )))?;
      }
      entries.push((input_item.name.clone(), resolved));
    }
    Ok(entries)
  }
}
