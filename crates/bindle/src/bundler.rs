use std::{path::PathBuf, sync::Arc};

use rustc_hash::FxHashSet;

use bindle_common::{BundlerOptions, ChunkKind, ModuleTable};
use bindle_error::BuildResult;
use bindle_fs::OsFileSystem;
use bindle_resolver::Resolver;

use crate::{
  emitter::{EmitReport, emit},
  graph::ChunkGraph,
  pipeline::LoaderPipeline,
  stages::{
    chunk::ChunkStage,
    generate::GenerateStage,
    scan::{ScanStage, ScanStageOutput},
  },
  types::{
    BundleOutput, ChunkUpdate, RebuildSummary, SharedOptions, SharedPipeline, SharedResolver,
  },
  utils::normalize_options::normalize_options,
};

/// The public facade: owns the configuration, the resolver and pipeline
/// caches, and the previous build's state for incremental rebuilds.
pub struct Bundler {
  fs: OsFileSystem,
  options: SharedOptions,
  resolver: SharedResolver,
  pipeline: SharedPipeline,
  snapshot: Option<BuildSnapshot>,
}

/// Previous good build, kept for rebuild reuse and update diffing.
struct BuildSnapshot {
  module_table: ModuleTable,
  /// Chunk roots as stable strings, sorted. A rebuild whose roots differ
  /// changed the chunk structure itself, which hot updates cannot express.
  structure: Vec<String>,
}

impl Bundler {
  pub fn new(input: BundlerOptions) -> BuildResult<Self> {
    let options: SharedOptions = Arc::new(normalize_options(input)?);
    let resolver: SharedResolver = Arc::new(Resolver::new(&options, OsFileSystem));
    let pipeline: SharedPipeline = Arc::new(LoaderPipeline::new(options.clone())?);
    Ok(Self { fs: OsFileSystem, options, resolver, pipeline, snapshot: None })
  }

  pub fn options(&self) -> &SharedOptions {
    &self.options
  }

  /// Full build, kept in memory. Also primes the snapshot that later
  /// `rebuild` calls diff against.
  pub async fn build(&mut self) -> BuildResult<BundleOutput> {
    let scan = self.scan_stage().scan().await?;
    tracing::debug!(modules = scan.module_table.len(), "scan complete");
    let (output, _) = self.finish_build(scan)?;
    Ok(output)
  }

  /// Full build plus emit to the configured output directory.
  pub async fn write(&mut self) -> BuildResult<(BundleOutput, EmitReport)> {
    let output = self.build().await?;
    let report =
      emit(&self.fs, &output.assets, &self.options.out_dir, &self.options.copy_files)?;
    tracing::debug!(
      written = report.written.len(),
      removed = report.removed_stale.len(),
      "emit complete"
    );
    Ok((output, report))
  }

  /// Incremental rebuild after filesystem changes. The result is
  /// indistinguishable from a cold build of the same tree; the summary
  /// additionally says which modules changed and which chunks that
  /// touched. On failure the previous snapshot is kept, so the last good
  /// output stays diffable and servable.
  pub async fn rebuild(&mut self, changed_paths: Vec<PathBuf>) -> BuildResult<RebuildSummary> {
    let Some(prev) = self.snapshot.take() else {
      let output = self.build().await?;
      return Ok(RebuildSummary {
        output,
        changed_modules: Vec::new(),
        updates: Vec::new(),
        full_reload: true,
      });
    };

    let dirty: FxHashSet<PathBuf> = changed_paths.into_iter().collect();
    let scan =
      match self.scan_stage().scan_incremental(&prev.module_table, dirty).await {
        Ok(scan) => scan,
        Err(errors) => {
          self.snapshot = Some(prev);
          return Err(errors);
        }
      };

    let changed_modules: Vec<String> = scan
      .module_table
      .iter()
      .filter(|record| {
        prev.module_table.get(&record.id).is_none_or(|old| !old.content_eq(record))
      })
      .map(|record| record.id.stabilize(&self.options.cwd))
      .collect();

    let prev_structure = prev.structure;
    let (output, chunk_graph) = self.finish_build(scan)?;

    let changed_set: FxHashSet<&str> =
      changed_modules.iter().map(String::as_str).collect();
    let snapshot = self.snapshot.as_ref();
    let full_reload = snapshot.map(|s| &s.structure) != Some(&prev_structure);
    let updates = snapshot.map_or_else(Vec::new, |s| {
      chunk_updates(&chunk_graph, &s.module_table, &self.options.cwd, &changed_set)
    });

    tracing::debug!(
      changed = changed_modules.len(),
      updates = updates.len(),
      full_reload,
      "rebuild complete"
    );
    Ok(RebuildSummary { output, changed_modules, updates, full_reload })
  }

  fn scan_stage(&self) -> ScanStage {
    ScanStage::new(self.fs, self.options.clone(), self.resolver.clone(), self.pipeline.clone())
  }

  /// Split, generate, and replace the snapshot.
  fn finish_build(&mut self, scan: ScanStageOutput) -> BuildResult<(BundleOutput, ChunkGraph)> {
    let mut chunk_graph = ChunkStage::new(&scan.module_table).split();
    let output = GenerateStage::new(&scan.module_table, &self.options)
      .generate(&mut chunk_graph, scan.warnings)?;

    let structure = chunk_structure(&chunk_graph, &scan.module_table, &self.options.cwd);
    self.snapshot = Some(BuildSnapshot { module_table: scan.module_table, structure });
    Ok((output, chunk_graph))
  }
}

/// Stable fingerprint of the chunk layout: one string per chunk root.
fn chunk_structure(
  chunk_graph: &ChunkGraph,
  module_table: &ModuleTable,
  cwd: &std::path::Path,
) -> Vec<String> {
  let mut structure: Vec<String> = chunk_graph
    .chunk_table
    .iter()
    .map(|chunk| match &chunk.kind {
      ChunkKind::Entry { module, .. } => {
        format!("entry:{}", module_table.modules[*module].id.stabilize(cwd))
      }
      ChunkKind::Lazy { module, .. } => {
        format!("lazy:{}", module_table.modules[*module].id.stabilize(cwd))
      }
      ChunkKind::Common => "common".to_string(),
    })
    .collect();
  structure.sort_unstable();
  structure
}

/// One update per chunk that contains a changed module, listing the changed
/// stable ids inside it.
fn chunk_updates(
  chunk_graph: &ChunkGraph,
  module_table: &ModuleTable,
  cwd: &std::path::Path,
  changed: &FxHashSet<&str>,
) -> Vec<ChunkUpdate> {
  let mut updates = Vec::new();
  for chunk_idx in &chunk_graph.sorted_chunk_idx_vec {
    let chunk = &chunk_graph.chunk_table[*chunk_idx];
    let modules: Vec<String> = chunk
      .modules
      .iter()
      .map(|idx| module_table.modules[*idx].id.stabilize(cwd))
      .filter(|stable| changed.contains(stable.as_str()))
      .collect();
    if modules.is_empty() {
      continue;
    }
    let Some(name) = &chunk.name else { continue };
    updates.push(ChunkUpdate { chunk: name.to_string(), modules });
  }
  updates
}
