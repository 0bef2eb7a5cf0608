pub mod module_task;
pub mod task_context;

use std::{path::PathBuf, sync::Arc};

use arcstr::ArcStr;
use oxc_index::IndexVec;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::mpsc::{Receiver, Sender};

use bindle_common::{
  DependencyRequest, EmittedAssetSpec, EntryPoint, ModuleId, ModuleIdx,
  ModuleRecord, ModuleTable, ResolvedId,
};
use bindle_error::{BuildError, BuildResult, BundleError};
use bindle_fs::OsFileSystem;

use crate::types::{SharedOptions, SharedPipeline, SharedResolver};

use self::{module_task::ModuleTask, task_context::TaskContext};

pub enum ModuleLoaderMsg {
  Done(Box<ModuleTaskResult>),
  Errors { idx: ModuleIdx, errors: BuildError },
}

pub struct ModuleTaskResult {
  pub idx: ModuleIdx,
  pub id: ModuleId,
  pub raw: Vec<u8>,
  pub output: Vec<u8>,
  pub dependencies: Vec<DependencyRequest>,
  /// Same order as `dependencies`; `None` for external references.
  pub resolved: Vec<Option<ModuleId>>,
  pub assets: Vec<EmittedAssetSpec>,
  pub content_hash: u128,
  pub mtime_ms: u64,
}

pub struct ModuleLoaderOutput {
  pub module_table: ModuleTable,
  pub warnings: Vec<BundleError>,
}

/// The frontier coordinator. Workers fan out per module; the graph is
/// mutated only here, sequentially, from results handed back over the
/// channel — no locking of the graph itself. Expansion completes when every
/// enqueued task has reported its dependency list and nothing new was
/// discovered.
pub struct ModuleLoader {
  tx: Sender<ModuleLoaderMsg>,
  rx: Receiver<ModuleLoaderMsg>,
  remaining: u32,
  shared_context: Arc<TaskContext>,
  options: SharedOptions,
  visited: FxHashMap<ModuleId, ModuleIdx>,
  first_importer: FxHashMap<ModuleIdx, ModuleIdx>,
  intermediate: IndexVec<ModuleIdx, Option<ModuleRecord>>,
  // Incremental-rebuild support.
  cache: FxHashMap<ModuleId, ModuleRecord>,
  dirty_paths: FxHashSet<PathBuf>,
  /// Distinct filesystem paths behind `visited`. Ids outgrow paths only
  /// through query variants, and those are bounded per file.
  seen_paths: FxHashSet<PathBuf>,
}

/// Query variants one file can legitimately contribute (`?url`, `?raw`,
/// `?inline` and the like). A path accruing ids past this is a stage
/// minting cache-busting specifiers, and expansion would never settle.
const ID_VARIANTS_PER_PATH: usize = 8;
const ID_VARIANTS_SLACK: usize = 64;

impl ModuleLoader {
  pub fn new(
    fs: OsFileSystem,
    options: SharedOptions,
    resolver: SharedResolver,
    pipeline: SharedPipeline,
  ) -> Self {
    // 1024 should be enough for most cases
    // over 1024 pending tasks are insane
    let (tx, rx) = tokio::sync::mpsc::channel(1024);

    let shared_context = Arc::new(TaskContext {
      fs,
      resolver,
      pipeline,
      options: options.clone(),
      tx: tx.clone(),
    });

    Self {
      tx,
      rx,
      remaining: 0,
      shared_context,
      options,
      visited: FxHashMap::default(),
      first_importer: FxHashMap::default(),
      intermediate: IndexVec::new(),
      cache: FxHashMap::default(),
      dirty_paths: FxHashSet::default(),
      seen_paths: FxHashSet::default(),
    }
  }

  /// Arm incremental mode: unchanged records from `previous` are reused
  /// without re-reading or re-transforming, dirty ones recomputed. The
  /// graph is free to grow or shrink between builds; nothing here bounds
  /// its size.
  pub fn with_cache(mut self, previous: &ModuleTable, dirty_paths: FxHashSet<PathBuf>) -> Self {
    self.cache =
      previous.iter().map(|record| (record.id.clone(), record.clone())).collect();
    self.dirty_paths = dirty_paths;
    self
  }

  fn try_spawn_new_task(
    &mut self,
    id: ModuleId,
    importer: Option<ModuleIdx>,
  ) -> BuildResult<ModuleIdx> {
    if let Some(existing) = self.visited.get(&id) {
      return Ok(*existing);
    }

    self.seen_paths.insert(id.path().to_path_buf());
    let budget = ID_VARIANTS_PER_PATH * self.seen_paths.len() + ID_VARIANTS_SLACK;
    if self.visited.len() >= budget {
      return Err(
        BundleError::CycleBudgetExceeded { budget, graph_size: self.visited.len() }.into(),
      );
    }

    let idx = self.intermediate.push(None);
    self.visited.insert(id.clone(), idx);
    if let Some(importer) = importer {
      self.first_importer.insert(idx, importer);
    }

    let cached = (!self.dirty_paths.contains(id.path()))
      .then(|| self.cache.get(&id).cloned())
      .flatten();

    let task = ModuleTask::new(Arc::clone(&self.shared_context), idx, id, cached);
    tokio::spawn(task.run());
    self.remaining += 1;
    Ok(idx)
  }

  pub async fn fetch_all_modules(
    mut self,
    user_defined_entries: Vec<(ArcStr, ResolvedId)>,
  ) -> BuildResult<ModuleLoaderOutput> {
    if user_defined_entries.is_empty() {
      Err(BundleError::Config("no entry points to build".to_string()))?;
    }

    let mut entry_points = Vec::with_capacity(user_defined_entries.len());
    for (name, resolved) in user_defined_entries {
      let idx = self.try_spawn_new_task(resolved.id, None)?;
      entry_points.push(EntryPoint { idx, name: Some(name) });
    }

    let warnings = Vec::new();

    while self.remaining > 0 {
      let Some(msg) = self.rx.recv().await else { break };
      match msg {
        ModuleLoaderMsg::Done(result) => {
          self.remaining -= 1;
          let record = self.register_result(*result)?;
          let idx = record.idx;
          self.intermediate[idx] = Some(record);
        }
        ModuleLoaderMsg::Errors { idx, errors } => {
          return Err(self.enrich_errors(idx, errors));
        }
      }
    }

    let mut modules = IndexVec::with_capacity(self.intermediate.len());
    for (idx, slot) in self.intermediate.into_iter_enumerated() {
      match slot {
        Some(record) => modules.push(record),
        // Unreachable: remaining hit zero, so every task reported.
        None => Err(BundleError::Other(anyhow::anyhow!("module {idx:?} never completed")))?,
      };
    }

    let module_table =
      ModuleTable { modules, id_to_idx: self.visited, entry_points };

    Ok(ModuleLoaderOutput { module_table, warnings })
  }

  /// Turn one task result into a record, spawning tasks for any dependency
  /// not yet visited — in declared order, to keep discovery deterministic.
  fn register_result(&mut self, result: ModuleTaskResult) -> BuildResult<ModuleRecord> {
    let mut resolved_deps = Vec::with_capacity(result.resolved.len());
    for resolution in &result.resolved {
      match resolution {
        Some(dep_id) => {
          let dep_idx = self.try_spawn_new_task(dep_id.clone(), Some(result.idx))?;
          resolved_deps.push(Some(dep_idx));
        }
        None => resolved_deps.push(None),
      }
    }

    Ok(ModuleRecord {
      idx: result.idx,
      id: result.id,
      raw: result.raw,
      output: result.output,
      dependencies: result.dependencies,
      resolved_deps,
      assets: result.assets,
      content_hash: result.content_hash,
      mtime_ms: result.mtime_ms,
    })
  }

  /// Workers only know their own id; walk first-importer links up to an
  /// entry so resolution failures name the whole chain that reached them.
  fn enrich_errors(&self, idx: ModuleIdx, mut errors: BuildError) -> BuildError {
    let mut chain = Vec::new();
    let mut current = self.first_importer.get(&idx);
    while let Some(importer_idx) = current {
      if let Some(Some(record)) = self.intermediate.get(*importer_idx) {
        chain.push(record.id.stabilize(&self.options.cwd));
      }
      current = self.first_importer.get(importer_idx);
    }

    for error in errors.iter_mut() {
      if let BundleError::Resolve { importers, .. } = error {
        importers.extend(chain.iter().cloned());
      }
    }
    errors
  }
}
