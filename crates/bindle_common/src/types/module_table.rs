use oxc_index::IndexVec;
use rustc_hash::FxHashMap;

use crate::{EntryPoint, ModuleId, ModuleIdx, ModuleRecord};

/// The module graph: every module reachable from an entry has a record here,
/// and every non-external dependency edge points at another record. Cycles
/// are allowed; reachability is what is finite.
#[derive(Debug, Default)]
pub struct ModuleTable {
  pub modules: IndexVec<ModuleIdx, ModuleRecord>,
  pub id_to_idx: FxHashMap<ModuleId, ModuleIdx>,
  pub entry_points: Vec<EntryPoint>,
}

impl ModuleTable {
  pub fn get(&self, id: &ModuleId) -> Option<&ModuleRecord> {
    self.id_to_idx.get(id).map(|idx| &self.modules[*idx])
  }

  pub fn len(&self) -> usize {
    self.modules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &ModuleRecord> {
    self.modules.iter()
  }
}
