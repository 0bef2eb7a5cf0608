use rustc_hash::FxHashMap;

use bindle_common::{Chunk, ChunkIdx, ChunkKind, EntryPoint, ModuleIdx, ModuleTable};
use bindle_utils::{bitset::BitSet, indexmap::FxIndexSet};

use crate::graph::ChunkGraph;

/// Partitions the module graph into chunks. Roots are the user-defined
/// entries plus every dynamic-import boundary; each root's bit floods
/// across static and url edges, and a module reached by two or more roots
/// lands in the single common chunk. The partition depends only on graph
/// shape, never on load order.
pub struct ChunkStage<'a> {
  module_table: &'a ModuleTable,
}

impl<'a> ChunkStage<'a> {
  pub fn new(module_table: &'a ModuleTable) -> Self {
    Self { module_table }
  }

  pub fn split(&self) -> ChunkGraph {
    let traversal = self.traverse();
    let roots = self.collect_roots(&traversal.dynamic_boundaries);
    let module_bits = self.flood_bits(&roots);
    self.assign_chunks(&traversal.exec_order, &roots, &module_bits)
  }

  /// Depth-first walk from the user entries in declared order, following
  /// every edge kind. Produces the deterministic execution order
  /// (dependencies before importers) and the dynamic-import boundaries in
  /// the order the walk first reaches them.
  fn traverse(&self) -> Traversal {
    let modules = &self.module_table.modules;
    let mut visited = vec![false; modules.len()];
    let mut exec_order = Vec::with_capacity(modules.len());
    let mut dynamic_boundaries: FxIndexSet<ModuleIdx> = FxIndexSet::default();

    // (module, next dependency position); explicit stack since cycles and
    // deep chains are both legal.
    let mut stack: Vec<(ModuleIdx, usize)> = Vec::new();

    for entry in &self.module_table.entry_points {
      if visited[entry.idx.raw() as usize] {
        continue;
      }
      visited[entry.idx.raw() as usize] = true;
      stack.push((entry.idx, 0));

      while let Some(top) = stack.last_mut() {
        let idx = top.0;
        let record = &modules[idx];
        let mut next_dep = None;
        while top.1 < record.resolved_deps.len() {
          let pos = top.1;
          top.1 += 1;
          let Some(dep_idx) = record.resolved_deps[pos] else { continue };
          if record.dependencies[pos].kind.is_dynamic() {
            dynamic_boundaries.insert(dep_idx);
          }
          if !visited[dep_idx.raw() as usize] {
            next_dep = Some(dep_idx);
            break;
          }
        }
        match next_dep {
          Some(dep_idx) => {
            visited[dep_idx.raw() as usize] = true;
            stack.push((dep_idx, 0));
          }
          None => {
            stack.pop();
            exec_order.push(idx);
          }
        }
      }
    }

    Traversal { exec_order, dynamic_boundaries }
  }

  /// User entries claim their bits first, in declared order; boundaries
  /// follow in discovery order. An entry that is also dynamically imported
  /// keeps its entry root.
  fn collect_roots(&self, dynamic_boundaries: &FxIndexSet<ModuleIdx>) -> Vec<Root> {
    let mut roots = Vec::new();
    let mut seen: FxIndexSet<ModuleIdx> = FxIndexSet::default();

    for entry in &self.module_table.entry_points {
      if seen.insert(entry.idx) {
        roots.push(Root { module: entry.idx, entry: Some(entry.clone()) });
      }
    }
    for boundary in dynamic_boundaries {
      if seen.insert(*boundary) {
        roots.push(Root { module: *boundary, entry: None });
      }
    }
    roots
  }

  /// Worklist flood of each root's bit across static and url edges.
  /// Dynamic edges are the chunk boundaries, so they are not followed.
  fn flood_bits(&self, roots: &[Root]) -> Vec<BitSet> {
    let modules = &self.module_table.modules;
    let bit_count = u32::try_from(roots.len()).unwrap_or(u32::MAX);
    let mut module_bits = vec![BitSet::new(bit_count); modules.len()];

    let mut worklist: Vec<ModuleIdx> = Vec::new();
    for (bit, root) in roots.iter().enumerate() {
      let mut seed = BitSet::new(bit_count);
      seed.set_bit(u32::try_from(bit).unwrap_or(u32::MAX));
      if module_bits[root.module.raw() as usize].union(&seed) {
        worklist.push(root.module);
      }

      while let Some(idx) = worklist.pop() {
        let bits = module_bits[idx.raw() as usize].clone();
        let record = &modules[idx];
        for (pos, dep) in record.resolved_deps.iter().enumerate() {
          let Some(dep_idx) = dep else { continue };
          if record.dependencies[pos].kind.is_dynamic() {
            continue;
          }
          if module_bits[dep_idx.raw() as usize].union(&bits) {
            worklist.push(*dep_idx);
          }
        }
      }
    }

    module_bits
  }

  fn assign_chunks(
    &self,
    exec_order: &[ModuleIdx],
    roots: &[Root],
    module_bits: &[BitSet],
  ) -> ChunkGraph {
    let mut chunk_graph = ChunkGraph::new(self.module_table);
    let bit_count = u32::try_from(roots.len()).unwrap_or(u32::MAX);

    let mut bit_to_chunk: Vec<ChunkIdx> = Vec::with_capacity(roots.len());
    for (bit, root) in roots.iter().enumerate() {
      let bit = u32::try_from(bit).unwrap_or(u32::MAX);
      let mut bits = BitSet::new(bit_count);
      bits.set_bit(bit);

      // Entry chunks carry the configured name; lazy and common chunks are
      // named later, by the content hash of their rendered output.
      let (kind, name) = match &root.entry {
        Some(entry) => {
          let name = entry.name.clone().unwrap_or_else(|| arcstr::literal!("main"));
          (ChunkKind::Entry { name: name.clone(), module: root.module, bit }, Some(name))
        }
        None => (ChunkKind::Lazy { module: root.module, bit }, None),
      };

      let mut chunk = Chunk::new(kind, bits);
      chunk.name = name;
      let chunk_idx = chunk_graph.add_chunk(chunk);
      bit_to_chunk.push(chunk_idx);
    }

    // Modules reached by two or more roots share one chunk, however many
    // roots are involved.
    let mut common_chunk: Option<ChunkIdx> = None;

    for idx in exec_order {
      let bits = &module_bits[idx.raw() as usize];
      let chunk_idx = match bits.count_ones() {
        // Unreachable from any root only if the table has stale records,
        // which a fresh scan never produces.
        0 => continue,
        1 => {
          let bit = bits.first_bit().unwrap_or(0);
          bit_to_chunk[bit as usize]
        }
        _ => *common_chunk.get_or_insert_with(|| {
          chunk_graph.add_chunk(Chunk::new(ChunkKind::Common, bits.clone()))
        }),
      };
      if bits.count_ones() > 1 {
        chunk_graph.chunk_table[chunk_idx].bits.union(bits);
      }
      chunk_graph.add_module_to_chunk(*idx, chunk_idx);
    }

    chunk_graph.sorted_chunk_idx_vec = chunk_graph.chunk_table.indices().collect();
    self.compute_cross_chunk_deps(&mut chunk_graph);
    chunk_graph
  }

  /// For every chunk, the other chunks its modules import from, in the
  /// order the imports appear. The dev server uses this to decide which
  /// artifacts an update invalidates.
  fn compute_cross_chunk_deps(&self, chunk_graph: &mut ChunkGraph) {
    let mut deps_per_chunk: FxHashMap<ChunkIdx, FxIndexSet<ChunkIdx>> = FxHashMap::default();

    for chunk_idx in &chunk_graph.sorted_chunk_idx_vec {
      let chunk = &chunk_graph.chunk_table[*chunk_idx];
      let mut deps: FxIndexSet<ChunkIdx> = FxIndexSet::default();
      for module_idx in &chunk.modules {
        let record = &self.module_table.modules[*module_idx];
        for dep in record.resolved_deps.iter().flatten() {
          let Some(dep_chunk) = chunk_graph.module_to_chunk[*dep] else { continue };
          if dep_chunk != *chunk_idx {
            deps.insert(dep_chunk);
          }
        }
      }
      deps_per_chunk.insert(*chunk_idx, deps);
    }

    for (chunk_idx, deps) in deps_per_chunk {
      chunk_graph.chunk_table[chunk_idx].cross_chunk_deps = deps.into_iter().collect();
    }
  }
}

struct Traversal {
  exec_order: Vec<ModuleIdx>,
  dynamic_boundaries: FxIndexSet<ModuleIdx>,
}

struct Root {
  module: ModuleIdx,
  entry: Option<EntryPoint>,
}

#[cfg(test)]
mod tests {
  use arcstr::ArcStr;
  use oxc_index::IndexVec;
  use rustc_hash::FxHashMap;

  use bindle_common::{
    ChunkKind, DependencyRequest, EntryPoint, ImportKind, ModuleId, ModuleIdx,
    ModuleRecord, ModuleTable,
  };

  use super::ChunkStage;

  fn record(
    idx: u32,
    path: &str,
    deps: Vec<(&str, ImportKind, Option<u32>)>,
  ) -> ModuleRecord {
    ModuleRecord {
      idx: ModuleIdx::from_raw(idx),
      id: ModuleId::new(path),
      raw: Vec::new(),
      output: path.as_bytes().to_vec(),
      dependencies: deps
        .iter()
        .map(|(specifier, kind, _)| DependencyRequest {
          specifier: ArcStr::from(*specifier),
          kind: *kind,
        })
        .collect(),
      resolved_deps: deps.iter().map(|(_, _, to)| to.map(ModuleIdx::from_raw)).collect(),
      assets: Vec::new(),
      content_hash: u128::from(idx),
      mtime_ms: 0,
    }
  }

  fn table(records: Vec<ModuleRecord>, entries: Vec<(u32, &str)>) -> ModuleTable {
    let id_to_idx: FxHashMap<_, _> =
      records.iter().map(|r| (r.id.clone(), r.idx)).collect();
    ModuleTable {
      modules: IndexVec::from_iter(records),
      id_to_idx,
      entry_points: entries
        .into_iter()
        .map(|(idx, name)| EntryPoint {
          idx: ModuleIdx::from_raw(idx),
          name: Some(ArcStr::from(name)),
        })
        .collect(),
    }
  }

  #[test]
  fn shared_module_lands_in_common_chunk() {
    // a and b both statically import utils.
    let table = table(
      vec![
        record(0, "/p/a.js", vec![("./utils.js", ImportKind::Static, Some(2))]),
        record(1, "/p/b.js", vec![("./utils.js", ImportKind::Static, Some(2))]),
        record(2, "/p/utils.js", vec![]),
      ],
      vec![(0, "a"), (1, "b")],
    );
    let graph = ChunkStage::new(&table).split();

    assert_eq!(graph.chunk_table.len(), 3);
    let common = graph.module_to_chunk[ModuleIdx::from_raw(2)].unwrap();
    assert!(matches!(graph.chunk_table[common].kind, ChunkKind::Common));
    assert_ne!(graph.module_to_chunk[ModuleIdx::from_raw(0)].unwrap(), common);
    assert_ne!(graph.module_to_chunk[ModuleIdx::from_raw(1)].unwrap(), common);
    // Both entry chunks depend on the common chunk.
    for entry in [0, 1] {
      let chunk_idx = graph.module_to_chunk[ModuleIdx::from_raw(entry)].unwrap();
      assert_eq!(graph.chunk_table[chunk_idx].cross_chunk_deps, vec![common]);
    }
  }

  #[test]
  fn dynamic_import_starts_a_lazy_chunk() {
    let table = table(
      vec![
        record(0, "/p/main.js", vec![("./panel.js", ImportKind::DynamicImport, Some(1))]),
        record(1, "/p/panel.js", vec![("./panel_helper.js", ImportKind::Static, Some(2))]),
        record(2, "/p/panel_helper.js", vec![]),
      ],
      vec![(0, "main")],
    );
    let graph = ChunkStage::new(&table).split();

    assert_eq!(graph.chunk_table.len(), 2);
    let lazy = graph.module_to_chunk[ModuleIdx::from_raw(1)].unwrap();
    assert!(matches!(graph.chunk_table[lazy].kind, ChunkKind::Lazy { .. }));
    // The helper is only reachable through the boundary, so it stays in
    // the lazy chunk rather than the entry chunk.
    assert_eq!(graph.module_to_chunk[ModuleIdx::from_raw(2)].unwrap(), lazy);
    // Non-entry chunks get named at generate time, from their content.
    assert!(graph.chunk_table[lazy].name.is_none());
  }

  #[test]
  fn every_module_lands_in_exactly_one_chunk() {
    let table = table(
      vec![
        record(
          0,
          "/p/main.js",
          vec![
            ("./shared.js", ImportKind::Static, Some(3)),
            ("./widget.js", ImportKind::DynamicImport, Some(1)),
          ],
        ),
        record(1, "/p/widget.js", vec![("./shared.js", ImportKind::Static, Some(3))]),
        record(2, "/p/admin.js", vec![("./shared.js", ImportKind::Static, Some(3))]),
        record(3, "/p/shared.js", vec![]),
      ],
      vec![(0, "main"), (2, "admin")],
    );
    let graph = ChunkStage::new(&table).split();

    let mut seen = vec![0usize; table.len()];
    for chunk in graph.chunk_table.iter() {
      for module in &chunk.modules {
        seen[module.raw() as usize] += 1;
      }
    }
    assert!(seen.iter().all(|count| *count == 1));
  }

  #[test]
  fn cycles_terminate_and_stay_in_one_chunk() {
    let table = table(
      vec![
        record(0, "/p/a.js", vec![("./b.js", ImportKind::Static, Some(1))]),
        record(1, "/p/b.js", vec![("./a.js", ImportKind::Static, Some(0))]),
      ],
      vec![(0, "main")],
    );
    let graph = ChunkStage::new(&table).split();

    assert_eq!(graph.chunk_table.len(), 1);
    assert_eq!(graph.chunk_table[graph.sorted_chunk_idx_vec[0]].modules.len(), 2);
  }

  #[test]
  fn dependencies_precede_importers_in_chunk_order() {
    let table = table(
      vec![
        record(0, "/p/main.js", vec![("./mid.js", ImportKind::Static, Some(1))]),
        record(1, "/p/mid.js", vec![("./leaf.js", ImportKind::Static, Some(2))]),
        record(2, "/p/leaf.js", vec![]),
      ],
      vec![(0, "main")],
    );
    let graph = ChunkStage::new(&table).split();

    let chunk = &graph.chunk_table[graph.sorted_chunk_idx_vec[0]];
    let order: Vec<u32> = chunk.modules.iter().map(|idx| idx.raw()).collect();
    assert_eq!(order, vec![2, 1, 0]);
  }
}
