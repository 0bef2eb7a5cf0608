use oxc_index::{IndexVec, index_vec};

use bindle_common::{Chunk, ChunkIdx, ModuleIdx, ModuleTable};

#[derive(Debug)]
pub struct ChunkGraph {
  pub chunk_table: IndexVec<ChunkIdx, Chunk>,
  /// Chunks in deterministic emit order: user entries first, then lazy
  /// chunks in discovery order, then the common chunk.
  pub sorted_chunk_idx_vec: Vec<ChunkIdx>,
  pub module_to_chunk: IndexVec<ModuleIdx, Option<ChunkIdx>>,
}

impl ChunkGraph {
  pub fn new(module_table: &ModuleTable) -> Self {
    Self {
      chunk_table: IndexVec::default(),
      sorted_chunk_idx_vec: Vec::new(),
      module_to_chunk: index_vec![None; module_table.len()],
    }
  }

  pub fn add_chunk(&mut self, chunk: Chunk) -> ChunkIdx {
    self.chunk_table.push(chunk)
  }

  pub fn add_module_to_chunk(&mut self, module_idx: ModuleIdx, chunk_idx: ChunkIdx) {
    self.chunk_table[chunk_idx].modules.push(module_idx);
    self.module_to_chunk[module_idx] = Some(chunk_idx);
  }
}
