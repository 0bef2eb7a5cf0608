use arcstr::ArcStr;

use bindle_common::{ArtifactKind, Manifest, ModuleTable, OutputAsset};
use bindle_error::{BuildResult, BundleError};
use bindle_utils::{
  rayon::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator},
  xxhash::xxhash_base16,
};

use crate::{
  graph::ChunkGraph,
  optimizer::{Flavor, optimize},
  types::{BundleOutput, SharedOptions},
};

/// Hex digits of the content hash used in chunk names and `[hash]`
/// filenames.
const HASH_LEN: usize = 8;

/// Renders chunks to output artifacts: concatenation in execution order,
/// optimization in production mode, content-hashed naming, manifest.
pub struct GenerateStage<'a> {
  module_table: &'a ModuleTable,
  options: &'a SharedOptions,
}

impl<'a> GenerateStage<'a> {
  pub fn new(module_table: &'a ModuleTable, options: &'a SharedOptions) -> Self {
    Self { module_table, options }
  }

  pub fn generate(
    &self,
    chunk_graph: &mut ChunkGraph,
    warnings: Vec<BundleError>,
  ) -> BuildResult<BundleOutput> {
    let rendered: Vec<Vec<u8>> =
      chunk_graph.chunk_table.raw.par_iter().map(|chunk| self.render_chunk(chunk)).collect();

    // Non-entry chunks are named by the hash of their concatenated module
    // outputs, so identical content keeps its name across builds and any
    // byte change busts it.
    for (chunk, content) in chunk_graph.chunk_table.iter_mut().zip(&rendered) {
      if chunk.name.is_none() {
        chunk.name = Some(ArcStr::from(xxhash_base16(content, HASH_LEN)));
      }
    }

    let contents: Vec<Vec<u8>> = if self.options.minify {
      rendered
        .par_iter()
        .zip(chunk_graph.chunk_table.raw.par_iter())
        .map(|(content, chunk)| {
          let flavor = Flavor::of_filename(&chunk.filename_template(self.options).render(
            chunk.name.as_deref(),
            Some(""),
          ));
          optimize(content, flavor)
        })
        .collect()
    } else {
      rendered
    };

    let mut manifest = Manifest::default();
    let mut assets = Vec::new();

    for chunk_idx in chunk_graph.sorted_chunk_idx_vec.clone() {
      let chunk = &mut chunk_graph.chunk_table[chunk_idx];
      let content = &contents[chunk_idx.index()];
      let name = chunk.name.clone().unwrap_or_else(|| arcstr::literal!("chunk"));
      let hash = xxhash_base16(content, HASH_LEN);
      let filename = chunk.filename_template(self.options).render(Some(&name), Some(&hash));
      chunk.filename = Some(filename.clone());

      manifest.insert(name.as_str(), format!("{}{filename}", self.options.public_path));
      assets.push(OutputAsset {
        filename,
        content: content.clone(),
        kind: ArtifactKind::Chunk { name },
      });
    }

    self.collect_module_assets(chunk_graph, &mut manifest, &mut assets);

    assets.push(OutputAsset {
      filename: "manifest.json".to_string(),
      content: manifest.to_json().into_bytes(),
      kind: ArtifactKind::Manifest,
    });

    Ok(BundleOutput { assets, manifest, warnings })
  }

  /// Files emitted by loader stages (images, fonts). Walked in chunk and
  /// module order so the manifest is stable; the same asset referenced
  /// from several modules is emitted once.
  fn collect_module_assets(
    &self,
    chunk_graph: &ChunkGraph,
    manifest: &mut Manifest,
    assets: &mut Vec<OutputAsset>,
  ) {
    let mut seen = rustc_hash::FxHashSet::default();
    for chunk_idx in &chunk_graph.sorted_chunk_idx_vec {
      for module_idx in &chunk_graph.chunk_table[*chunk_idx].modules {
        let record = &self.module_table.modules[*module_idx];
        for spec in &record.assets {
          if !seen.insert(spec.filename.clone()) {
            continue;
          }
          manifest.insert(
            spec.source_path.clone(),
            format!("{}{}", self.options.public_path, spec.filename),
          );
          assets.push(OutputAsset {
            filename: spec.filename.clone(),
            content: spec.content.clone(),
            kind: ArtifactKind::Asset,
          });
        }
      }
    }
  }

  /// Transformed module outputs joined in execution order, each prefixed
  /// with a stable-id banner so artifacts stay diffable and os-independent.
  fn render_chunk(&self, chunk: &bindle_common::Chunk) -> Vec<u8> {
    let mut out = Vec::new();
    for module_idx in &chunk.modules {
      let record = &self.module_table.modules[*module_idx];
      out.extend_from_slice(b"// ");
      out.extend_from_slice(record.id.stabilize(&self.options.cwd).as_bytes());
      out.push(b'\n');
      out.extend_from_slice(&record.output);
      if !record.output.ends_with(b"\n") {
        out.push(b'\n');
      }
    }
    out
  }
}
