mod bundler_options;
mod chunk;
mod transform_stage;
mod types;

pub use bindle_utils::indexmap::{FxIndexMap, FxIndexSet};

pub use bundler_options::{
  BundlerOptions, alias_item::AliasItem, copy_item::CopyItem,
  dev_server_options::{DevServerOptions, NormalizedDevServerOptions},
  filename_template::FilenameTemplate, input_item::InputItem, loader_rule::LoaderRule, mode::Mode,
  normalized_bundler_options::NormalizedBundlerOptions,
};

pub use crate::{
  chunk::Chunk,
  transform_stage::{EmittedAssetSpec, TransformContext, TransformOutput, TransformStage},
  types::{
    chunk_kind::ChunkKind,
    dependency_request::DependencyRequest,
    entry_point::EntryPoint,
    import_kind::ImportKind,
    manifest::Manifest,
    module_id::ModuleId,
    module_record::ModuleRecord,
    module_table::ModuleTable,
    output_asset::{ArtifactKind, OutputAsset},
    raw_idx::{ChunkIdx, ModuleIdx},
    resolved_id::ResolvedId,
  },
};
