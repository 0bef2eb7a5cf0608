mod bundler;
mod emitter;
mod graph;
mod module_loader;
mod optimizer;
mod pipeline;
mod stages;
mod types;
mod utils;

pub use crate::{
  bundler::Bundler,
  emitter::EmitReport,
  types::{
    BundleOutput, ChunkUpdate, RebuildSummary, SharedOptions, SharedPipeline, SharedResolver,
  },
  utils::normalize_options::normalize_options,
};
pub use bindle_common::*;
pub use bindle_error::{BuildError, BuildResult, BundleError};
