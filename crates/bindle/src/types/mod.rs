mod bundle_output;

use std::sync::Arc;

use bindle_common::NormalizedBundlerOptions;
use bindle_resolver::Resolver;

use crate::pipeline::LoaderPipeline;

pub use bundle_output::{BundleOutput, ChunkUpdate, RebuildSummary};

pub type SharedOptions = Arc<NormalizedBundlerOptions>;
pub type SharedResolver = Arc<Resolver>;
pub type SharedPipeline = Arc<LoaderPipeline>;
