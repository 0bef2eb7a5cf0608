pub mod alias_item;
pub mod copy_item;
pub mod dev_server_options;
pub mod filename_template;
pub mod input_item;
pub mod loader_rule;
pub mod mode;
pub mod normalized_bundler_options;

use std::path::PathBuf;

use bindle_utils::indexmap::FxIndexMap;
use serde::Deserialize;

use crate::{CopyItem, DevServerOptions, LoaderRule, Mode};

/// The raw, user-facing configuration: everything optional, field names
/// matching the JSON config schema. Defaults and validation live in
/// `normalize_options`; nothing downstream ever reads this type.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BundlerOptions {
  // --- Input
  pub entries: Option<FxIndexMap<String, String>>,
  pub cwd: Option<PathBuf>,
  pub aliases: Option<FxIndexMap<String, String>>,
  pub extensions: Option<Vec<String>>,
  pub module_root: Option<String>,

  // --- Output
  pub output_dir: Option<PathBuf>,
  pub public_path: Option<String>,
  pub mode: Option<Mode>,
  pub minify: Option<bool>,
  pub entry_filenames: Option<String>,
  pub chunk_filenames: Option<String>,
  pub copy_files: Option<Vec<CopyItem>>,

  // --- Transform
  pub loaders: Option<Vec<LoaderRule>>,
  pub env_file: Option<PathBuf>,
  pub asset_inline_limit: Option<u64>,
  pub transform_timeout_ms: Option<u64>,

  // --- Dev
  pub dev_server: Option<DevServerOptions>,
}
